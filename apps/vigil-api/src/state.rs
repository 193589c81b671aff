use std::sync::Arc;

use vigil_service::VigilService;
use vigil_storage::db::Db;

#[derive(Clone)]
pub struct AppState {
	pub service: Arc<VigilService>,
}
impl AppState {
	pub async fn new(config: vigil_config::Config) -> color_eyre::Result<Self> {
		let db = Db::connect(&config.storage.postgres).await?;

		db.ensure_schema().await?;

		let service = VigilService::new(config, db);

		Ok(Self { service: Arc::new(service) })
	}
}
