pub mod analytics;
pub mod comments;
pub mod leaderboard;
pub mod query;
pub mod time_serde;
pub mod users;
pub mod vulnerabilities;

mod error;

pub use analytics::{AnalyticsOverview, RecentVulnerability, ScoreCount, TopReporter};
pub use comments::{CommentView, CreateCommentRequest, UpdateCommentRequest};
pub use error::{Error, Result};
pub use leaderboard::{LeaderboardEntry, LeaderboardResponse};
pub use query::{ListParams, SortKey, SortOrder, VulnerabilityQuery};
pub use users::{
	ListUsersResponse, RecentReport, UserListItem, UserListParams, UserProfile, UserStats,
};
pub use vulnerabilities::{
	AttachmentUpload, AttachmentView, CreateVulnerability, ListVulnerabilitiesResponse,
	UpdateVulnerability, VulnerabilityDetail, VulnerabilityListItem,
};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use vigil_config::Config;
use vigil_storage::db::Db;

pub struct VigilService {
	pub cfg: Config,
	pub db: Db,
}
impl VigilService {
	pub fn new(cfg: Config, db: Db) -> Self {
		Self { cfg, db }
	}
}

/// Reporter/author identification embedded in list and detail views.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserSummary {
	pub id: Uuid,
	pub name: String,
	pub email: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommentAuthor {
	pub id: Uuid,
	pub name: String,
	pub email: String,
	pub role: String,
}
