use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;
	let args = vigil_api::Args::parse();
	vigil_api::run(args).await
}
