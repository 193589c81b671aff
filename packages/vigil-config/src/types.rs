use serde::Deserialize;

#[derive(Clone, Debug, Deserialize)]
pub struct Config {
	pub service: Service,
	pub storage: Storage,
	pub pagination: Pagination,
	pub leaderboard: Leaderboard,
	pub security: Security,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Service {
	pub http_bind: String,
	pub log_level: String,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
	pub postgres: Postgres,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Postgres {
	pub dsn: String,
	pub pool_max_conns: u32,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Pagination {
	/// Page size applied when the caller omits `limit`. No upper bound is
	/// enforced on caller-supplied limits.
	pub default_limit: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Leaderboard {
	/// How many researchers, ranked by report count, are scored for the
	/// leaderboard. Researchers outside this set never appear.
	pub candidate_limit: i64,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Security {
	pub bind_localhost_only: bool,
}
