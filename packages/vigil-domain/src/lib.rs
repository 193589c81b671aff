pub mod aggregate;
pub mod leaderboard;
pub mod pagination;
pub mod scope;
pub mod severity;
pub mod status;
