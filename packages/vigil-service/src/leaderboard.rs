use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, VigilService};
use vigil_domain::{
	leaderboard::{Period, ScoredReport, weighted_score},
	scope::Caller,
	status::VulnerabilityStatus,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
	pub id: Uuid,
	pub name: String,
	pub email: String,
	pub vulnerability_count: i64,
	pub total_score: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LeaderboardResponse {
	pub period: String,
	pub leaderboard: Vec<LeaderboardEntry>,
}

impl VigilService {
	/// Two-stage ranking: the store picks the candidate set, the top N
	/// researchers by report count within the window, and the candidates are
	/// then re-ranked by weighted score. A researcher outside the count-ranked
	/// candidate set never appears, whatever their score.
	pub async fn leaderboard(&self, caller: &Caller, period: Period) -> Result<LeaderboardResponse> {
		if !caller.role.is_admin() {
			return Err(Error::ScopeDenied { message: "Access denied.".to_string() });
		}

		let since = period.window_start(OffsetDateTime::now_utc());
		let mut builder = QueryBuilder::new(
			"\
SELECT u.user_id, u.name, u.email, count(v.vulnerability_id) AS vulnerability_count
FROM users u
JOIN vulnerabilities v ON v.reporter_id = u.user_id
WHERE u.role = 'RESEARCHER'",
		);

		if let Some(since) = since {
			builder.push(" AND v.created_at >= ");
			builder.push_bind(since);
		}

		builder.push(
			"\
 GROUP BY u.user_id, u.name, u.email
ORDER BY vulnerability_count DESC, u.user_id ASC
LIMIT ",
		);
		builder.push_bind(self.cfg.leaderboard.candidate_limit);

		let candidates: Vec<(Uuid, String, String, i64)> =
			builder.build_query_as().fetch_all(&self.db.pool).await?;
		let ids: Vec<Uuid> = candidates.iter().map(|(id, ..)| *id).collect();
		let mut reports_by_reporter: HashMap<Uuid, Vec<ScoredReport>> = HashMap::new();

		if !ids.is_empty() {
			let mut reports_builder = QueryBuilder::new(
				"SELECT reporter_id, cvss_score, status FROM vulnerabilities WHERE reporter_id = ANY(",
			);

			reports_builder.push_bind(ids.clone());
			reports_builder.push(")");

			if let Some(since) = since {
				reports_builder.push(" AND created_at >= ");
				reports_builder.push_bind(since);
			}

			let reports: Vec<(Uuid, f64, String)> =
				reports_builder.build_query_as().fetch_all(&self.db.pool).await?;

			for (reporter_id, cvss_score, status) in reports {
				// Unknown stored statuses weigh like fresh reports.
				let status =
					VulnerabilityStatus::parse(&status).unwrap_or(VulnerabilityStatus::Reported);

				reports_by_reporter
					.entry(reporter_id)
					.or_default()
					.push(ScoredReport { cvss_score, status });
			}
		}

		let mut leaderboard: Vec<LeaderboardEntry> = candidates
			.into_iter()
			.map(|(id, name, email, vulnerability_count)| {
				let total_score = reports_by_reporter
					.get(&id)
					.map(|reports| weighted_score(reports))
					.unwrap_or(0.0);

				LeaderboardEntry { id, name, email, vulnerability_count, total_score }
			})
			.collect();

		// Stable sort keeps the count ordering as the tiebreak.
		leaderboard.sort_by(|a, b| {
			b.total_score.partial_cmp(&a.total_score).unwrap_or(std::cmp::Ordering::Equal)
		});

		Ok(LeaderboardResponse { period: period.as_str().to_string(), leaderboard })
	}
}
