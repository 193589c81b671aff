use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, UserSummary, VigilService};
use vigil_domain::{
	aggregate::{self, SeverityBandCounts},
	scope::Caller,
};

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyticsOverview {
	pub total_vulnerabilities: i64,
	pub by_status: BTreeMap<String, i64>,
	pub by_score: Vec<ScoreCount>,
	pub severity_bands: SeverityBandCounts,
	pub recent: Vec<RecentVulnerability>,
	pub top_reporters: Vec<TopReporter>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreCount {
	pub cvss_score: f64,
	pub count: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentVulnerability {
	pub id: Uuid,
	pub title: String,
	pub cvss_score: f64,
	pub status: String,
	pub reporter: UserSummary,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TopReporter {
	pub id: Uuid,
	pub name: String,
	pub email: String,
	pub vulnerability_count: i64,
}

impl VigilService {
	pub async fn analytics_overview(&self, caller: &Caller) -> Result<AnalyticsOverview> {
		if !caller.role.is_admin() {
			return Err(Error::ScopeDenied { message: "Access denied.".to_string() });
		}

		let reports: Vec<(f64, String)> =
			sqlx::query_as("SELECT cvss_score, status FROM vulnerabilities")
				.fetch_all(&self.db.pool)
				.await?;
		let total_vulnerabilities = reports.len() as i64;
		let by_status = aggregate::count_map(reports.iter().map(|(_, status)| (status.clone(), 1)));
		let by_score = score_counts(reports.iter().map(|(score, _)| *score));
		let severity_bands =
			aggregate::bucket_score_counts(reports.iter().map(|(score, _)| (*score, 1)));
		let recent = self.recent_vulnerabilities().await?;
		let top_reporters = self.top_reporters().await?;

		Ok(AnalyticsOverview {
			total_vulnerabilities,
			by_status,
			by_score,
			severity_bands,
			recent,
			top_reporters,
		})
	}

	async fn recent_vulnerabilities(&self) -> Result<Vec<RecentVulnerability>> {
		type Row = (Uuid, String, f64, String, Uuid, String, String, OffsetDateTime);

		let rows: Vec<Row> = sqlx::query_as(
			"\
SELECT
	v.vulnerability_id,
	v.title,
	v.cvss_score,
	v.status,
	u.user_id,
	u.name,
	u.email,
	v.created_at
FROM vulnerabilities v
JOIN users u ON u.user_id = v.reporter_id
ORDER BY v.created_at DESC
LIMIT 5",
		)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(rows
			.into_iter()
			.map(|(id, title, cvss_score, status, reporter_id, name, email, created_at)| {
				RecentVulnerability {
					id,
					title,
					cvss_score,
					status,
					reporter: UserSummary { id: reporter_id, name, email },
					created_at,
				}
			})
			.collect())
	}

	async fn top_reporters(&self) -> Result<Vec<TopReporter>> {
		let rows: Vec<(Uuid, String, String, i64)> = sqlx::query_as(
			"\
SELECT u.user_id, u.name, u.email, count(v.vulnerability_id) AS vulnerability_count
FROM users u
LEFT JOIN vulnerabilities v ON v.reporter_id = u.user_id
WHERE u.role = 'RESEARCHER'
GROUP BY u.user_id, u.name, u.email
ORDER BY vulnerability_count DESC, u.user_id ASC
LIMIT 10",
		)
		.fetch_all(&self.db.pool)
		.await?;

		Ok(rows
			.into_iter()
			.map(|(id, name, email, vulnerability_count)| TopReporter {
				id,
				name,
				email,
				vulnerability_count,
			})
			.collect())
	}
}

/// Groups scores into (score, count) pairs ordered by score descending.
pub(crate) fn score_counts(scores: impl Iterator<Item = f64>) -> Vec<ScoreCount> {
	// f64 is not Ord; group on the score's bit pattern instead. Scores come
	// from a validated [0, 10] range, so there are no NaNs or negative zeros
	// to worry about.
	let grouped = aggregate::count_map(scores.map(|score| (score.to_bits(), 1)));
	let mut counts: Vec<ScoreCount> = grouped
		.into_iter()
		.map(|(bits, count)| ScoreCount { cvss_score: f64::from_bits(bits), count })
		.collect();

	counts.sort_by(|a, b| {
		b.cvss_score.partial_cmp(&a.cvss_score).unwrap_or(std::cmp::Ordering::Equal)
	});

	counts
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn score_counts_group_and_sort_descending() {
		let counts = score_counts([7.5, 3.0, 7.5, 9.8, 3.0, 3.0].into_iter());

		assert_eq!(counts.len(), 3);
		assert_eq!(counts[0].cvss_score, 9.8);
		assert_eq!(counts[0].count, 1);
		assert_eq!(counts[1].cvss_score, 7.5);
		assert_eq!(counts[1].count, 2);
		assert_eq!(counts[2].cvss_score, 3.0);
		assert_eq!(counts[2].count, 3);
	}

	#[test]
	fn score_counts_of_nothing_is_empty() {
		assert!(score_counts(std::iter::empty()).is_empty());
	}
}
