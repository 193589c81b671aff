use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{Error, Result, VigilService, query};
use vigil_domain::{
	aggregate::{self, SeverityBandCounts},
	pagination,
	scope::Caller,
};

const USER_SELECT: &str = "\
SELECT
	u.user_id,
	u.name,
	u.email,
	u.role,
	u.created_at,
	(SELECT count(*) FROM vulnerabilities v WHERE v.reporter_id = u.user_id) AS vulnerability_count,
	(SELECT count(*) FROM comments c WHERE c.author_id = u.user_id) AS comment_count
FROM users u";

#[derive(Clone, Debug, Default, Deserialize)]
pub struct UserListParams {
	pub page: Option<String>,
	pub limit: Option<String>,
	pub role: Option<String>,
	pub search: Option<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserListItem {
	pub id: Uuid,
	pub name: String,
	pub email: String,
	pub role: String,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	pub vulnerability_count: i64,
	pub comment_count: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListUsersResponse {
	pub users: Vec<UserListItem>,
	pub pagination: pagination::PageMeta,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
	pub id: Uuid,
	pub name: String,
	pub email: String,
	pub role: String,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	pub vulnerability_count: i64,
	pub comment_count: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
	pub total_vulnerabilities: i64,
	pub by_status: BTreeMap<String, i64>,
	pub by_score: Vec<crate::analytics::ScoreCount>,
	pub severity_bands: SeverityBandCounts,
	pub recent: Vec<RecentReport>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecentReport {
	pub id: Uuid,
	pub title: String,
	pub cvss_score: f64,
	pub status: String,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
}

#[derive(sqlx::FromRow)]
struct UserRow {
	user_id: Uuid,
	name: String,
	email: String,
	role: String,
	created_at: OffsetDateTime,
	vulnerability_count: i64,
	comment_count: i64,
}

impl VigilService {
	pub async fn list_users(
		&self,
		caller: &Caller,
		params: &UserListParams,
	) -> Result<ListUsersResponse> {
		if !caller.role.is_admin() {
			return Err(Error::ScopeDenied { message: "Access denied.".to_string() });
		}

		let page = query::parse_positive(query::non_empty(params.page.as_deref()), 1, "page")?;
		let limit = query::parse_positive(
			query::non_empty(params.limit.as_deref()),
			self.cfg.pagination.default_limit,
			"limit",
		)?;
		let role = query::non_empty(params.role.as_deref());
		let search = query::non_empty(params.search.as_deref());
		let push_user_filters = |builder: &mut QueryBuilder<'_, sqlx::Postgres>| {
			builder.push(" WHERE 1 = 1");

			if let Some(role) = role {
				builder.push(" AND u.role = ");
				builder.push_bind(role.to_string());
			}
			if let Some(search) = search {
				let pattern = format!("%{}%", query::escape_like(search));

				builder.push(" AND (u.name ILIKE ");
				builder.push_bind(pattern.clone());
				builder.push(" OR u.email ILIKE ");
				builder.push_bind(pattern);
				builder.push(")");
			}
		};
		let mut count_builder = QueryBuilder::new("SELECT count(*) FROM users u");

		push_user_filters(&mut count_builder);

		let total: i64 = count_builder.build_query_scalar().fetch_one(&self.db.pool).await?;
		let mut builder = QueryBuilder::new(USER_SELECT);

		push_user_filters(&mut builder);
		builder.push(" ORDER BY u.created_at DESC LIMIT ");
		builder.push_bind(limit);
		builder.push(" OFFSET ");
		builder.push_bind(pagination::offset(page, limit));

		let rows: Vec<UserRow> = builder.build_query_as().fetch_all(&self.db.pool).await?;
		let users = rows
			.into_iter()
			.map(|row| UserListItem {
				id: row.user_id,
				name: row.name,
				email: row.email,
				role: row.role,
				created_at: row.created_at,
				vulnerability_count: row.vulnerability_count,
				comment_count: row.comment_count,
			})
			.collect();

		Ok(ListUsersResponse { users, pagination: pagination::paginate(total, page, limit) })
	}

	pub async fn user_profile(&self, caller: &Caller) -> Result<UserProfile> {
		let row: UserRow = sqlx::query_as(&format!("{USER_SELECT} WHERE u.user_id = $1"))
			.bind(caller.id)
			.fetch_optional(&self.db.pool)
			.await?
			.ok_or_else(|| Error::NotFound { message: "User not found.".to_string() })?;

		Ok(UserProfile {
			id: row.user_id,
			name: row.name,
			email: row.email,
			role: row.role,
			created_at: row.created_at,
			vulnerability_count: row.vulnerability_count,
			comment_count: row.comment_count,
		})
	}

	/// The caller's own reporting statistics, whatever their role.
	pub async fn user_stats(&self, caller: &Caller) -> Result<UserStats> {
		let reports: Vec<(f64, String)> = sqlx::query_as(
			"SELECT cvss_score, status FROM vulnerabilities WHERE reporter_id = $1",
		)
		.bind(caller.id)
		.fetch_all(&self.db.pool)
		.await?;
		let total_vulnerabilities = reports.len() as i64;
		let by_status = aggregate::count_map(reports.iter().map(|(_, status)| (status.clone(), 1)));
		let by_score = crate::analytics::score_counts(reports.iter().map(|(score, _)| *score));
		let severity_bands =
			aggregate::bucket_score_counts(reports.iter().map(|(score, _)| (*score, 1)));
		let recent: Vec<RecentReport> = sqlx::query_as::<_, (Uuid, String, f64, String, OffsetDateTime)>(
			"\
SELECT vulnerability_id, title, cvss_score, status, created_at
FROM vulnerabilities
WHERE reporter_id = $1
ORDER BY created_at DESC
LIMIT 5",
		)
		.bind(caller.id)
		.fetch_all(&self.db.pool)
		.await?
		.into_iter()
		.map(|(id, title, cvss_score, status, created_at)| RecentReport {
			id,
			title,
			cvss_score,
			status,
			created_at,
		})
		.collect();

		Ok(UserStats { total_vulnerabilities, by_status, by_score, severity_bands, recent })
	}
}
