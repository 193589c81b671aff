use serde::{Deserialize, Serialize};
use sqlx::QueryBuilder;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{
	Error, Result, UserSummary, VigilService, comments::CommentView, query, query::ListParams,
};
use vigil_domain::{pagination, scope::Caller, severity};
use vigil_storage::models::Attachment;

const LIST_SELECT: &str = "\
SELECT
	v.vulnerability_id,
	v.title,
	v.description,
	v.asset,
	v.steps_to_reproduce,
	v.cvss_score,
	v.status,
	v.reporter_id,
	v.created_at,
	v.updated_at,
	u.name AS reporter_name,
	u.email AS reporter_email,
	(SELECT count(*) FROM comments c WHERE c.vulnerability_id = v.vulnerability_id) AS comment_count,
	(SELECT count(*) FROM attachments a WHERE a.vulnerability_id = v.vulnerability_id) AS attachment_count
FROM vulnerabilities v
JOIN users u ON u.user_id = v.reporter_id";

const DETAIL_SELECT: &str = "\
SELECT
	v.vulnerability_id,
	v.title,
	v.description,
	v.asset,
	v.steps_to_reproduce,
	v.cvss_score,
	v.status,
	v.reporter_id,
	v.created_at,
	v.updated_at,
	u.name AS reporter_name,
	u.email AS reporter_email
FROM vulnerabilities v
JOIN users u ON u.user_id = v.reporter_id
WHERE v.vulnerability_id = $1";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityListItem {
	pub id: Uuid,
	pub title: String,
	pub description: String,
	pub asset: String,
	pub steps_to_reproduce: String,
	pub cvss_score: f64,
	pub status: String,
	pub reporter: UserSummary,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
	pub comment_count: i64,
	pub attachment_count: i64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ListVulnerabilitiesResponse {
	pub vulnerabilities: Vec<VulnerabilityListItem>,
	pub pagination: pagination::PageMeta,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VulnerabilityDetail {
	pub id: Uuid,
	pub title: String,
	pub description: String,
	pub asset: String,
	pub steps_to_reproduce: String,
	pub cvss_score: f64,
	pub status: String,
	pub reporter: UserSummary,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
	pub comments: Vec<CommentView>,
	pub attachments: Vec<AttachmentView>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentView {
	pub id: Uuid,
	pub file_name: String,
	pub file_url: String,
	pub file_size: i64,
	pub mime_type: String,
	#[serde(with = "crate::time_serde")]
	pub uploaded_at: OffsetDateTime,
}

/// Attachment metadata recorded alongside a new report. Byte storage is the
/// upload middleware's concern, not this core's.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentUpload {
	pub file_name: String,
	pub file_url: String,
	pub file_size: i64,
	pub mime_type: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVulnerability {
	pub title: String,
	pub description: String,
	pub asset: String,
	pub steps_to_reproduce: String,
	pub cvss_score: f64,
	#[serde(default)]
	pub attachments: Vec<AttachmentUpload>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVulnerability {
	pub title: Option<String>,
	pub description: Option<String>,
	pub asset: Option<String>,
	pub steps_to_reproduce: Option<String>,
	pub cvss_score: Option<f64>,
	pub status: Option<String>,
}

#[derive(sqlx::FromRow)]
struct ListRow {
	vulnerability_id: Uuid,
	title: String,
	description: String,
	asset: String,
	steps_to_reproduce: String,
	cvss_score: f64,
	status: String,
	reporter_id: Uuid,
	created_at: OffsetDateTime,
	updated_at: OffsetDateTime,
	reporter_name: String,
	reporter_email: String,
	comment_count: i64,
	attachment_count: i64,
}
impl ListRow {
	fn into_item(self) -> VulnerabilityListItem {
		VulnerabilityListItem {
			id: self.vulnerability_id,
			title: self.title,
			description: self.description,
			asset: self.asset,
			steps_to_reproduce: self.steps_to_reproduce,
			cvss_score: self.cvss_score,
			status: self.status,
			reporter: UserSummary {
				id: self.reporter_id,
				name: self.reporter_name,
				email: self.reporter_email,
			},
			created_at: self.created_at,
			updated_at: self.updated_at,
			comment_count: self.comment_count,
			attachment_count: self.attachment_count,
		}
	}
}

#[derive(sqlx::FromRow)]
struct DetailRow {
	vulnerability_id: Uuid,
	title: String,
	description: String,
	asset: String,
	steps_to_reproduce: String,
	cvss_score: f64,
	status: String,
	reporter_id: Uuid,
	created_at: OffsetDateTime,
	updated_at: OffsetDateTime,
	reporter_name: String,
	reporter_email: String,
}

impl VigilService {
	pub async fn list_vulnerabilities(
		&self,
		caller: &Caller,
		params: &ListParams,
	) -> Result<ListVulnerabilitiesResponse> {
		let query = query::compile(params, caller.scope(), self.cfg.pagination.default_limit)?;
		let mut count_builder = QueryBuilder::new("SELECT count(*) FROM vulnerabilities v");

		query::push_filters(&mut count_builder, &query);

		let total: i64 = count_builder.build_query_scalar().fetch_one(&self.db.pool).await?;
		let mut builder = QueryBuilder::new(LIST_SELECT);

		query::push_filters(&mut builder, &query);
		query::push_page(&mut builder, &query);

		let rows: Vec<ListRow> = builder.build_query_as().fetch_all(&self.db.pool).await?;
		let vulnerabilities = rows.into_iter().map(ListRow::into_item).collect();

		Ok(ListVulnerabilitiesResponse {
			vulnerabilities,
			pagination: pagination::paginate(total, query.page, query.limit),
		})
	}

	pub async fn get_vulnerability(
		&self,
		caller: &Caller,
		vulnerability_id: Uuid,
	) -> Result<VulnerabilityDetail> {
		let row: DetailRow = sqlx::query_as(DETAIL_SELECT)
			.bind(vulnerability_id)
			.fetch_optional(&self.db.pool)
			.await?
			.ok_or_else(|| Error::NotFound { message: "Vulnerability not found.".to_string() })?;

		if !caller.scope().allows_reporter(row.reporter_id) {
			return Err(Error::ScopeDenied { message: "Access denied.".to_string() });
		}

		let comments = crate::comments::comments_for(&self.db.pool, vulnerability_id).await?;
		let attachments = attachments_for(&self.db.pool, vulnerability_id).await?;

		Ok(detail_from(row, comments, attachments))
	}

	pub async fn create_vulnerability(
		&self,
		caller: &Caller,
		req: CreateVulnerability,
	) -> Result<VulnerabilityDetail> {
		require_text(&req.title, "title")?;
		require_text(&req.description, "description")?;
		require_text(&req.asset, "asset")?;
		require_text(&req.steps_to_reproduce, "stepsToReproduce")?;
		validate_cvss(req.cvss_score)?;

		for attachment in &req.attachments {
			require_text(&attachment.file_name, "fileName")?;
			require_text(&attachment.file_url, "fileUrl")?;

			if attachment.file_size < 0 {
				return Err(Error::InvalidParameter {
					message: "fileSize must not be negative.".to_string(),
				});
			}
		}

		let now = OffsetDateTime::now_utc();
		let vulnerability_id = Uuid::new_v4();
		let mut tx = self.db.pool.begin().await?;
		let reporter: (String, String) =
			sqlx::query_as("SELECT name, email FROM users WHERE user_id = $1")
				.bind(caller.id)
				.fetch_optional(&mut *tx)
				.await?
				.ok_or_else(|| Error::Unauthenticated {
					message: "Unknown caller.".to_string(),
				})?;

		sqlx::query(
			"\
INSERT INTO vulnerabilities (
	vulnerability_id,
	title,
	description,
	asset,
	steps_to_reproduce,
	cvss_score,
	status,
	reporter_id,
	created_at,
	updated_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
		)
		.bind(vulnerability_id)
		.bind(&req.title)
		.bind(&req.description)
		.bind(&req.asset)
		.bind(&req.steps_to_reproduce)
		.bind(req.cvss_score)
		.bind("REPORTED")
		.bind(caller.id)
		.bind(now)
		.bind(now)
		.execute(&mut *tx)
		.await?;

		let mut attachments = Vec::with_capacity(req.attachments.len());

		for upload in &req.attachments {
			let attachment_id = Uuid::new_v4();

			sqlx::query(
				"\
INSERT INTO attachments (
	attachment_id,
	vulnerability_id,
	file_name,
	file_url,
	file_size,
	mime_type,
	uploaded_at
)
VALUES ($1, $2, $3, $4, $5, $6, $7)",
			)
			.bind(attachment_id)
			.bind(vulnerability_id)
			.bind(&upload.file_name)
			.bind(&upload.file_url)
			.bind(upload.file_size)
			.bind(&upload.mime_type)
			.bind(now)
			.execute(&mut *tx)
			.await?;

			attachments.push(AttachmentView {
				id: attachment_id,
				file_name: upload.file_name.clone(),
				file_url: upload.file_url.clone(),
				file_size: upload.file_size,
				mime_type: upload.mime_type.clone(),
				uploaded_at: now,
			});
		}

		tx.commit().await?;

		tracing::info!(%vulnerability_id, reporter_id = %caller.id, "Vulnerability created.");

		Ok(VulnerabilityDetail {
			id: vulnerability_id,
			title: req.title,
			description: req.description,
			asset: req.asset,
			steps_to_reproduce: req.steps_to_reproduce,
			cvss_score: req.cvss_score,
			status: "REPORTED".to_string(),
			reporter: UserSummary { id: caller.id, name: reporter.0, email: reporter.1 },
			created_at: now,
			updated_at: now,
			comments: Vec::new(),
			attachments,
		})
	}

	pub async fn update_vulnerability(
		&self,
		caller: &Caller,
		vulnerability_id: Uuid,
		req: UpdateVulnerability,
	) -> Result<VulnerabilityDetail> {
		if let Some(title) = req.title.as_deref() {
			require_text(title, "title")?;
		}
		if let Some(description) = req.description.as_deref() {
			require_text(description, "description")?;
		}
		if let Some(asset) = req.asset.as_deref() {
			require_text(asset, "asset")?;
		}
		if let Some(steps) = req.steps_to_reproduce.as_deref() {
			require_text(steps, "stepsToReproduce")?;
		}
		if let Some(score) = req.cvss_score {
			validate_cvss(score)?;
		}
		if let Some(status) = req.status.as_deref()
			&& vigil_domain::status::VulnerabilityStatus::parse(status).is_none()
		{
			return Err(Error::InvalidParameter {
				message: "status must be one of REPORTED, VERIFIED, or FIXED.".to_string(),
			});
		}

		let now = OffsetDateTime::now_utc();
		let mut tx = self.db.pool.begin().await?;
		let existing: vigil_storage::models::Vulnerability =
			sqlx::query_as("SELECT * FROM vulnerabilities WHERE vulnerability_id = $1 FOR UPDATE")
				.bind(vulnerability_id)
				.fetch_optional(&mut *tx)
				.await?
				.ok_or_else(|| Error::NotFound {
					message: "Vulnerability not found.".to_string(),
				})?;

		if !caller.scope().allows_reporter(existing.reporter_id) {
			return Err(Error::ScopeDenied { message: "Access denied.".to_string() });
		}

		// Only admins change status. A researcher's status field is silently
		// dropped, not rejected.
		let status = if caller.role.is_admin() { req.status } else { None };
		let title = req.title.unwrap_or(existing.title);
		let description = req.description.unwrap_or(existing.description);
		let asset = req.asset.unwrap_or(existing.asset);
		let steps_to_reproduce = req.steps_to_reproduce.unwrap_or(existing.steps_to_reproduce);
		let cvss_score = req.cvss_score.unwrap_or(existing.cvss_score);
		let status = status.unwrap_or(existing.status);

		sqlx::query(
			"\
UPDATE vulnerabilities
SET
	title = $1,
	description = $2,
	asset = $3,
	steps_to_reproduce = $4,
	cvss_score = $5,
	status = $6,
	updated_at = $7
WHERE vulnerability_id = $8",
		)
		.bind(&title)
		.bind(&description)
		.bind(&asset)
		.bind(&steps_to_reproduce)
		.bind(cvss_score)
		.bind(&status)
		.bind(now)
		.bind(vulnerability_id)
		.execute(&mut *tx)
		.await?;

		tx.commit().await?;

		self.get_vulnerability(caller, vulnerability_id).await
	}

	pub async fn delete_vulnerability(
		&self,
		caller: &Caller,
		vulnerability_id: Uuid,
	) -> Result<()> {
		let reporter_id: Uuid =
			sqlx::query_scalar("SELECT reporter_id FROM vulnerabilities WHERE vulnerability_id = $1")
				.bind(vulnerability_id)
				.fetch_optional(&self.db.pool)
				.await?
				.ok_or_else(|| Error::NotFound {
					message: "Vulnerability not found.".to_string(),
				})?;

		if !caller.scope().allows_reporter(reporter_id) {
			return Err(Error::ScopeDenied { message: "Access denied.".to_string() });
		}

		// Comments and attachments go with it via ON DELETE CASCADE.
		sqlx::query("DELETE FROM vulnerabilities WHERE vulnerability_id = $1")
			.bind(vulnerability_id)
			.execute(&self.db.pool)
			.await?;

		tracing::info!(%vulnerability_id, "Vulnerability deleted.");

		Ok(())
	}
}

async fn attachments_for(pool: &sqlx::PgPool, vulnerability_id: Uuid) -> Result<Vec<AttachmentView>> {
	let rows: Vec<Attachment> = sqlx::query_as(
		"SELECT * FROM attachments WHERE vulnerability_id = $1 ORDER BY uploaded_at ASC",
	)
	.bind(vulnerability_id)
	.fetch_all(pool)
	.await?;

	Ok(rows
		.into_iter()
		.map(|attachment| AttachmentView {
			id: attachment.attachment_id,
			file_name: attachment.file_name,
			file_url: attachment.file_url,
			file_size: attachment.file_size,
			mime_type: attachment.mime_type,
			uploaded_at: attachment.uploaded_at,
		})
		.collect())
}

fn detail_from(
	row: DetailRow,
	comments: Vec<CommentView>,
	attachments: Vec<AttachmentView>,
) -> VulnerabilityDetail {
	VulnerabilityDetail {
		id: row.vulnerability_id,
		title: row.title,
		description: row.description,
		asset: row.asset,
		steps_to_reproduce: row.steps_to_reproduce,
		cvss_score: row.cvss_score,
		status: row.status,
		reporter: UserSummary {
			id: row.reporter_id,
			name: row.reporter_name,
			email: row.reporter_email,
		},
		created_at: row.created_at,
		updated_at: row.updated_at,
		comments,
		attachments,
	}
}

fn require_text(value: &str, field: &str) -> Result<()> {
	if value.trim().is_empty() {
		return Err(Error::InvalidParameter { message: format!("{field} is required.") });
	}

	Ok(())
}

fn validate_cvss(score: f64) -> Result<()> {
	if !severity::cvss_in_range(score) {
		return Err(Error::InvalidParameter {
			message: "cvssScore must be between 0 and 10.".to_string(),
		});
	}

	Ok(())
}
