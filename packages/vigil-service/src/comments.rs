use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use uuid::Uuid;

use crate::{CommentAuthor, Error, Result, VigilService};
use vigil_domain::scope::Caller;

const COMMENT_SELECT: &str = "\
SELECT
	c.comment_id,
	c.vulnerability_id,
	c.content,
	c.author_id,
	c.created_at,
	c.updated_at,
	u.name AS author_name,
	u.email AS author_email,
	u.role AS author_role
FROM comments c
JOIN users u ON u.user_id = c.author_id";

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentView {
	pub id: Uuid,
	pub vulnerability_id: Uuid,
	pub content: String,
	pub author: CommentAuthor,
	#[serde(with = "crate::time_serde")]
	pub created_at: OffsetDateTime,
	#[serde(with = "crate::time_serde")]
	pub updated_at: OffsetDateTime,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CreateCommentRequest {
	pub content: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UpdateCommentRequest {
	pub content: String,
}

#[derive(sqlx::FromRow)]
struct CommentRow {
	comment_id: Uuid,
	vulnerability_id: Uuid,
	content: String,
	author_id: Uuid,
	created_at: OffsetDateTime,
	updated_at: OffsetDateTime,
	author_name: String,
	author_email: String,
	author_role: String,
}
impl CommentRow {
	fn into_view(self) -> CommentView {
		CommentView {
			id: self.comment_id,
			vulnerability_id: self.vulnerability_id,
			content: self.content,
			author: CommentAuthor {
				id: self.author_id,
				name: self.author_name,
				email: self.author_email,
				role: self.author_role,
			},
			created_at: self.created_at,
			updated_at: self.updated_at,
		}
	}
}

impl VigilService {
	pub async fn list_comments(
		&self,
		caller: &Caller,
		vulnerability_id: Uuid,
	) -> Result<Vec<CommentView>> {
		self.check_vulnerability_access(caller, vulnerability_id).await?;

		comments_for(&self.db.pool, vulnerability_id).await
	}

	pub async fn create_comment(
		&self,
		caller: &Caller,
		vulnerability_id: Uuid,
		req: CreateCommentRequest,
	) -> Result<CommentView> {
		if req.content.trim().is_empty() {
			return Err(Error::InvalidParameter { message: "content is required.".to_string() });
		}

		self.check_vulnerability_access(caller, vulnerability_id).await?;

		let now = OffsetDateTime::now_utc();
		let comment_id = Uuid::new_v4();

		sqlx::query(
			"\
INSERT INTO comments (comment_id, vulnerability_id, content, author_id, created_at, updated_at)
VALUES ($1, $2, $3, $4, $5, $6)",
		)
		.bind(comment_id)
		.bind(vulnerability_id)
		.bind(&req.content)
		.bind(caller.id)
		.bind(now)
		.bind(now)
		.execute(&self.db.pool)
		.await?;

		self.fetch_comment(comment_id).await
	}

	pub async fn update_comment(
		&self,
		caller: &Caller,
		comment_id: Uuid,
		req: UpdateCommentRequest,
	) -> Result<CommentView> {
		if req.content.trim().is_empty() {
			return Err(Error::InvalidParameter { message: "content is required.".to_string() });
		}

		let author_id = self.comment_author(comment_id).await?;

		// Editing is author-only. Admins moderate by deletion, not rewriting.
		if author_id != caller.id {
			return Err(Error::ScopeDenied { message: "Access denied.".to_string() });
		}

		sqlx::query("UPDATE comments SET content = $1, updated_at = $2 WHERE comment_id = $3")
			.bind(&req.content)
			.bind(OffsetDateTime::now_utc())
			.bind(comment_id)
			.execute(&self.db.pool)
			.await?;

		self.fetch_comment(comment_id).await
	}

	pub async fn delete_comment(&self, caller: &Caller, comment_id: Uuid) -> Result<()> {
		let author_id = self.comment_author(comment_id).await?;

		if author_id != caller.id && !caller.role.is_admin() {
			return Err(Error::ScopeDenied { message: "Access denied.".to_string() });
		}

		sqlx::query("DELETE FROM comments WHERE comment_id = $1")
			.bind(comment_id)
			.execute(&self.db.pool)
			.await?;

		Ok(())
	}

	async fn fetch_comment(&self, comment_id: Uuid) -> Result<CommentView> {
		let row: CommentRow = sqlx::query_as(&format!("{COMMENT_SELECT} WHERE c.comment_id = $1"))
			.bind(comment_id)
			.fetch_optional(&self.db.pool)
			.await?
			.ok_or_else(|| Error::NotFound { message: "Comment not found.".to_string() })?;

		Ok(row.into_view())
	}

	async fn comment_author(&self, comment_id: Uuid) -> Result<Uuid> {
		sqlx::query_scalar("SELECT author_id FROM comments WHERE comment_id = $1")
			.bind(comment_id)
			.fetch_optional(&self.db.pool)
			.await?
			.ok_or_else(|| Error::NotFound { message: "Comment not found.".to_string() })
	}

	/// Commenting follows the visibility rule of the parent report.
	async fn check_vulnerability_access(
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

		Ok(())
	}
}

pub(crate) async fn comments_for(
	pool: &sqlx::PgPool,
	vulnerability_id: Uuid,
) -> Result<Vec<CommentView>> {
	let rows: Vec<CommentRow> = sqlx::query_as(&format!(
		"{COMMENT_SELECT} WHERE c.vulnerability_id = $1 ORDER BY c.created_at ASC"
	))
	.bind(vulnerability_id)
	.fetch_all(pool)
	.await?;

	Ok(rows.into_iter().map(CommentRow::into_view).collect())
}
