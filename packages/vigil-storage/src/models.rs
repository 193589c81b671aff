use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, sqlx::FromRow)]
pub struct User {
	pub user_id: Uuid,
	pub name: String,
	pub email: String,
	pub password_hash: String,
	pub role: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Vulnerability {
	pub vulnerability_id: Uuid,
	pub title: String,
	pub description: String,
	pub asset: String,
	pub steps_to_reproduce: String,
	pub cvss_score: f64,
	pub status: String,
	pub reporter_id: Uuid,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Comment {
	pub comment_id: Uuid,
	pub vulnerability_id: Uuid,
	pub author_id: Uuid,
	pub content: String,
	pub created_at: OffsetDateTime,
	pub updated_at: OffsetDateTime,
}

#[derive(Debug, sqlx::FromRow)]
pub struct Attachment {
	pub attachment_id: Uuid,
	pub vulnerability_id: Uuid,
	pub file_name: String,
	pub file_url: String,
	pub file_size: i64,
	pub mime_type: String,
	pub uploaded_at: OffsetDateTime,
}
