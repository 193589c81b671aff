use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct PageMeta {
	pub page: i64,
	pub limit: i64,
	pub total: i64,
	pub pages: i64,
}

/// Offset/limit math over a total count. `limit` must be positive; parameter
/// parsing rejects zero and negative limits before this stage.
pub fn paginate(total: i64, page: i64, limit: i64) -> PageMeta {
	let pages = total / limit + i64::from(total % limit != 0);

	PageMeta { page, limit, total, pages }
}

/// Saturates instead of overflowing; an absurdly large page is a valid
/// request that selects past the last row and matches nothing.
pub fn offset(page: i64, limit: i64) -> i64 {
	page.saturating_sub(1).saturating_mul(limit)
}
