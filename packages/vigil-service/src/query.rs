use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

use crate::{Error, Result};
use vigil_domain::{pagination, scope::AccessScope, severity::SeverityBucket};

/// The flat bag of string-typed listing parameters as received from the
/// transport layer. Empty values are treated as absent.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ListParams {
	pub page: Option<String>,
	pub limit: Option<String>,
	pub status: Option<String>,
	pub severity: Option<String>,
	pub search: Option<String>,
	#[serde(rename = "sortBy")]
	pub sort_by: Option<String>,
	#[serde(rename = "sortOrder")]
	pub sort_order: Option<String>,
}

/// Allowlisted sortable fields. Caller-supplied field names never reach the
/// store; anything outside this set degrades to `CreatedAt`.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortKey {
	CreatedAt,
	UpdatedAt,
	CvssScore,
	Title,
	Status,
	Asset,
}
impl SortKey {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"createdAt" => Some(Self::CreatedAt),
			"updatedAt" => Some(Self::UpdatedAt),
			"cvssScore" => Some(Self::CvssScore),
			"title" => Some(Self::Title),
			"status" => Some(Self::Status),
			"asset" => Some(Self::Asset),
			_ => None,
		}
	}

	pub fn column(&self) -> &'static str {
		match self {
			Self::CreatedAt => "v.created_at",
			Self::UpdatedAt => "v.updated_at",
			Self::CvssScore => "v.cvss_score",
			Self::Title => "v.title",
			Self::Status => "v.status",
			Self::Asset => "v.asset",
		}
	}
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SortOrder {
	Asc,
	Desc,
}
impl SortOrder {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"asc" => Some(Self::Asc),
			"desc" => Some(Self::Desc),
			_ => None,
		}
	}

	pub fn sql(&self) -> &'static str {
		match self {
			Self::Asc => "ASC",
			Self::Desc => "DESC",
		}
	}
}

/// Normalized query descriptor: the scope predicate AND-ed with user filters,
/// plus ordering and offset/limit bounds.
#[derive(Clone, Debug)]
pub struct VulnerabilityQuery {
	pub scope: AccessScope,
	pub status: Option<String>,
	pub severity: Option<SeverityBucket>,
	pub search: Option<String>,
	pub sort_key: SortKey,
	pub sort_order: SortOrder,
	pub page: i64,
	pub limit: i64,
}
impl VulnerabilityQuery {
	pub fn offset(&self) -> i64 {
		pagination::offset(self.page, self.limit)
	}
}

pub fn compile(
	params: &ListParams,
	scope: AccessScope,
	default_limit: i64,
) -> Result<VulnerabilityQuery> {
	let page = parse_positive(non_empty(params.page.as_deref()), 1, "page")?;
	let limit = parse_positive(non_empty(params.limit.as_deref()), default_limit, "limit")?;
	let severity = match non_empty(params.severity.as_deref()) {
		None => None,
		Some(raw) => {
			let threshold: f64 = raw.trim().parse().map_err(|_| Error::InvalidParameter {
				message: "severity must be numeric.".to_string(),
			})?;

			Some(SeverityBucket::from_threshold(threshold))
		},
	};
	// Unknown status values pass through and match zero rows; unknown sort
	// fields and orders fall back to the defaults.
	let status = non_empty(params.status.as_deref()).map(str::to_string);
	let search = non_empty(params.search.as_deref()).map(str::to_string);
	let sort_key =
		non_empty(params.sort_by.as_deref()).and_then(SortKey::parse).unwrap_or(SortKey::CreatedAt);
	let sort_order = non_empty(params.sort_order.as_deref())
		.and_then(SortOrder::parse)
		.unwrap_or(SortOrder::Desc);

	Ok(VulnerabilityQuery { scope, status, severity, search, sort_key, sort_order, page, limit })
}

pub(crate) fn parse_positive(raw: Option<&str>, default: i64, field: &str) -> Result<i64> {
	let Some(raw) = raw else {
		return Ok(default);
	};
	let value: i64 = raw.trim().parse().map_err(|_| invalid(field))?;

	if value < 1 {
		return Err(invalid(field));
	}

	Ok(value)
}

fn invalid(field: &str) -> Error {
	Error::InvalidParameter { message: format!("{field} must be a positive integer.") }
}

pub(crate) fn non_empty(raw: Option<&str>) -> Option<&str> {
	raw.filter(|value| !value.trim().is_empty())
}

/// Escapes LIKE metacharacters; backslash is Postgres's default escape
/// character.
pub(crate) fn escape_like(needle: &str) -> String {
	let mut out = String::with_capacity(needle.len());

	for c in needle.chars() {
		if matches!(c, '\\' | '%' | '_') {
			out.push('\\');
		}

		out.push(c);
	}

	out
}

/// Appends the WHERE clause for a compiled query. Expects the vulnerabilities
/// table to be aliased as `v`.
pub(crate) fn push_filters(builder: &mut QueryBuilder<'_, Postgres>, query: &VulnerabilityQuery) {
	builder.push(" WHERE 1 = 1");

	if let Some(reporter_id) = query.scope.reporter_filter() {
		builder.push(" AND v.reporter_id = ");
		builder.push_bind(reporter_id);
	}
	if let Some(status) = &query.status {
		builder.push(" AND v.status = ");
		builder.push_bind(status.clone());
	}
	if let Some(bucket) = query.severity {
		builder.push(" AND v.cvss_score >= ");
		builder.push_bind(bucket.lower_bound());

		if let Some(upper) = bucket.upper_bound() {
			builder.push(" AND v.cvss_score < ");
			builder.push_bind(upper);
		}
	}
	if let Some(search) = &query.search {
		let pattern = format!("%{}%", escape_like(search));

		builder.push(" AND (v.title ILIKE ");
		builder.push_bind(pattern.clone());
		builder.push(" OR v.description ILIKE ");
		builder.push_bind(pattern.clone());
		builder.push(" OR v.asset ILIKE ");
		builder.push_bind(pattern);
		builder.push(")");
	}
}

pub(crate) fn push_page(builder: &mut QueryBuilder<'_, Postgres>, query: &VulnerabilityQuery) {
	builder.push(" ORDER BY ");
	builder.push(query.sort_key.column());
	builder.push(" ");
	builder.push(query.sort_order.sql());
	builder.push(" LIMIT ");
	builder.push_bind(query.limit);
	builder.push(" OFFSET ");
	builder.push_bind(query.offset());
}

#[cfg(test)]
mod tests {
	use uuid::Uuid;

	use super::*;

	fn compile_ok(params: ListParams) -> VulnerabilityQuery {
		compile(&params, AccessScope::Admin, 10).expect("Failed to compile params.")
	}

	#[test]
	fn applies_defaults() {
		let query = compile_ok(ListParams::default());

		assert_eq!(query.page, 1);
		assert_eq!(query.limit, 10);
		assert_eq!(query.sort_key, SortKey::CreatedAt);
		assert_eq!(query.sort_order, SortOrder::Desc);
		assert_eq!(query.status, None);
		assert_eq!(query.severity, None);
		assert_eq!(query.offset(), 0);
	}

	#[test]
	fn parses_page_and_limit() {
		let query = compile_ok(ListParams {
			page: Some("3".to_string()),
			limit: Some("25".to_string()),
			..Default::default()
		});

		assert_eq!(query.page, 3);
		assert_eq!(query.limit, 25);
		assert_eq!(query.offset(), 50);
	}

	#[test]
	fn huge_page_numbers_stay_in_range() {
		let query =
			compile_ok(ListParams { page: Some(i64::MAX.to_string()), ..Default::default() });

		assert_eq!(query.offset(), i64::MAX);
	}

	#[test]
	fn rejects_non_numeric_page() {
		let params = ListParams { page: Some("first".to_string()), ..Default::default() };

		assert!(matches!(
			compile(&params, AccessScope::Admin, 10),
			Err(Error::InvalidParameter { .. }),
		));
	}

	#[test]
	fn rejects_zero_limit() {
		let params = ListParams { limit: Some("0".to_string()), ..Default::default() };

		assert!(matches!(
			compile(&params, AccessScope::Admin, 10),
			Err(Error::InvalidParameter { .. }),
		));
	}

	#[test]
	fn rejects_non_numeric_severity() {
		let params = ListParams { severity: Some("critical".to_string()), ..Default::default() };

		assert!(matches!(
			compile(&params, AccessScope::Admin, 10),
			Err(Error::InvalidParameter { .. }),
		));
	}

	#[test]
	fn severity_threshold_selects_bucket() {
		let high = compile_ok(ListParams { severity: Some("9.1".to_string()), ..Default::default() });
		let medium =
			compile_ok(ListParams { severity: Some("6.99".to_string()), ..Default::default() });
		let low = compile_ok(ListParams { severity: Some("0".to_string()), ..Default::default() });

		assert_eq!(high.severity, Some(SeverityBucket::High));
		assert_eq!(medium.severity, Some(SeverityBucket::Medium));
		assert_eq!(low.severity, Some(SeverityBucket::Low));
	}

	#[test]
	fn empty_values_are_absent() {
		let query = compile_ok(ListParams {
			status: Some("".to_string()),
			search: Some("  ".to_string()),
			..Default::default()
		});

		assert_eq!(query.status, None);
		assert_eq!(query.search, None);
	}

	#[test]
	fn unknown_sort_field_degrades_to_default() {
		let query = compile_ok(ListParams {
			sort_by: Some("reporterId; DROP TABLE users".to_string()),
			sort_order: Some("sideways".to_string()),
			..Default::default()
		});

		assert_eq!(query.sort_key, SortKey::CreatedAt);
		assert_eq!(query.sort_order, SortOrder::Desc);
	}

	#[test]
	fn allowlisted_sort_fields_resolve() {
		assert_eq!(SortKey::parse("cvssScore"), Some(SortKey::CvssScore));
		assert_eq!(SortKey::parse("updatedAt"), Some(SortKey::UpdatedAt));
		assert_eq!(SortKey::parse("title"), Some(SortKey::Title));
		assert_eq!(SortKey::parse("reporter_id"), None);
	}

	#[test]
	fn escapes_like_metacharacters() {
		assert_eq!(escape_like("100%_done\\"), "100\\%\\_done\\\\");
		assert_eq!(escape_like("plain"), "plain");
	}

	#[test]
	fn researcher_scope_is_carried_into_the_descriptor() {
		let id = Uuid::new_v4();
		let query = compile(&ListParams::default(), AccessScope::Researcher(id), 10)
			.expect("Failed to compile params.");

		assert_eq!(query.scope.reporter_filter(), Some(id));
	}

	#[test]
	fn filters_compose_into_sql() {
		let query = VulnerabilityQuery {
			scope: AccessScope::Researcher(Uuid::new_v4()),
			status: Some("REPORTED".to_string()),
			severity: Some(SeverityBucket::Medium),
			search: Some("sql".to_string()),
			sort_key: SortKey::CvssScore,
			sort_order: SortOrder::Asc,
			page: 2,
			limit: 5,
		};
		let mut builder = QueryBuilder::new("SELECT count(*) FROM vulnerabilities v");

		push_filters(&mut builder, &query);
		push_page(&mut builder, &query);

		let sql = builder.into_sql();

		assert!(sql.contains("v.reporter_id = "));
		assert!(sql.contains("v.status = "));
		assert!(sql.contains("v.cvss_score >= "));
		assert!(sql.contains("v.cvss_score < "));
		assert!(sql.contains("v.title ILIKE "));
		assert!(sql.contains("ORDER BY v.cvss_score ASC"));
	}
}
