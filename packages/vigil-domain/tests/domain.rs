use time::macros::datetime;
use uuid::Uuid;

use vigil_domain::{
	aggregate::{bucket_score_counts, count_map},
	leaderboard::{Period, ScoredReport, round_score, weighted_score},
	pagination::{offset, paginate},
	scope::{AccessScope, Caller, Role},
	severity::{SeverityBucket, cvss_in_range},
	status::{VulnerabilityStatus, status_weight},
};

#[test]
fn admin_scope_sees_everything() {
	let caller = Caller { id: Uuid::new_v4(), role: Role::Admin };
	let scope = caller.scope();

	assert_eq!(scope, AccessScope::Admin);
	assert_eq!(scope.reporter_filter(), None);
	assert!(scope.allows_reporter(Uuid::new_v4()));
}

#[test]
fn researcher_scope_restricts_to_own_reports() {
	let id = Uuid::new_v4();
	let scope = Caller { id, role: Role::Researcher }.scope();

	assert_eq!(scope, AccessScope::Researcher(id));
	assert_eq!(scope.reporter_filter(), Some(id));
	assert!(scope.allows_reporter(id));
	assert!(!scope.allows_reporter(Uuid::new_v4()));
}

#[test]
fn role_parsing_is_exact() {
	assert_eq!(Role::parse("ADMIN"), Some(Role::Admin));
	assert_eq!(Role::parse("RESEARCHER"), Some(Role::Researcher));
	assert_eq!(Role::parse("admin"), None);
	assert_eq!(Role::parse(""), None);
}

#[test]
fn paginates_partial_last_page() {
	let meta = paginate(25, 3, 10);

	assert_eq!(meta.page, 3);
	assert_eq!(meta.limit, 10);
	assert_eq!(meta.total, 25);
	assert_eq!(meta.pages, 3);
}

#[test]
fn paginates_empty_result_set() {
	assert_eq!(paginate(0, 1, 10).pages, 0);
}

#[test]
fn paginates_exact_multiple() {
	assert_eq!(paginate(30, 1, 10).pages, 3);
}

#[test]
fn paginates_with_oversized_limit() {
	assert_eq!(paginate(25, 1, i64::MAX).pages, 1);
}

#[test]
fn computes_skip_offset() {
	assert_eq!(offset(1, 10), 0);
	assert_eq!(offset(3, 10), 20);
}

#[test]
fn offset_saturates_instead_of_overflowing() {
	assert_eq!(offset(i64::MAX, 10), i64::MAX);
	assert_eq!(offset(i64::MAX, 1), i64::MAX - 1);
	assert!(offset(i64::MAX, i64::MAX) >= 0);
}

#[test]
fn severity_bucket_boundaries() {
	assert_eq!(SeverityBucket::from_score(7.0), SeverityBucket::High);
	assert_eq!(SeverityBucket::from_score(6.99), SeverityBucket::Medium);
	assert_eq!(SeverityBucket::from_score(4.0), SeverityBucket::Medium);
	assert_eq!(SeverityBucket::from_score(3.99), SeverityBucket::Low);
	assert_eq!(SeverityBucket::from_score(0.0), SeverityBucket::Low);
	assert_eq!(SeverityBucket::from_score(10.0), SeverityBucket::High);
}

#[test]
fn severity_bucket_membership() {
	assert!(SeverityBucket::High.contains(10.0));
	assert!(SeverityBucket::High.contains(7.0));
	assert!(!SeverityBucket::High.contains(6.99));
	assert!(SeverityBucket::Medium.contains(4.0));
	assert!(!SeverityBucket::Medium.contains(7.0));
	assert!(SeverityBucket::Low.contains(0.0));
	assert!(!SeverityBucket::Low.contains(4.0));
}

#[test]
fn any_threshold_in_band_selects_that_band() {
	assert_eq!(SeverityBucket::from_threshold(8.3), SeverityBucket::High);
	assert_eq!(SeverityBucket::from_threshold(5.0), SeverityBucket::Medium);
	assert_eq!(SeverityBucket::from_threshold(1.0), SeverityBucket::Low);
}

#[test]
fn cvss_range_is_closed() {
	assert!(cvss_in_range(0.0));
	assert!(cvss_in_range(10.0));
	assert!(!cvss_in_range(10.01));
	assert!(!cvss_in_range(-0.01));
}

#[test]
fn status_weights() {
	assert_eq!(VulnerabilityStatus::Reported.weight(), 1.0);
	assert_eq!(VulnerabilityStatus::Verified.weight(), 1.2);
	assert_eq!(VulnerabilityStatus::Fixed.weight(), 1.5);
	assert_eq!(status_weight("FIXED"), 1.5);
	assert_eq!(status_weight("UNKNOWN"), 1.0);
}

#[test]
fn weighted_score_sums_and_rounds() {
	let reports = [
		ScoredReport { cvss_score: 8.0, status: VulnerabilityStatus::Fixed },
		ScoredReport { cvss_score: 6.0, status: VulnerabilityStatus::Verified },
	];

	assert_eq!(weighted_score(&reports), 19.2);
}

#[test]
fn weighted_score_of_no_reports_is_zero() {
	assert_eq!(weighted_score(&[]), 0.0);
}

#[test]
fn rounds_half_up_to_two_decimals() {
	assert_eq!(round_score(19.199_999_999_999_996), 19.2);
	assert_eq!(round_score(2.346), 2.35);
	assert_eq!(round_score(2.344), 2.34);
}

#[test]
fn period_parsing_defaults_to_all() {
	assert_eq!(Period::parse("month"), Period::Month);
	assert_eq!(Period::parse("week"), Period::Week);
	assert_eq!(Period::parse("all"), Period::All);
	assert_eq!(Period::parse("fortnight"), Period::All);
}

#[test]
fn all_period_has_no_window() {
	assert_eq!(Period::All.window_start(datetime!(2024-03-15 12:00 UTC)), None);
}

#[test]
fn week_window_is_seven_days() {
	let now = datetime!(2024-03-15 12:00 UTC);

	assert_eq!(Period::Week.window_start(now), Some(datetime!(2024-03-08 12:00 UTC)));
}

#[test]
fn month_window_steps_back_one_calendar_month() {
	let now = datetime!(2024-03-15 12:00 UTC);

	assert_eq!(Period::Month.window_start(now), Some(datetime!(2024-02-15 12:00 UTC)));
}

#[test]
fn month_window_clamps_day_of_month() {
	// 2024 is a leap year.
	assert_eq!(
		Period::Month.window_start(datetime!(2024-03-31 12:00 UTC)),
		Some(datetime!(2024-02-29 12:00 UTC)),
	);
	assert_eq!(
		Period::Month.window_start(datetime!(2023-03-31 12:00 UTC)),
		Some(datetime!(2023-02-28 12:00 UTC)),
	);
}

#[test]
fn month_window_wraps_the_year() {
	assert_eq!(
		Period::Month.window_start(datetime!(2024-01-31 12:00 UTC)),
		Some(datetime!(2023-12-31 12:00 UTC)),
	);
}

#[test]
fn roles_and_statuses_serialize_as_stored() {
	assert_eq!(serde_json::to_value(Role::Admin).unwrap(), "ADMIN");
	assert_eq!(serde_json::to_value(VulnerabilityStatus::Verified).unwrap(), "VERIFIED");
	assert_eq!(
		serde_json::from_value::<VulnerabilityStatus>(serde_json::json!("FIXED")).unwrap(),
		VulnerabilityStatus::Fixed,
	);
}

#[test]
fn count_map_merges_and_is_idempotent() {
	let rows = vec![("REPORTED".to_string(), 2), ("FIXED".to_string(), 1), ("REPORTED".to_string(), 3)];
	let first = count_map(rows.clone());
	let second = count_map(rows);

	assert_eq!(first.get("REPORTED"), Some(&5));
	assert_eq!(first.get("FIXED"), Some(&1));
	assert_eq!(first, second);
}

#[test]
fn buckets_score_counts_into_bands() {
	let rows = vec![(9.8, 2), (7.0, 1), (6.99, 4), (4.0, 1), (3.9, 5), (0.0, 1)];
	let bands = bucket_score_counts(rows);

	assert_eq!(bands.high, 3);
	assert_eq!(bands.medium, 5);
	assert_eq!(bands.low, 6);
}
