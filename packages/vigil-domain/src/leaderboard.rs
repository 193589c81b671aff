use time::{Date, Duration, Month, OffsetDateTime};

use crate::status::VulnerabilityStatus;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Period {
	All,
	Month,
	Week,
}
impl Period {
	/// Unknown values fall back to `All`, matching the listing layer's
	/// degrade-instead-of-reject policy for filter values.
	pub fn parse(raw: &str) -> Self {
		match raw {
			"month" => Self::Month,
			"week" => Self::Week,
			_ => Self::All,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::All => "all",
			Self::Month => "month",
			Self::Week => "week",
		}
	}

	/// Start of the scoring window, or `None` when the period is unbounded.
	pub fn window_start(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
		match self {
			Self::All => None,
			Self::Month => Some(one_calendar_month_back(now)),
			Self::Week => Some(now - Duration::days(7)),
		}
	}
}

/// One calendar month earlier, with the day-of-month clamped to the length of
/// the target month (Mar 31 -> Feb 28/29).
fn one_calendar_month_back(now: OffsetDateTime) -> OffsetDateTime {
	let date = now.date();
	let (year, month) = match date.month() {
		Month::January => (date.year() - 1, Month::December),
		month => (date.year(), month.previous()),
	};
	let day = date.day().min(month.length(year));
	let shifted = Date::from_calendar_date(year, month, day).unwrap_or(date);

	now.replace_date(shifted)
}

#[derive(Clone, Copy, Debug)]
pub struct ScoredReport {
	pub cvss_score: f64,
	pub status: VulnerabilityStatus,
}

/// Sum of `cvss_score * status weight` over a researcher's reports, rounded
/// half-up to two decimal places.
pub fn weighted_score(reports: &[ScoredReport]) -> f64 {
	let total: f64 =
		reports.iter().map(|report| report.cvss_score * report.status.weight()).sum();

	round_score(total)
}

pub fn round_score(value: f64) -> f64 {
	(value * 100.0).round() / 100.0
}
