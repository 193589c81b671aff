use serde::{Deserialize, Serialize};

/// Report lifecycle. `REPORTED -> VERIFIED -> FIXED` is a domain convention;
/// transition order is not enforced on writes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VulnerabilityStatus {
	Reported,
	Verified,
	Fixed,
}
impl VulnerabilityStatus {
	pub fn parse(raw: &str) -> Option<Self> {
		match raw {
			"REPORTED" => Some(Self::Reported),
			"VERIFIED" => Some(Self::Verified),
			"FIXED" => Some(Self::Fixed),
			_ => None,
		}
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Reported => "REPORTED",
			Self::Verified => "VERIFIED",
			Self::Fixed => "FIXED",
		}
	}

	/// Leaderboard weight applied to a report's CVSS score.
	pub fn weight(&self) -> f64 {
		match self {
			Self::Reported => 1.0,
			Self::Verified => 1.2,
			Self::Fixed => 1.5,
		}
	}
}

/// Weight for a raw status value as stored. Unknown statuses fall back to the
/// base weight.
pub fn status_weight(raw: &str) -> f64 {
	VulnerabilityStatus::parse(raw).map(|status| status.weight()).unwrap_or(1.0)
}
