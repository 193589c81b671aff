pub const CVSS_MIN: f64 = 0.0;
pub const CVSS_MAX: f64 = 10.0;

pub fn cvss_in_range(score: f64) -> bool {
	(CVSS_MIN..=CVSS_MAX).contains(&score)
}

/// One of three CVSS score bands. The filter parameter is a single numeric
/// threshold overloaded as a bucket selector: any number in the desired band
/// selects that band. Callers cannot request an arbitrary range.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SeverityBucket {
	Low,
	Medium,
	High,
}
impl SeverityBucket {
	pub fn from_threshold(value: f64) -> Self {
		if value >= 7.0 {
			Self::High
		} else if value >= 4.0 {
			Self::Medium
		} else {
			Self::Low
		}
	}

	pub fn from_score(score: f64) -> Self {
		Self::from_threshold(score)
	}

	/// Inclusive lower bound of the band.
	pub fn lower_bound(&self) -> f64 {
		match self {
			Self::Low => 0.0,
			Self::Medium => 4.0,
			Self::High => 7.0,
		}
	}

	/// Exclusive upper bound, or `None` for the high band which runs to the
	/// CVSS ceiling inclusive.
	pub fn upper_bound(&self) -> Option<f64> {
		match self {
			Self::Low => Some(4.0),
			Self::Medium => Some(7.0),
			Self::High => None,
		}
	}

	pub fn contains(&self, score: f64) -> bool {
		score >= self.lower_bound()
			&& self.upper_bound().map(|upper| score < upper).unwrap_or(score <= CVSS_MAX)
	}

	pub fn as_str(&self) -> &'static str {
		match self {
			Self::Low => "low",
			Self::Medium => "medium",
			Self::High => "high",
		}
	}
}
