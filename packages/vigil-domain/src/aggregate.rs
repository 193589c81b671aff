use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::severity::SeverityBucket;

/// Folds grouped `(key, count)` rows into a deterministic mapping, merging
/// duplicate keys. Re-running over an unchanged row set yields an identical
/// mapping.
pub fn count_map<K, I>(rows: I) -> BTreeMap<K, i64>
where
	K: Ord,
	I: IntoIterator<Item = (K, i64)>,
{
	let mut counts = BTreeMap::new();

	for (key, count) in rows {
		*counts.entry(key).or_insert(0) += count;
	}

	counts
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct SeverityBandCounts {
	pub low: i64,
	pub medium: i64,
	pub high: i64,
}

/// Re-buckets raw per-score group counts into the three severity bands used
/// by dashboards.
pub fn bucket_score_counts<I>(rows: I) -> SeverityBandCounts
where
	I: IntoIterator<Item = (f64, i64)>,
{
	let mut bands = SeverityBandCounts::default();

	for (score, count) in rows {
		match SeverityBucket::from_score(score) {
			SeverityBucket::Low => bands.low += count,
			SeverityBucket::Medium => bands.medium += count,
			SeverityBucket::High => bands.high += count,
		}
	}

	bands
}
