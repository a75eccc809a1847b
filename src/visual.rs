//! Visual diff anomaly analysis
//!
//! Applies an adaptive threshold (mean + 2 stdev, floored at a minimum
//! percentage) to the global visual-diff snapshot. The floor guarantees that
//! a fully stable run with zero mean and zero variance flags nothing.

use crate::run_store::VisualDiffRecord;
use crate::stats;
use serde::Serialize;

/// Minimum diff percentage that can ever be flagged
pub const MIN_DIFF_THRESHOLD: f64 = 1.0;

/// Why a page was flagged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualReason {
    HighDiff,
}

/// A page whose visual diff exceeds the adaptive threshold
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VisualAnomaly {
    pub url: String,
    pub diff_percent: f64,
    pub reason: VisualReason,
}

/// Flag every record at or above `max(1.0, mean + 2 * stdev)`
///
/// Population stdev, taken as 0 below two records. Output preserves input
/// order; there is no sorting by magnitude.
pub fn analyze(records: &[VisualDiffRecord]) -> Vec<VisualAnomaly> {
    if records.is_empty() {
        return Vec::new();
    }

    let diffs: Vec<f64> = records.iter().map(|r| r.diff_percent).collect();
    let mean = stats::mean(&diffs);
    let stdev = if diffs.len() > 1 {
        stats::population_stdev(&diffs, mean)
    } else {
        0.0
    };
    let threshold = (mean + 2.0 * stdev).max(MIN_DIFF_THRESHOLD);

    records
        .iter()
        .filter(|r| r.diff_percent >= threshold)
        .map(|r| VisualAnomaly {
            url: r.url.clone(),
            diff_percent: r.diff_percent,
            reason: VisualReason::HighDiff,
        })
        .collect()
}
