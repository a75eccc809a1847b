//! Statistical outlier detection over timing samples
//!
//! Two independent stateless detectors (interquartile range and z-score) plus
//! the union that keeps per-method attribution. Both operate on the sample in
//! its original order and only ever flag indices, never values.

use std::cmp::Ordering;

/// Default z-score threshold in population standard deviations
pub const DEFAULT_ZSCORE_THRESHOLD: f64 = 2.5;

/// A flagged sample index with the method(s) that flagged it
///
/// A hit flagged by both methods is dual-attributed, not a stronger signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutlierHit {
    /// Index into the original (unsorted) sample
    pub index: usize,
    /// Flagged by the IQR method
    pub iqr: bool,
    /// Flagged by the z-score method
    pub zscore: bool,
}

/// Arithmetic mean; 0.0 for an empty sample
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation (divide by n, not n-1); 0.0 for an empty sample
pub fn population_stdev(values: &[f64], mean: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Indices of upper-tail IQR outliers
///
/// Quartiles are taken at the truncated positions `(n * 0.25)` and `(n * 0.75)`
/// of the sorted sample. A degenerate sample with `iqr == 0` has no outliers.
/// Only values above `q3 + 1.5 * iqr` are flagged; unusually fast pages are
/// never outliers.
pub fn iqr_outliers(values: &[f64]) -> Vec<usize> {
    if values.is_empty() {
        return Vec::new();
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));

    let n = values.len();
    let q1 = sorted[(n as f64 * 0.25) as usize];
    let q3 = sorted[(n as f64 * 0.75) as usize];
    let iqr = q3 - q1;
    if iqr == 0.0 {
        return Vec::new();
    }

    let upper = q3 + 1.5 * iqr;
    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| v > upper)
        .map(|(i, _)| i)
        .collect()
}

/// Indices where `|value - mean| / stdev` meets the threshold
///
/// Uses population statistics. Samples of fewer than two values, or with zero
/// spread, have no outliers.
pub fn zscore_outliers(values: &[f64], threshold: f64) -> Vec<usize> {
    if values.len() < 2 {
        return Vec::new();
    }
    let mean = mean(values);
    let stdev = population_stdev(values, mean);
    if stdev == 0.0 {
        return Vec::new();
    }

    values
        .iter()
        .enumerate()
        .filter(|(_, &v)| ((v - mean) / stdev).abs() >= threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Deduplicated union of both detectors, ascending by index
pub fn detect_outliers(values: &[f64], zscore_threshold: f64) -> Vec<OutlierHit> {
    let iqr_idx = iqr_outliers(values);
    let z_idx = zscore_outliers(values, zscore_threshold);

    let mut flagged: Vec<usize> = iqr_idx.iter().chain(z_idx.iter()).copied().collect();
    flagged.sort_unstable();
    flagged.dedup();

    flagged
        .into_iter()
        .map(|index| OutlierHit {
            index,
            iqr: iqr_idx.contains(&index),
            zscore: z_idx.contains(&index),
        })
        .collect()
}
