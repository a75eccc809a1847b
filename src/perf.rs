//! Performance anomaly analysis for the latest crawl run
//!
//! Combines in-run outlier detection (IQR + z-score over the latest run's
//! elapsed times) with a run-over-run comparison against the most recent
//! prior run that has data. A page can legitimately appear twice in the
//! per-page results, once per reason; the two are never merged.

use crate::run_store::{MetricsSource, Run};
use crate::stats;
use serde::Serialize;
use std::collections::HashMap;

/// Detection thresholds, all overridable from the CLI
#[derive(Debug, Clone, Copy)]
pub struct Thresholds {
    /// Run-level average change that raises the alert flag, in percent (strict >)
    pub run_pct: f64,
    /// Per-page change that emits an anomaly, in percent (>=)
    pub page_pct: f64,
    /// Z-score threshold in population standard deviations
    pub zscore: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            run_pct: 20.0,
            page_pct: 30.0,
            zscore: stats::DEFAULT_ZSCORE_THRESHOLD,
        }
    }
}

/// A per-page performance anomaly
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum PerformanceAnomaly {
    /// Unusually slow within the latest run, with per-method attribution
    InternalOutlier {
        url: String,
        /// Elapsed seconds in the latest run
        time: f64,
        iqr: bool,
        zscore: bool,
    },
    /// Large change against the same page in the baseline run
    PercentIncrease {
        url: String,
        /// Elapsed seconds in the latest run
        time: f64,
        #[serde(rename = "pctChange")]
        pct_change: f64,
    },
}

/// Average-time comparison between the latest run and its baseline
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunLevelComparison {
    pub previous_run_id: String,
    pub previous_avg: f64,
    pub latest_avg: f64,
    /// Undefined when the baseline average is zero
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percent_change: Option<f64>,
    pub alert_flag: bool,
}

/// Full performance analysis output for one invocation
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PerformanceReport {
    pub per_page: Vec<PerformanceAnomaly>,
    /// At most one entry; never aggregated across more than two runs
    pub run_level: Vec<RunLevelComparison>,
}

/// Analyze the latest run of an ascending-ordered run sequence
///
/// The latest run is the final element. An empty latest run yields an empty
/// report. The baseline is the nearest prior run with non-empty metrics; with
/// no baseline the run-level comparison and percent-increase anomalies are
/// skipped entirely.
pub fn analyze(
    source: &dyn MetricsSource,
    runs: &[Run],
    thresholds: &Thresholds,
) -> PerformanceReport {
    let mut report = PerformanceReport::default();
    let Some((latest, prior)) = runs.split_last() else {
        return report;
    };

    let latest_metrics = source.metrics_for(latest);
    if latest_metrics.is_empty() {
        tracing::debug!("run {}: no metrics, skipping performance analysis", latest.id);
        return report;
    }

    let times: Vec<f64> = latest_metrics.iter().map(|m| m.elapsed).collect();
    for hit in stats::detect_outliers(&times, thresholds.zscore) {
        report.per_page.push(PerformanceAnomaly::InternalOutlier {
            url: latest_metrics[hit.index].url.clone(),
            time: times[hit.index],
            iqr: hit.iqr,
            zscore: hit.zscore,
        });
    }

    // Baseline: nearest prior run that actually has data
    let baseline = prior.iter().rev().find_map(|run| {
        let metrics = source.metrics_for(run);
        if metrics.is_empty() {
            None
        } else {
            Some((run, metrics))
        }
    });
    let Some((previous_run, previous_metrics)) = baseline else {
        return report;
    };

    let latest_avg = stats::mean(&times);
    let previous_times: Vec<f64> = previous_metrics.iter().map(|m| m.elapsed).collect();
    let previous_avg = stats::mean(&previous_times);
    let percent_change = if previous_avg != 0.0 {
        Some((latest_avg - previous_avg) / previous_avg * 100.0)
    } else {
        None
    };
    report.run_level.push(RunLevelComparison {
        previous_run_id: previous_run.id.clone(),
        previous_avg,
        latest_avg,
        percent_change,
        alert_flag: percent_change.is_some_and(|pct| pct.abs() > thresholds.run_pct),
    });

    // Last write wins when the baseline repeats a url
    let mut previous_by_url: HashMap<&str, f64> = HashMap::new();
    for metric in &previous_metrics {
        previous_by_url.insert(metric.url.as_str(), metric.elapsed);
    }

    for metric in &latest_metrics {
        let Some(&previous) = previous_by_url.get(metric.url.as_str()) else {
            continue;
        };
        if previous == 0.0 {
            continue;
        }
        let pct = (metric.elapsed - previous) / previous * 100.0;
        if pct.abs() >= thresholds.page_pct {
            report.per_page.push(PerformanceAnomaly::PercentIncrease {
                url: metric.url.clone(),
                time: metric.elapsed,
                pct_change: pct,
            });
        }
    }

    report
}
