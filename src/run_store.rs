//! Run catalog discovery and metric loading
//!
//! Resolves historical crawl run folders (ordered by modification time) and
//! loads each run's page timing records plus the single global visual-diff
//! snapshot. Metric loading never fails: a missing or malformed source
//! degrades to an empty collection and downstream analysis treats that as
//! "no data". Only an empty run catalog is a hard error.

use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use thiserror::Error;

/// Folder names under the results root that are never runs
pub const RESERVED_FOLDERS: [&str; 2] = ["visual_diffs", "charts"];

/// Errors that can occur while resolving the run catalog
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("no run folders found in {}", .0.display())]
    NoRunsFound(PathBuf),
}

/// Result type for run catalog operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// One complete crawl execution, identified by its folder name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Run {
    /// Folder name under the results root; unique within a store
    pub id: String,
    /// Modification time used for recency ordering
    pub modified: SystemTime,
}

/// A single page timing measurement
///
/// A run may contain several metrics for the same url; each is a distinct
/// sample point and none are deduplicated.
#[derive(Debug, Clone, PartialEq)]
pub struct PageMetric {
    pub url: String,
    /// Page load time in seconds
    pub elapsed: f64,
}

/// A single page visual-diff measurement from the global snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct VisualDiffRecord {
    pub url: String,
    /// Changed-pixel percentage; 0.0 when the source value is not coercible
    pub diff_percent: f64,
}

/// Per-run metric loading seam consumed by the analyzers
pub trait MetricsSource {
    fn metrics_for(&self, run: &Run) -> Vec<PageMetric>;
}

/// Filesystem-backed store of historical runs
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    /// Create a store rooted at the given results directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Results root this store reads from
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// All candidate runs, ascending by modification time
    ///
    /// Reserved folders are excluded before ordering. Ties break by id so
    /// repeated invocations are deterministic.
    pub fn list_runs(&self) -> Result<Vec<Run>> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) => {
                tracing::debug!("cannot read results root {}: {}", self.root.display(), err);
                return Err(StoreError::NoRunsFound(self.root.clone()));
            }
        };

        let mut runs = Vec::new();
        for entry in entries.flatten() {
            if !entry.path().is_dir() {
                continue;
            }
            let id = entry.file_name().to_string_lossy().into_owned();
            if RESERVED_FOLDERS.contains(&id.as_str()) {
                continue;
            }
            let modified = entry
                .metadata()
                .and_then(|m| m.modified())
                .unwrap_or(SystemTime::UNIX_EPOCH);
            runs.push(Run { id, modified });
        }

        if runs.is_empty() {
            return Err(StoreError::NoRunsFound(self.root.clone()));
        }
        runs.sort_by(|a, b| a.modified.cmp(&b.modified).then_with(|| a.id.cmp(&b.id)));
        Ok(runs)
    }

    /// Page metrics for one run; empty means "no data", never an error
    ///
    /// The tabular export is authoritative when it parses cleanly. Any
    /// missing column or uncoercible row invalidates it as a whole and the
    /// per-page JSON records are used instead (older tool versions only wrote
    /// those).
    pub fn load_metrics(&self, run: &Run) -> Vec<PageMetric> {
        let run_dir = self.root.join(&run.id);
        if let Some(metrics) = load_metrics_csv(&run_dir.join("crawl_metrics.csv")) {
            return metrics;
        }
        tracing::debug!("run {}: no usable crawl_metrics.csv, trying summary.json", run.id);
        load_metrics_json(&run_dir.join("summary.json"))
    }

    /// Global visual-diff records; empty when the snapshot is absent or unparseable
    ///
    /// The snapshot is not partitioned by run: visual diffs always compare
    /// current against baseline screenshots regardless of crawl history.
    pub fn load_visual_diffs(&self, path: &Path) -> Vec<VisualDiffRecord> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(_) => return Vec::new(),
        };
        let records: Vec<Value> = match serde_json::from_str(&content) {
            Ok(records) => records,
            Err(err) => {
                tracing::debug!("unparseable visual diff summary {}: {}", path.display(), err);
                return Vec::new();
            }
        };

        records
            .iter()
            .filter_map(|record| {
                let url = record
                    .get("url")
                    .or_else(|| record.get("page"))
                    .and_then(Value::as_str)?;
                let diff_percent = record
                    .get("diffPercent")
                    .and_then(coerce_f64)
                    .unwrap_or(0.0);
                Some(VisualDiffRecord {
                    url: url.to_string(),
                    diff_percent,
                })
            })
            .collect()
    }
}

impl MetricsSource for RunStore {
    fn metrics_for(&self, run: &Run) -> Vec<PageMetric> {
        self.load_metrics(run)
    }
}

/// Strict tabular parse: None on any missing column or bad row
fn load_metrics_csv(path: &Path) -> Option<Vec<PageMetric>> {
    let content = fs::read_to_string(path).ok()?;
    let mut lines = content.lines();

    let header = split_csv_line(lines.next()?);
    let url_col = header.iter().position(|c| c.trim() == "url")?;
    let time_col = header.iter().position(|c| c.trim() == "timeTaken")?;

    let mut metrics = Vec::new();
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let fields = split_csv_line(line);
        let url = fields.get(url_col)?.clone();
        let elapsed = fields.get(time_col)?.trim().parse::<f64>().ok()?;
        metrics.push(PageMetric { url, elapsed });
    }
    Some(metrics)
}

/// Lenient per-page JSON parse: uncoercible records are dropped, not fatal
fn load_metrics_json(path: &Path) -> Vec<PageMetric> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(_) => return Vec::new(),
    };
    let records: Vec<Value> = match serde_json::from_str(&content) {
        Ok(records) => records,
        Err(err) => {
            tracing::debug!("unparseable summary {}: {}", path.display(), err);
            return Vec::new();
        }
    };

    let mut metrics = Vec::new();
    for record in &records {
        let url = record.get("url").and_then(Value::as_str);
        let elapsed = record.get("timeTaken").and_then(coerce_f64);
        match (url, elapsed) {
            (Some(url), Some(elapsed)) => metrics.push(PageMetric {
                url: url.to_string(),
                elapsed,
            }),
            _ => tracing::debug!("dropping malformed record in {}", path.display()),
        }
    }
    metrics
}

/// Numeric coercion accepting numbers and numeric strings
fn coerce_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Split one CSV line, honoring quoted fields with doubled-quote escapes
fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes => {
                if chars.peek() == Some(&'"') {
                    chars.next();
                    field.push('"');
                } else {
                    in_quotes = false;
                }
            }
            '"' => in_quotes = true,
            ',' if !in_quotes => fields.push(std::mem::take(&mut field)),
            _ => field.push(c),
        }
    }
    fields.push(field);
    fields
}
