//! Natural-language summary composition
//!
//! The deterministic local composer always exists and always produces a
//! non-empty, well-formed summary. An optional external generator (a
//! user-configured command fed the structured findings on stdin) may replace
//! it; any external failure falls back to the local output and is never
//! surfaced to the caller.

use crate::perf::{PerformanceAnomaly, PerformanceReport};
use crate::visual::VisualAnomaly;
use anyhow::{bail, Context};
use serde::Serialize;
use std::io::Write;
use std::process::{Command, Stdio};

/// Fixed prioritized-recommendation bullets, always appended
const RECOMMENDATIONS: [&str; 2] = [
    "Check the top slow pages and audit heavy network requests, large images, and blocking scripts.",
    "Open the saved screenshots for the flagged pages and run a DOM-level diff to locate the root cause.",
];

/// Maximum per-page anomalies rendered as example sub-bullets
const MAX_EXAMPLES: usize = 4;

/// Where the summary text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SummarySource {
    Local,
    External,
}

/// Summary text plus its provenance tag
#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub source: SummarySource,
    pub text: String,
}

/// Metadata about the analyzed run, included in generator input
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RunInfo {
    pub latest_run: String,
    pub num_pages: usize,
    pub visual_diffs_count: usize,
}

/// Structured findings handed to a summary generator
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryInputs<'a> {
    pub run_info: &'a RunInfo,
    pub performance_anomalies: &'a PerformanceReport,
    pub visual_anomalies: &'a [VisualAnomaly],
}

/// Produce summary text from structured findings, or fail
pub trait SummaryGenerator {
    fn generate(&self, findings: &SummaryInputs<'_>) -> anyhow::Result<String>;
}

/// The deterministic rule-based composer; the required fallback path
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalComposer;

impl LocalComposer {
    /// Render findings as a bullet list; never empty
    pub fn compose(&self, findings: &SummaryInputs<'_>) -> String {
        let mut bullets: Vec<String> = Vec::new();

        for cmp in &findings.performance_anomalies.run_level {
            if let Some(pct) = cmp.percent_change {
                if cmp.alert_flag {
                    bullets.push(format!(
                        "Run average load time changed by {:.1}% vs previous run ({}). Investigate overall performance regressions.",
                        pct, cmp.previous_run_id
                    ));
                } else {
                    bullets.push(format!(
                        "Run average load time changed by {:.1}% vs previous run ({}).",
                        pct, cmp.previous_run_id
                    ));
                }
            }
        }

        let per_page = &findings.performance_anomalies.per_page;
        if !per_page.is_empty() {
            bullets.push(format!(
                "{} page(s) show performance concerns (internal outliers or large % increases). Examples:",
                per_page.len()
            ));
            for anomaly in per_page.iter().take(MAX_EXAMPLES) {
                match anomaly {
                    PerformanceAnomaly::PercentIncrease { url, pct_change, .. } => {
                        bullets.push(format!("  * {url} changed by {pct_change:.1}%"));
                    }
                    PerformanceAnomaly::InternalOutlier { url, time, .. } => {
                        bullets.push(format!("  * {url} took {time}s (outlier)"));
                    }
                }
            }
        }

        if !findings.visual_anomalies.is_empty() {
            bullets.push(format!(
                "{} visual change(s) exceed threshold, possible UI regressions. Check screenshots for those URLs.",
                findings.visual_anomalies.len()
            ));
        }

        if bullets.is_empty() {
            bullets.push("No significant anomalies detected in this run. System looks stable.".to_string());
        }

        let mut lines: Vec<String> = bullets.into_iter().map(|b| format!("- {b}")).collect();
        lines.push(String::new());
        lines.push("Recommendations:".to_string());
        for rec in RECOMMENDATIONS {
            lines.push(format!("- {rec}"));
        }
        lines.join("\n")
    }
}

impl SummaryGenerator for LocalComposer {
    fn generate(&self, findings: &SummaryInputs<'_>) -> anyhow::Result<String> {
        Ok(self.compose(findings))
    }
}

/// External generator that pipes findings JSON into a shell command
///
/// The command's stdout becomes the summary text. Spawn failure, a non-zero
/// exit, or blank output are all errors and trigger the local fallback.
#[derive(Debug, Clone)]
pub struct ExternalCommandGenerator {
    command: String,
}

impl ExternalCommandGenerator {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }
}

impl SummaryGenerator for ExternalCommandGenerator {
    fn generate(&self, findings: &SummaryInputs<'_>) -> anyhow::Result<String> {
        let payload = serde_json::to_string_pretty(findings)?;

        let mut child = Command::new("sh")
            .arg("-c")
            .arg(&self.command)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .with_context(|| format!("failed to spawn summary command: {}", self.command))?;

        if let Some(mut stdin) = child.stdin.take() {
            // The command may exit without consuming stdin; judge it by exit
            // status and output instead
            let _ = stdin.write_all(payload.as_bytes());
        }

        let output = child
            .wait_with_output()
            .context("failed to collect summary command output")?;
        if !output.status.success() {
            bail!("summary command exited with {}", output.status);
        }

        let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
        if text.is_empty() {
            bail!("summary command produced no output");
        }
        Ok(text)
    }
}

/// Select the summary at the boundary: external when configured and
/// successful, local otherwise
pub fn generate_summary(
    external: Option<&dyn SummaryGenerator>,
    findings: &SummaryInputs<'_>,
) -> Summary {
    if let Some(generator) = external {
        match generator.generate(findings) {
            Ok(text) => {
                return Summary {
                    source: SummarySource::External,
                    text,
                }
            }
            Err(err) => {
                tracing::warn!("external summary failed, using local fallback: {}", err);
            }
        }
    }
    Summary {
        source: SummarySource::Local,
        text: LocalComposer.compose(findings),
    }
}
