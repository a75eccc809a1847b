//! CLI argument parsing for Centinela

use crate::perf::Thresholds;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Console output format for analysis results
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// Full insight payload as JSON for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "centinela")]
#[command(version)]
#[command(about = "Statistical anomaly detection for QA crawl runs", long_about = None)]
pub struct Cli {
    /// Root directory containing historical run folders
    #[arg(
        short = 'r',
        long = "results-dir",
        value_name = "DIR",
        default_value = "results"
    )]
    pub results_dir: PathBuf,

    /// Visual diff summary JSON (default: <results-dir>/visual_diffs/visual_diff_summary.json)
    #[arg(long = "visual-diffs", value_name = "FILE")]
    pub visual_diffs: Option<PathBuf>,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Where to write the insight payload (default: <results-dir>/ai_insights.json)
    #[arg(short = 'o', long = "output", value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Skip writing the insight payload to disk
    #[arg(long = "no-save")]
    pub no_save: bool,

    /// External summary command; receives findings JSON on stdin, prints text
    #[arg(long = "summary-cmd", value_name = "CMD")]
    pub summary_cmd: Option<String>,

    /// Run-level average change that raises the alert flag, in percent
    #[arg(long = "run-pct-threshold", value_name = "PCT", default_value = "20.0")]
    pub run_pct_threshold: f64,

    /// Per-page run-over-run change that flags a page, in percent
    #[arg(long = "page-pct-threshold", value_name = "PCT", default_value = "30.0")]
    pub page_pct_threshold: f64,

    /// In-run outlier threshold in standard deviations
    #[arg(long = "zscore-threshold", value_name = "SIGMA", default_value = "2.5")]
    pub zscore_threshold: f64,

    /// Enable debug logging to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}

impl Cli {
    /// Effective visual diff summary path
    pub fn visual_diffs_path(&self) -> PathBuf {
        self.visual_diffs.clone().unwrap_or_else(|| {
            self.results_dir
                .join("visual_diffs")
                .join("visual_diff_summary.json")
        })
    }

    /// Effective insight payload output path
    pub fn output_path(&self) -> PathBuf {
        self.output
            .clone()
            .unwrap_or_else(|| self.results_dir.join("ai_insights.json"))
    }

    /// Detection thresholds assembled from the CLI flags
    pub fn thresholds(&self) -> Thresholds {
        Thresholds {
            run_pct: self.run_pct_threshold,
            page_pct: self.page_pct_threshold,
            zscore: self.zscore_threshold,
        }
    }
}
