use anyhow::{Context, Result};
use centinela::cli::{Cli, OutputFormat};
use centinela::insight::InsightPayload;
use centinela::run_store::{MetricsSource, RunStore};
use centinela::summary::{
    self, ExternalCommandGenerator, RunInfo, SummaryGenerator, SummaryInputs,
};
use centinela::{perf, visual};
use clap::Parser;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::TRACE.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Print the human-readable console report
fn print_text_summary(payload: &InsightPayload) {
    println!("=== Crawl Insight Summary ===");
    println!("Run:       {}", payload.run_id);
    println!("Generated: {}", payload.timestamp);
    println!(
        "Performance anomalies: {} per-page, {} run-level",
        payload.performance_anomalies.per_page.len(),
        payload.performance_anomalies.run_level.len()
    );
    println!("Visual anomalies:      {}", payload.visual_anomalies.len());
    println!();
    println!("{}", payload.summary.text);
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let store = RunStore::new(&cli.results_dir);
    let runs = store.list_runs()?;
    let latest = runs.last().context("run list is empty")?;
    tracing::debug!("analyzing {} run(s), latest: {}", runs.len(), latest.id);

    let thresholds = cli.thresholds();
    let performance = perf::analyze(&store, &runs, &thresholds);
    let diff_records = store.load_visual_diffs(&cli.visual_diffs_path());
    let visual_anomalies = visual::analyze(&diff_records);

    let run_info = RunInfo {
        latest_run: latest.id.clone(),
        num_pages: store.metrics_for(latest).len(),
        visual_diffs_count: diff_records.len(),
    };
    let findings = SummaryInputs {
        run_info: &run_info,
        performance_anomalies: &performance,
        visual_anomalies: &visual_anomalies,
    };
    let external = cli.summary_cmd.as_deref().map(ExternalCommandGenerator::new);
    let summary = summary::generate_summary(
        external.as_ref().map(|g| g as &dyn SummaryGenerator),
        &findings,
    );

    let payload = InsightPayload::new(latest.id.clone(), performance, visual_anomalies, summary);

    if !cli.no_save {
        let path = cli.output_path();
        std::fs::write(&path, payload.to_json()?)
            .with_context(|| format!("failed to write insights to {}", path.display()))?;
        tracing::debug!("insight payload written to {}", path.display());
    }

    match cli.format {
        OutputFormat::Json => println!("{}", payload.to_json()?),
        OutputFormat::Text => print_text_summary(&payload),
    }

    Ok(())
}
