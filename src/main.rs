use std::fs::File;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::Utc;
use rand::seq::SliceRandom;
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use scanherd::backends::{ZapConfig, ZapScanner};
use scanherd::{load_targets, Orchestrator, ScannerKind};

mod cli;

/// Console at the env-filter level, everything down to debug in a per-run
/// log file next to the reports.
fn init_logging(outdir: &Path, run_id: &str) -> Result<()> {
    let log_path = outdir.join(format!("scanherd_{run_id}.log"));
    let log_file = File::create(&log_path)
        .with_context(|| format!("cannot create log file {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer().with_filter(
                EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
            ),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(log_file))
                .with_filter(EnvFilter::new("debug")),
        )
        .init();
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let opts = cli::parse();
    let run_id = Utc::now().format("%Y%m%d-%H%M%S").to_string();

    std::fs::create_dir_all(&opts.outdir)?;
    init_logging(&opts.outdir, &run_id)?;

    let reports_dir = opts.outdir.join(&run_id);
    std::fs::create_dir_all(&reports_dir)?;

    let mut targets = load_targets(&opts.targets_data)?;
    // Shuffle so repeated partial runs don't keep hammering the same hosts
    // in the same order.
    targets.shuffle(&mut rand::thread_rng());

    info!(
        run_id = %run_id,
        targets = targets.len(),
        workers = opts.workers,
        scan_type = %opts.scan_type,
        outdir = %reports_dir.display(),
        "starting scan run"
    );

    let config = ZapConfig::default()
        .with_scan_type(opts.scan_type)
        .with_time_limit(Duration::from_secs(opts.time_limit_mins * 60));
    let mut orchestrator = Orchestrator::builder()
        .add_scanner(ZapScanner::new(config))
        .with_worker_count(opts.workers)
        .start()?;

    let total = targets.len();
    for target in &targets {
        orchestrator
            .submit(ScannerKind::Zap, &target.resource)
            .with_context(|| format!("cannot submit target {}", target.resource))?;
    }

    let mut finished = 0usize;
    while let Some(result) = orchestrator.next_result().await {
        finished += 1;
        info!("{}. ({finished}/{total})", result.outcome);
        if let Some(path) = result.outcome.write_report(&reports_dir)? {
            debug!(path = %path.display(), "wrote report");
        }
    }
    orchestrator.shutdown().await;

    info!(run_id = %run_id, finished, "scan run finished");
    Ok(())
}
