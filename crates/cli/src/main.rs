//! rowcheck command-line entry point
//!
//! Parses flags, installs logging, hooks interrupts to the stop flag, runs the
//! harness on a blocking thread and maps the outcome to an exit code.
mod args;

use std::path::Path;
use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use rowcheck_engine::{Harness, HarnessReport};
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

use args::Args;

/// Verification ran and found defects.
const EXIT_VERIFY_FAILED: u8 = 2;

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = args.to_config()?;
    let harness = Harness::new(config).context("initialize rowcheck")?;

    let stop = harness.stop_flag();
    tokio::spawn(async move {
        shutdown_signal().await;
        warn!("Interrupt received, stopping after in-flight batches");
        stop.set();
    });

    let report = tokio::task::spawn_blocking(move || harness.run())
        .await
        .context("harness thread")?
        .context("run rowcheck")?;

    if let Some(path) = &args.report {
        write_report(path, &report)?;
    }
    Ok(summarize(&report))
}

fn init_logging(args: &Args) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt::Subscriber::builder().with_env_filter(filter);
    if let Some(log_file_path) = &args.log_file {
        let file = std::fs::File::create(log_file_path)
            .with_context(|| format!("create log file {}", log_file_path.display()))?;
        subscriber.with_ansi(false).with_writer(Arc::new(file)).init();
    } else {
        subscriber.init();
    }
    Ok(())
}

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = term.recv() => {}
                }
                return;
            }
            Err(e) => warn!(error = %e, "Install SIGTERM handler failed"),
        }
    }
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "Install interrupt handler failed");
        std::future::pending::<()>().await;
    }
}

fn write_report(path: &Path, report: &HarnessReport) -> anyhow::Result<()> {
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json).with_context(|| format!("write report {}", path.display()))?;
    info!(path = %path.display(), "Wrote run report");
    Ok(())
}

fn summarize(report: &HarnessReport) -> ExitCode {
    if let Some(insert) = &report.insert {
        info!(
            rows_inserted = insert.rows_inserted,
            failed_batches = insert.failed_batches,
            ledger = ?insert.ledger_counts,
            "Insert summary"
        );
        if !insert.ledger_stored {
            warn!("Progress ledger was not stored; the next insert run will not resume");
        }
    }
    if let Some(secs) = report.elapsed_secs {
        println!("Time consume is {:.3}s", secs);
    }
    match &report.verify {
        Some(verify) if verify.passed() => {
            println!("Check success! {} entries verified", verify.checked);
            ExitCode::SUCCESS
        }
        Some(verify) => {
            for failure in &verify.failures {
                println!("  {}", failure);
            }
            println!(
                "Check failed: {} of {} entries",
                verify.failures.len(),
                verify.checked
            );
            ExitCode::from(EXIT_VERIFY_FAILED)
        }
        None => ExitCode::SUCCESS,
    }
}
