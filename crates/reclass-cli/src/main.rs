//! `reclass`: move attachments uploaded under the wrong storage category.
//!
//! Loads `.env`, connects to the record store and the object store, runs one
//! reconciliation pass and prints a summary.
//!
//! Exit status: 0 when the pass completed, 1 when it could not start, 2 when
//! it completed but at least one record could not be written back.

mod config;

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::{error, info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use reclass_core::RunCounters;
use reclass_db::Database;
use reclass_engine::Reconciler;
use reclass_store::CloudinaryStore;

use crate::config::ReclassConfig;

/// The pass completed.
const EXIT_OK: u8 = 0;
/// Configuration, connection or listing failed before any record was visited.
const EXIT_NOT_STARTED: u8 = 1;
/// The pass completed but some records could not be written back.
const EXIT_RECORD_FAILURES: u8 = 2;

#[derive(Parser)]
#[command(name = "reclass")]
#[command(about = "Relocate attachments stored under the wrong category", long_about = None)]
#[command(version)]
struct Cli {
    /// Probe and report only; no uploads, deletions or record writes
    #[arg(long)]
    dry_run: bool,
}

/// Initialize tracing.
///
/// Environment variables:
///   LOG_FORMAT  - "json" or "text" (default: "text")
///   LOG_FILE    - path to log file (optional, daily rotation)
///   LOG_ANSI    - "true"/"false" override ANSI colors
///   RUST_LOG    - standard env filter (default: "reclass=info")
fn init_tracing() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let log_file = std::env::var("LOG_FILE").ok();
    let log_ansi = std::env::var("LOG_ANSI")
        .ok()
        .map(|v| v == "true" || v == "1");

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "reclass=info".into());
    let registry = tracing_subscriber::registry().with(env_filter);

    if let Some(ref path) = log_file {
        let path = std::path::Path::new(path);
        let file_dir = path.parent().unwrap_or(std::path::Path::new("."));
        let file_name = path
            .file_name()
            .and_then(|f| f.to_str())
            .unwrap_or("reclass.log");
        let file_appender = tracing_appender::rolling::daily(file_dir, file_name);
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

        if log_format == "json" {
            registry
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(non_blocking),
                )
                .init();
        } else {
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(log_ansi.unwrap_or(false)); // no ANSI in files
            registry.with(layer).init();
        }
        Some(guard)
    } else {
        if log_format == "json" {
            registry
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        } else {
            let mut layer = tracing_subscriber::fmt::layer();
            if let Some(ansi) = log_ansi {
                layer = layer.with_ansi(ansi);
            }
            registry.with(layer).init();
        }
        None
    }
}

/// Stop between records on Ctrl-C.
fn spawn_interrupt_handler() -> watch::Receiver<bool> {
    let (tx, rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, finishing current record");
            let _ = tx.send(true);
        }
    });
    rx
}

async fn run(cli: Cli) -> anyhow::Result<RunCounters> {
    let config = ReclassConfig::from_env().context("Invalid configuration")?;
    let dry_run = cli.dry_run || config.dry_run;

    info!(
        table = %config.records.layout.table,
        cloud = %config.store.cloud_name,
        target = %config.policy.target,
        extension = %config.policy.extension,
        dry_run,
        "Starting reclassification"
    );

    let db = Database::connect(&config.records)
        .await
        .context("Failed to connect to record store")?;
    let store = CloudinaryStore::new(config.store).context("Failed to set up object store")?;

    let counters = Reconciler::new(Arc::new(store), Arc::new(db.records), config.policy)
        .dry_run(dry_run)
        .with_shutdown(spawn_interrupt_handler())
        .run()
        .await
        .context("Failed to list records")?;

    db.pool.close().await;
    Ok(counters)
}

/// Exit status for a run outcome.
fn exit_status(outcome: &anyhow::Result<RunCounters>) -> u8 {
    match outcome {
        Ok(counters) if counters.has_record_failures() => EXIT_RECORD_FAILURES,
        Ok(_) => EXIT_OK,
        Err(_) => EXIT_NOT_STARTED,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    let _log_guard = init_tracing();

    let outcome = run(cli).await;
    match &outcome {
        Ok(counters) => {
            println!("{}", counters);
            if counters.has_record_failures() {
                error!(
                    record_failures = counters.record_failures,
                    "Some records could not be written back"
                );
            }
        }
        Err(e) => {
            let message = format!("{:#}", e);
            error!(error = %message, "Run could not start");
            eprintln!("Error: {}", message);
        }
    }
    ExitCode::from(exit_status(&outcome))
}
