//! dirsync worker
//!
//! Loads a local identity store from a JSON seed, runs one directory
//! synchronization through the sync worker queue and prints the run report
//! as JSON on stdout.
//!
//! Exit codes: 0 when the run finished (even with per-user failures), 1 on
//! startup errors, 2 when the run was aborted.

mod logging;

use std::path::{Path, PathBuf};
use std::process;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info};

use dirsync_directory::{DirectoryConfig, LdapConnector};
use dirsync_identity::{IdentitySeed, InMemoryIdentityRepository, PermissionModel};
use dirsync_reconciliation::{ConfigLoader, ReconciliationEngine, RunStatus, SyncTrigger, SyncWorker};

use logging::{init_logging, LogFormat, DEFAULT_LOG_FILTER};

/// Reconcile directory-backed users against the directory.
#[derive(Parser)]
#[command(name = "dirsync-worker")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// JSON file describing permissions, teams and users of the local store
    #[arg(long)]
    seed: PathBuf,

    /// Reconcile only this login instead of every directory-backed user
    #[arg(long)]
    user: Option<String>,

    /// Maximum number of queued triggers
    #[arg(long, default_value = "16")]
    queue_capacity: usize,
}

fn load_model(path: &Path) -> Result<PermissionModel, String> {
    let json = std::fs::read_to_string(path)
        .map_err(|e| format!("cannot read {}: {e}", path.display()))?;
    IdentitySeed::from_json(&json)
        .and_then(IdentitySeed::into_model)
        .map_err(|e| format!("invalid seed {}: {e}", path.display()))
}

#[tokio::main]
async fn main() {
    // Load .env if present
    let _ = dotenvy::dotenv();

    init_logging(DEFAULT_LOG_FILTER, LogFormat::from_env());

    let cli = Cli::parse();

    // Validate configuration up front; the worker reloads it for every run.
    let config = DirectoryConfig::from_env().unwrap_or_else(|e| {
        eprintln!("Configuration error: {e}");
        process::exit(1);
    });

    let model = load_model(&cli.seed).unwrap_or_else(|e| {
        eprintln!("Seed error: {e}");
        process::exit(1);
    });

    info!(
        enabled = config.is_active(),
        server_url = %config.server_url,
        directory_users = model.directory_users().len(),
        "Starting dirsync worker"
    );

    let repository = Arc::new(InMemoryIdentityRepository::new(model));
    let engine = Arc::new(ReconciliationEngine::new(
        Arc::new(LdapConnector::default()),
        repository,
    ));
    let loader: ConfigLoader = Arc::new(DirectoryConfig::from_env);

    let (worker, handle) = SyncWorker::channel(engine, loader, cli.queue_capacity);
    let worker_task = tokio::spawn(worker.run());

    let trigger = match cli.user {
        Some(login) => SyncTrigger::user(login),
        None => SyncTrigger::all(),
    };

    let report = handle.run(trigger).await.unwrap_or_else(|e| {
        eprintln!("Sync worker error: {e}");
        process::exit(1);
    });

    drop(handle);
    if let Err(e) = worker_task.await {
        error!(error = %e, "Sync worker task failed");
    }

    match serde_json::to_string_pretty(&report) {
        Ok(json) => println!("{json}"),
        Err(e) => {
            eprintln!("Failed to render report: {e}");
            process::exit(1);
        }
    }

    if report.status == RunStatus::Aborted {
        process::exit(2);
    }
}
