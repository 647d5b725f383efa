//! axl-importer - CUCM directory import service

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use axl_importer::logging::init_logging;
use axl_importer::{shutdown_signal, Cli, ImporterConfig, Scheduler, SyncJob};
use axl_store::PgDirectoryStore;

#[tokio::main]
async fn main() -> ExitCode {
    let started = Instant::now();
    let cli = Cli::parse();

    let config = match ImporterConfig::from_file(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!(
                "Problem reading config file [{}]: {e}",
                cli.config.display()
            );
            return ExitCode::FAILURE;
        }
    };

    if cli.show {
        return match config.show() {
            Ok(text) => {
                println!("{text}");
                ExitCode::SUCCESS
            }
            Err(e) => {
                eprintln!("{e}");
                ExitCode::FAILURE
            }
        };
    }

    let _log_guard = init_logging(&config.log);
    info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "axl-importer starting"
    );

    let store = match PgDirectoryStore::connect(&config.store_config()).await {
        Ok(store) => Arc::new(store),
        Err(e) => {
            error!(error = %e, code = e.error_code(), "Cannot connect to database");
            return ExitCode::FAILURE;
        }
    };

    let job = SyncJob::new(Arc::new(config), Arc::clone(&store));
    let mut exit = ExitCode::SUCCESS;

    if cli.once {
        if let Err(e) = job.run_directory_sync().await {
            error!(error = %e, code = e.error_code(), "Directory sync failed");
            exit = ExitCode::FAILURE;
        }
        if let Err(e) = job.run_call_update().await {
            error!(error = %e, code = e.error_code(), "Call update failed");
            exit = ExitCode::FAILURE;
        }
    } else {
        let shutdown = CancellationToken::new();
        let scheduler = tokio::spawn(Scheduler::new(job, shutdown.clone()).run());
        shutdown_signal().await;
        shutdown.cancel();
        if let Err(e) = scheduler.await {
            error!(error = %e, "Scheduler task failed");
        }
    }

    store.close().await;
    info!(duration_ms = started.elapsed().as_millis() as u64, "axl-importer stopped");
    exit
}
