mod config;


use clap::Parser;
use config::{Cli, ConfigErrors, Settings};
use plannerbench_analysis::{write_boxplots, write_mysql, ExportError, ReportError};
use plannerbench_ingest::{ingest_files, ConnectionError, IngestorError, SchemaStore};
use std::process::ExitCode;
use thiserror::Error;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error(transparent)]
    Config(#[from] ConfigErrors),
    #[error(transparent)]
    Store(#[from] ConnectionError),
    #[error(transparent)]
    Ingest(#[from] IngestorError),
    #[error(transparent)]
    Report(#[from] ReportError),
    #[error(transparent)]
    Export(#[from] ExportError),
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// `RUST_LOG` wins over the verbosity flags
fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .try_init();
}

fn run(cli: Cli) -> Result<(), RunnerError> {
    let settings = Settings::from_cli(cli)?;
    settings.preflight_checks()?;

    info!(database = ?settings.database, logs = settings.logs.len(), "Opening benchmark database");

    let mut store = SchemaStore::open(&settings.database)?;
    if settings.logs.is_empty() {
        info!("No log files given, skipping ingestion");
    } else {
        ingest_files(&mut store, &settings.logs)?;
    }
    store.close()?;

    if let Some(ref path) = settings.boxplot {
        let store = SchemaStore::open_read_only(&settings.database)?;
        write_boxplots(&store, path, &settings.report)?;
    }

    if let Some(ref path) = settings.mysql {
        let store = SchemaStore::open_read_only(&settings.database)?;
        write_mysql(&store, path)?;
    }

    Ok(())
}
