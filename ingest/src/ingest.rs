pub mod logfile;


pub use logfile::BenchmarkLog;

use crate::database::{sqlite::SchemaStore, ConnectionError, ID};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum IngestorError {
    #[error("Failed to read log file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Unexpected end of file at line {line}, expected {expected}")]
    PrematureEof { line: usize, expected: &'static str },
    #[error("Line {line}: missing {expected}")]
    MissingField { line: usize, expected: &'static str },
    #[error("Line {line}: expected {expected}, found {found:?}")]
    InvalidCount {
        line: usize,
        expected: &'static str,
        found: String,
    },
    #[error("Line {line}: expected {expected}, found {found:?}")]
    InvalidNumber {
        line: usize,
        expected: &'static str,
        found: String,
    },
    #[error("Line {line}: run has {found} fields, {expected} properties were declared")]
    FieldCount {
        line: usize,
        expected: usize,
        found: usize,
    },
    #[error("Line {line}: {found:?} is not a valid {kind}")]
    InvalidIdentifier {
        line: usize,
        kind: &'static str,
        found: String,
    },
    #[error("Failed to store log: {0}")]
    Store(#[from] ConnectionError),
    #[error("{path}: {source}")]
    File {
        path: PathBuf,
        #[source]
        source: Box<IngestorError>,
    },
}

impl IngestorError {
    fn in_file(self, path: &Path) -> Self {
        Self::File {
            path: path.to_path_buf(),
            source: Box::new(self),
        }
    }
}

/// Parse and store the given log files one after another.
///
/// Every file is committed on its own, the first failing file aborts the whole
/// ingestion. Returns the experiment ids in file order.
pub fn ingest_files<P: AsRef<Path>>(
    store: &mut SchemaStore,
    paths: &[P],
) -> Result<Vec<ID>, IngestorError> {
    let mut experiments = Vec::with_capacity(paths.len());

    for path in paths.iter().map(AsRef::as_ref) {
        info!(path = ?path, "Ingesting log file");

        let result = BenchmarkLog::read(path).and_then(|log| {
            store
                .store_log(&log.experiment, &log.planners)
                .map_err(IngestorError::from)
        });

        match result {
            Ok(id) => experiments.push(id),
            Err(error) => return Err(error.in_file(path)),
        }
    }

    info!("Ingested {} log files", experiments.len());

    Ok(experiments)
}
