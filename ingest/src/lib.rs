pub mod database;
pub mod ingest;

pub use database::{sqlite::SchemaStore, ConnectionError};
pub use ingest::{ingest_files, BenchmarkLog, IngestorError};
