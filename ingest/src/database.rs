pub mod sqlite;
pub mod util;

#[cfg(test)]
mod sqlite_test;

use std::collections::BTreeMap;
use thiserror::Error;

pub type ID = i64;

/// prefix shared by every dynamically created run table
pub const PLANNER_TABLE_PREFIX: &str = "planner_";
/// foreign key columns leading every run table, in declaration order
pub const FOREIGN_KEY_COLUMNS: [&str; 2] = ["experimentid", "plannerid"];

#[derive(Error, Debug)]
pub enum ConnectionError {
    #[error("SQLite error: {0}")]
    SQLite(#[from] rusqlite::Error),
    #[error("Table {table} already exists with properties [{found}], log declares [{expected}]")]
    SchemaMismatch {
        table: String,
        expected: String,
        found: String,
    },
    #[error("Failed to close the SQLite connection: {0}")]
    CloseFailed(#[source] rusqlite::Error),
}

#[derive(Debug, Clone, PartialEq)]
/// one execution of the benchmark harness, i.e., the header of a log file
pub struct Experiment {
    pub totaltime: f64,
    pub timelimit: f64,
    pub memorylimit: f64,
    pub hostname: String,
    pub date: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// planner identity, the settings blob is compared verbatim
pub struct Planner {
    pub name: String,
    pub settings: String,
}

impl Planner {
    pub fn table_name(&self) -> String {
        planner_table(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyColumn {
    pub name: String,
    pub sql_type: String,
}

impl PropertyColumn {
    pub fn new(name: impl Into<String>, sql_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sql_type: sql_type.into(),
        }
    }

    fn matches(&self, other: &PropertyColumn) -> bool {
        self.name.eq_ignore_ascii_case(&other.name)
            && self.sql_type.eq_ignore_ascii_case(&other.sql_type)
    }
}

/// measured values of a single run, `None` is the "no measurement" marker
pub type Run = Vec<Option<f64>>;

#[derive(Debug, Clone, PartialEq)]
/// everything a log file reports for one planner
pub struct PlannerRuns {
    pub planner: Planner,
    pub properties: Vec<PropertyColumn>,
    pub runs: Vec<Run>,
}

/// Ordered property columns per planner name.
///
/// The first file that introduces a planner name fixes the column layout of its
/// table, every later file has to declare the exact same list.
#[derive(Debug, Clone, Default)]
pub struct SchemaRegistry(BTreeMap<String, Vec<PropertyColumn>>);

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, planner: &str) -> Option<&[PropertyColumn]> {
        self.0.get(planner).map(Vec::as_slice)
    }

    pub fn insert(&mut self, planner: String, columns: Vec<PropertyColumn>) {
        self.0.insert(planner, columns);
    }

    pub fn merge(&mut self, other: SchemaRegistry) {
        self.0.extend(other.0);
    }

    pub fn contains(&self, planner: &str) -> bool {
        self.0.contains_key(planner)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// check a declared property list against the registered one
    pub fn check(&self, planner: &str, declared: &[PropertyColumn]) -> Result<(), ConnectionError> {
        match self.get(planner) {
            None => Ok(()),
            Some(registered) => {
                if registered.len() == declared.len()
                    && registered
                        .iter()
                        .zip(declared.iter())
                        .all(|(left, right)| left.matches(right))
                {
                    Ok(())
                } else {
                    Err(ConnectionError::SchemaMismatch {
                        table: planner_table(planner),
                        expected: describe_columns(declared),
                        found: describe_columns(registered),
                    })
                }
            }
        }
    }
}

pub fn planner_table(name: &str) -> String {
    format!("{PLANNER_TABLE_PREFIX}{name}")
}

fn describe_columns(columns: &[PropertyColumn]) -> String {
    columns
        .iter()
        .map(|column| format!("{} {}", column.name, column.sql_type))
        .collect::<Vec<_>>()
        .join(", ")
}

// NOTE: sqlite strips the `if not exists` clause before it stores the statement in sqlite_master,
// the exporter relies on finding plain `CREATE TABLE <name>` statements there
pub const SQL_SCHEMA: [&str; 2] = [
    "CREATE TABLE IF NOT EXISTS experiments
    (id INTEGER PRIMARY KEY AUTOINCREMENT, totaltime REAL, timelimit REAL, memorylimit REAL,
     hostname VARCHAR(1024), date DATETIME)",
    "CREATE TABLE IF NOT EXISTS planners
    (id INTEGER PRIMARY KEY AUTOINCREMENT, name VARCHAR(512) NOT NULL, settings TEXT)",
];
pub const SQL_SCHEMA_NUMBER: usize = SQL_SCHEMA.len();
