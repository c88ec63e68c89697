pub mod statement;

#[cfg(test)]
mod export_test;

use itertools::Itertools;
use plannerbench_ingest::database::{util::quote_identifier, ConnectionError};
use plannerbench_ingest::SchemaStore;
use rusqlite::params;
use statement::{to_mysql, Statement, StatementKind, SEQUENCE_TABLE};
use std::{
    fs::File,
    io::{BufWriter, Write},
    path::Path,
};
use thiserror::Error;
use tracing::{debug, info};

/// fixed tables every run table references, dropped last and created first
pub const PARENT_TABLES: [&str; 2] = ["experiments", "planners"];

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to query the benchmark database: {0}")]
    Store(#[from] ConnectionError),
    #[error("Failed to write the dump: {0}")]
    Io(#[from] std::io::Error),
}

impl From<rusqlite::Error> for ExportError {
    fn from(error: rusqlite::Error) -> Self {
        ExportError::Store(ConnectionError::SQLite(error))
    }
}

/// `DROP TABLE` statements, run tables before the tables they reference
pub fn drop_statements(tables: &[String]) -> Vec<String> {
    let (parents, others): (Vec<&String>, Vec<&String>) = tables
        .iter()
        .filter(|table| !table.starts_with("sqlite"))
        .partition(|table| PARENT_TABLES.contains(&table.as_str()));

    others
        .into_iter()
        .chain(
            PARENT_TABLES
                .iter()
                .filter_map(|parent| parents.iter().copied().find(|table| table.as_str() == *parent)),
        )
        .map(|table| format!("DROP TABLE IF EXISTS `{table}`;"))
        .collect()
}

/// Dump the store the way sqlite's `.dump` does.
///
/// Parent tables come first so foreign key targets exist on replay.
pub fn dump(store: &SchemaStore) -> Result<Vec<Statement>, ExportError> {
    let connection = store.connection();
    let mut statements = vec![Statement::new(
        StatementKind::Transaction,
        "",
        "BEGIN TRANSACTION;",
    )];

    let tables = connection
        .prepare("select name, sql from sqlite_master where sql not null and type = 'table' order by name")?
        .query_map(params![], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    let ordered = tables
        .iter()
        .sorted_by_key(|(name, _)| match PARENT_TABLES.iter().position(|parent| *parent == name.as_str()) {
            Some(position) => position,
            None => PARENT_TABLES.len(),
        });

    for (table, sql) in ordered {
        if table == SEQUENCE_TABLE {
            statements.push(Statement::new(
                StatementKind::Delete,
                table,
                format!("DELETE FROM {};", quote_identifier(table)),
            ));
        } else if table.starts_with("sqlite_") {
            debug!(table = %table, "Skipping internal table");
            continue;
        } else {
            statements.push(Statement::new(
                StatementKind::CreateTable,
                table,
                format!("{sql};"),
            ));
        }

        statements.extend(insert_statements(store, table)?);
    }

    let definitions = connection
        .prepare("select name, sql from sqlite_master where sql not null and type in ('index', 'trigger', 'view') order by name")?
        .query_map(params![], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;
    for (name, sql) in definitions {
        let kind = if sql.starts_with("CREATE UNIQUE INDEX") {
            StatementKind::CreateUniqueIndex
        } else if sql.starts_with("CREATE INDEX") {
            StatementKind::CreateIndex
        } else {
            StatementKind::Other
        };

        statements.push(Statement::new(kind, name, format!("{sql};")));
    }

    statements.push(Statement::new(StatementKind::Transaction, "", "COMMIT;"));

    Ok(statements)
}

/// one `INSERT INTO "<table>" VALUES(...)` per row, values rendered by sqlite's quote()
fn insert_statements(store: &SchemaStore, table: &str) -> Result<Vec<Statement>, ExportError> {
    let columns = store.table_columns(table)?;
    let selection = columns
        .iter()
        .map(|column| format!("quote({})", quote_identifier(&column.name)))
        .join(", ");
    let quoted = quote_identifier(table);

    let statements = store
        .connection()
        .prepare(&format!("select {selection} from {quoted}"))?
        .query_map(params![], |row| {
            (0..columns.len())
                .map(|index| row.get::<_, String>(index))
                .collect::<Result<Vec<_>, _>>()
        })?
        .map(|values| {
            values.map(|values| {
                Statement::new(
                    StatementKind::Insert,
                    table,
                    format!("INSERT INTO {quoted} VALUES({});", values.join(",")),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(statements)
}

/// complete MySQL script, one statement per entry
pub fn mysql_script(store: &SchemaStore) -> Result<Vec<String>, ExportError> {
    let mut script = drop_statements(&store.table_names()?);
    let mut dropped = 0;

    for statement in dump(store)? {
        match to_mysql(statement) {
            Some(statement) => script.push(statement.text),
            None => dropped += 1,
        }
    }

    debug!("Dropped {dropped} sqlite specific statements");

    Ok(script)
}

/// Write the store as a MySQL dump, returns the number of statements written.
pub fn write_mysql(store: &SchemaStore, path: &Path) -> Result<usize, ExportError> {
    let script = mysql_script(store)?;
    let mut writer = BufWriter::new(File::create(path)?);

    for line in script.iter() {
        writeln!(writer, "{line}")?;
    }
    writer.flush()?;

    info!(path = ?path, statements = script.len(), "Wrote MySQL dump");

    Ok(script.len())
}
