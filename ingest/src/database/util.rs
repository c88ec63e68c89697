use super::{PropertyColumn, SchemaRegistry, FOREIGN_KEY_COLUMNS, PLANNER_TABLE_PREFIX};
use rusqlite::{params, Connection};

/// quote an identifier for use in a statement, doubling embedded quotes
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// names of all tables in creation order, including sqlite internals
pub fn table_names(connection: &Connection) -> Result<Vec<String>, rusqlite::Error> {
    connection
        .prepare_cached("select name from sqlite_master where type = 'table' order by rowid")?
        .query_map(params![], |row| row.get(0))?
        .collect()
}

/// dynamic run tables in creation order
pub fn planner_tables(connection: &Connection) -> Result<Vec<String>, rusqlite::Error> {
    Ok(table_names(connection)?
        .into_iter()
        .filter(|name| name.starts_with(PLANNER_TABLE_PREFIX))
        .collect())
}

/// (name, declared type) of every column of `table` in declaration order
pub fn table_columns(
    connection: &Connection,
    table: &str,
) -> Result<Vec<PropertyColumn>, rusqlite::Error> {
    connection
        .prepare(&format!("pragma table_info({})", quote_identifier(table)))?
        .query_map(params![], |row| {
            Ok(PropertyColumn {
                name: row.get(1)?,
                sql_type: row.get(2)?,
            })
        })?
        .collect()
}

/// rebuild the schema registry from the run tables already present in the store
pub fn retrieve_registry(connection: &Connection) -> Result<SchemaRegistry, rusqlite::Error> {
    planner_tables(connection)?
        .into_iter()
        .try_fold(SchemaRegistry::new(), |mut registry, table| {
            let columns = table_columns(connection, &table)?
                .into_iter()
                .filter(|column| !FOREIGN_KEY_COLUMNS.contains(&column.name.as_str()))
                .collect();
            let planner = table[PLANNER_TABLE_PREFIX.len()..].to_owned();
            registry.insert(planner, columns);

            Ok(registry)
        })
}
