use super::{
    planner_table,
    util::{self, quote_identifier},
    ConnectionError, Experiment, Planner, PlannerRuns, PropertyColumn, SchemaRegistry, ID,
    FOREIGN_KEY_COLUMNS, SQL_SCHEMA, SQL_SCHEMA_NUMBER,
};
use itertools::Itertools;
use rusqlite::{params, params_from_iter, types::Value, Connection, OpenFlags};
use std::path::Path;
use tracing::{debug, error, info};

#[derive(Debug)]
/// Owner of the SQLite connection backing the benchmark database
pub struct SchemaStore {
    connection: Connection,
    registry: SchemaRegistry,
}

impl SchemaStore {
    /// open (or create) a writable store and apply the fixed schema
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ConnectionError> {
        let connection = Connection::open(path.as_ref())?;
        info!(path = ?path.as_ref(), "Opened SQLite database");

        Self::init(connection)
    }

    pub fn open_in_memory() -> Result<Self, ConnectionError> {
        Self::init(Connection::open_in_memory()?)
    }

    /// open an existing store without write access, the fixed schema is not applied
    pub fn open_read_only(path: impl AsRef<Path>) -> Result<Self, ConnectionError> {
        let connection = Connection::open_with_flags(
            path.as_ref(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        let registry = util::retrieve_registry(&connection)?;
        info!(path = ?path.as_ref(), tables = registry.len(), "Opened SQLite database read-only");

        Ok(Self {
            connection,
            registry,
        })
    }

    fn init(connection: Connection) -> Result<Self, ConnectionError> {
        connection.pragma_update(None, "foreign_keys", "ON")?;

        for (counter, table) in SQL_SCHEMA.iter().enumerate() {
            let counter = counter + 1;

            match connection.execute(table, []) {
                Ok(_) => debug!("Applied SQL schema ({counter}/{SQL_SCHEMA_NUMBER})"),
                Err(error) => {
                    error!(error = ?error, table = table, "Failed to apply SQL schema ({counter}/{SQL_SCHEMA_NUMBER}): {error}");

                    return Err(ConnectionError::SQLite(error));
                }
            };
        }

        let registry = util::retrieve_registry(&connection)?;

        Ok(Self {
            connection,
            registry,
        })
    }

    pub fn connection(&self) -> &Connection {
        &self.connection
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn close(mut self) -> Result<(), ConnectionError> {
        let mut counter = 0;
        while let Err((connection, error)) = self.connection.close() {
            counter += 1;
            self.connection = connection;
            error!(error = ?error, "Failed to close SQLite connection: {error}, trying again {counter}/3");

            if counter == 3 {
                error!("Failed to close connection, giving up");

                return Err(ConnectionError::CloseFailed(error));
            }
        }

        info!("Closed SQLite connection");

        Ok(())
    }

    /// Store one parsed log file inside a single transaction.
    ///
    /// Returns the id of the new experiment. Nothing of the file is kept if any
    /// planner block fails, the registry only learns about new tables after commit.
    pub fn store_log(
        &mut self,
        experiment: &Experiment,
        planners: &[PlannerRuns],
    ) -> Result<ID, ConnectionError> {
        let mut tx = self.connection.transaction()?;
        tx.set_drop_behavior(rusqlite::DropBehavior::Rollback);

        let experiment_id = insert_experiment(&tx, experiment)?;
        let mut created = SchemaRegistry::new();
        let mut counter = 0;

        for block in planners {
            let planner_id = find_or_create_planner(&tx, &block.planner)?;

            let name = block.planner.name.as_str();
            self.registry.check(name, &block.properties)?;
            created.check(name, &block.properties)?;
            if !self.registry.contains(name) && !created.contains(name) {
                create_planner_table(&tx, &block.planner, &block.properties)?;
                created.insert(name.to_owned(), block.properties.clone());
            }

            counter += insert_runs(&tx, experiment_id, planner_id, block)?;
        }

        tx.commit()?;

        info!(
            experiment = experiment_id,
            tables = created.len(),
            "Stored {counter} runs"
        );
        self.registry.merge(created);

        Ok(experiment_id)
    }

    pub fn planner_tables(&self) -> Result<Vec<String>, ConnectionError> {
        Ok(util::planner_tables(&self.connection)?)
    }

    pub fn table_names(&self) -> Result<Vec<String>, ConnectionError> {
        Ok(util::table_names(&self.connection)?)
    }

    pub fn table_columns(&self, table: &str) -> Result<Vec<PropertyColumn>, ConnectionError> {
        Ok(util::table_columns(&self.connection, table)?)
    }

    /// raw values of a single column, in rowid order
    pub fn column_values(&self, table: &str, column: &str) -> Result<Vec<Value>, ConnectionError> {
        let values = self
            .connection
            .prepare(&format!(
                "select {} from {} order by rowid",
                quote_identifier(column),
                quote_identifier(table)
            ))?
            .query_map(params![], |row| row.get(0))?
            .collect::<Result<Vec<Value>, _>>()?;

        Ok(values)
    }

    pub fn count_rows(&self, table: &str) -> Result<i64, ConnectionError> {
        Ok(self.connection.query_row(
            &format!("select count(*) from {}", quote_identifier(table)),
            params![],
            |row| row.get(0),
        )?)
    }
}

fn insert_experiment(connection: &Connection, experiment: &Experiment) -> Result<ID, ConnectionError> {
    let id: ID = connection
        .prepare_cached(
            "insert into experiments
             (totaltime, timelimit, memorylimit, hostname, date)
             values (?, ?, ?, ?, ?) returning id",
        )?
        .query_row(
            params![
                experiment.totaltime,
                experiment.timelimit,
                experiment.memorylimit,
                experiment.hostname,
                experiment.date
            ],
            |row| row.get(0),
        )?;

    debug!(id = id, host = %experiment.hostname, "Created experiment entry");

    Ok(id)
}

fn find_or_create_planner(connection: &Connection, planner: &Planner) -> Result<ID, ConnectionError> {
    let candidates = connection
        .prepare_cached("select id, settings from planners where name = ?")?
        .query_map(params![planner.name], |row| {
            Ok((row.get(0)?, row.get::<_, Option<String>>(1)?))
        })?
        .try_fold(Vec::new(), |mut init, result| {
            init.push(result?);

            Ok::<Vec<(ID, Option<String>)>, ConnectionError>(init)
        })?;

    for (id, settings) in candidates {
        if settings.as_deref().unwrap_or("") == planner.settings {
            debug!(name = %planner.name, id = %id, "Was able to reuse existing planner entry");

            return Ok(id);
        }
    }

    let id: ID = connection
        .prepare_cached("insert into planners (name, settings) values (?, ?) returning id")?
        .query_row(params![planner.name, planner.settings], |row| row.get(0))?;

    debug!(name = %planner.name, id = %id, "Created planner entry");

    Ok(id)
}

fn create_planner_table(
    connection: &Connection,
    planner: &Planner,
    properties: &[PropertyColumn],
) -> Result<(), ConnectionError> {
    let table = planner.table_name();
    let columns = FOREIGN_KEY_COLUMNS
        .iter()
        .map(|column| format!("{column} INTEGER"))
        .chain(
            properties
                .iter()
                .map(|property| format!("{} {}", property.name, property.sql_type)),
        )
        .join(", ");
    let statement = format!(
        "CREATE TABLE {table} ({columns}, \
         FOREIGN KEY(experimentid) REFERENCES experiments(id) ON DELETE CASCADE, \
         FOREIGN KEY(plannerid) REFERENCES planners(id) ON DELETE CASCADE)"
    );

    debug!(statement = %statement, "Creating run table");
    connection.execute(&statement, [])?;
    debug!(table = %table, properties = properties.len(), "Created run table");

    Ok(())
}

fn insert_runs(
    connection: &Connection,
    experiment: ID,
    planner: ID,
    block: &PlannerRuns,
) -> Result<usize, ConnectionError> {
    let columns = FOREIGN_KEY_COLUMNS
        .iter()
        .copied()
        .chain(block.properties.iter().map(|property| property.name.as_str()))
        .join(", ");
    let placeholders = std::iter::repeat("?")
        .take(block.properties.len() + FOREIGN_KEY_COLUMNS.len())
        .join(", ");
    let mut statement = connection.prepare(&format!(
        "insert into {} ({columns}) values ({placeholders})",
        planner_table(&block.planner.name)
    ))?;

    for run in block.runs.iter() {
        let values = [Value::Integer(experiment), Value::Integer(planner)]
            .into_iter()
            .chain(run.iter().map(|value| match value {
                Some(value) => Value::Real(*value),
                None => Value::Null,
            }));

        statement.execute(params_from_iter(values))?;
    }

    debug!(planner = %block.planner.name, runs = block.runs.len(), "Inserted runs");

    Ok(block.runs.len())
}
