use super::{sqlite::SchemaStore, ConnectionError, Experiment, Planner, PlannerRuns, PropertyColumn};
use rusqlite::types::Value;

fn experiment() -> Experiment {
    Experiment {
        totaltime: 12.5,
        timelimit: 5.0,
        memorylimit: 1000.0,
        hostname: "bench-01".to_owned(),
        date: "2010-10-05 13:42:07".to_owned(),
    }
}

fn block(
    name: &str,
    settings: &str,
    properties: &[(&str, &str)],
    runs: Vec<Vec<Option<f64>>>,
) -> PlannerRuns {
    PlannerRuns {
        planner: Planner {
            name: name.to_owned(),
            settings: settings.to_owned(),
        },
        properties: properties
            .iter()
            .map(|(name, sql_type)| PropertyColumn::new(*name, *sql_type))
            .collect(),
        runs,
    }
}

fn rrt(settings: &str) -> PlannerRuns {
    block(
        "RRT",
        settings,
        &[("time", "REAL"), ("solved", "BOOLEAN")],
        vec![vec![Some(1.23), None], vec![Some(0.5), Some(1.0)]],
    )
}

#[test]
fn fixed_schema_is_created() {
    let store = SchemaStore::open_in_memory().unwrap();

    let mut tables = store.table_names().unwrap();
    tables.sort();

    assert_eq!(tables, vec!["experiments", "planners", "sqlite_sequence"]);
    assert!(store.planner_tables().unwrap().is_empty());
    assert!(store.registry().is_empty());
}

#[test]
fn same_log_twice_reuses_planners() {
    let mut store = SchemaStore::open_in_memory().unwrap();

    let first = store.store_log(&experiment(), &[rrt("range = 0.5\n")]).unwrap();
    let second = store.store_log(&experiment(), &[rrt("range = 0.5\n")]).unwrap();

    assert_ne!(first, second);
    assert_eq!(store.count_rows("experiments").unwrap(), 2);
    assert_eq!(store.count_rows("planners").unwrap(), 1);
    assert_eq!(store.count_rows("planner_RRT").unwrap(), 4);
}

#[test]
fn different_settings_create_new_planner() {
    let mut store = SchemaStore::open_in_memory().unwrap();

    store.store_log(&experiment(), &[rrt("range = 0.5\n")]).unwrap();
    store.store_log(&experiment(), &[rrt("range = 0.7\n")]).unwrap();

    assert_eq!(store.count_rows("planners").unwrap(), 2);
    assert_eq!(store.planner_tables().unwrap(), vec!["planner_RRT"]);
}

#[test]
fn missing_value_is_stored_as_null() {
    let mut store = SchemaStore::open_in_memory().unwrap();
    store.store_log(&experiment(), &[rrt("")]).unwrap();

    assert_eq!(
        store
            .table_columns("planner_RRT")
            .unwrap()
            .into_iter()
            .map(|column| column.name)
            .collect::<Vec<_>>(),
        vec!["experimentid", "plannerid", "time", "solved"]
    );
    assert_eq!(
        store.column_values("planner_RRT", "time").unwrap(),
        vec![Value::Real(1.23), Value::Real(0.5)]
    );
    // numeric affinity turns 1.0 into an integer
    assert_eq!(
        store.column_values("planner_RRT", "solved").unwrap(),
        vec![Value::Null, Value::Integer(1)]
    );
}

#[test]
fn runs_reference_experiment_and_planner() {
    let mut store = SchemaStore::open_in_memory().unwrap();
    let experiment_id = store.store_log(&experiment(), &[rrt("")]).unwrap();

    assert_eq!(
        store.column_values("planner_RRT", "experimentid").unwrap(),
        vec![Value::Integer(experiment_id); 2]
    );

    store
        .connection()
        .execute("delete from experiments where id = ?", [experiment_id])
        .unwrap();
    assert_eq!(store.count_rows("planner_RRT").unwrap(), 0);
}

#[test]
fn property_mismatch_fails_and_rolls_back() {
    let mut store = SchemaStore::open_in_memory().unwrap();
    store.store_log(&experiment(), &[rrt("")]).unwrap();

    let changed = block(
        "RRT",
        "",
        &[("time", "REAL"), ("cost", "REAL")],
        vec![vec![Some(1.0), Some(2.0)]],
    );
    let fresh = block("EST", "", &[("time", "REAL")], vec![vec![Some(3.0)]]);

    match store.store_log(&experiment(), &[fresh, changed]) {
        Err(ConnectionError::SchemaMismatch { table, .. }) => assert_eq!(table, "planner_RRT"),
        other => panic!("unexpected result {other:?}"),
    }

    assert_eq!(store.count_rows("experiments").unwrap(), 1);
    assert_eq!(store.count_rows("planners").unwrap(), 1);
    assert_eq!(store.count_rows("planner_RRT").unwrap(), 2);
    assert_eq!(store.planner_tables().unwrap(), vec!["planner_RRT"]);
    assert!(!store.registry().contains("EST"));
}

#[test]
fn type_names_compare_case_insensitive() {
    let mut store = SchemaStore::open_in_memory().unwrap();
    store.store_log(&experiment(), &[rrt("")]).unwrap();

    let lower = block(
        "RRT",
        "",
        &[("time", "real"), ("solved", "boolean")],
        vec![vec![Some(1.0), Some(0.0)]],
    );

    store.store_log(&experiment(), &[lower]).unwrap();
    assert_eq!(store.count_rows("planner_RRT").unwrap(), 3);
}

#[test]
fn column_names_compare_case_insensitive() {
    let mut store = SchemaStore::open_in_memory().unwrap();
    store.store_log(&experiment(), &[rrt("")]).unwrap();

    let capitalized = block(
        "RRT",
        "",
        &[("Time", "REAL"), ("SOLVED", "BOOLEAN")],
        vec![vec![Some(2.0), Some(1.0)]],
    );

    store.store_log(&experiment(), &[capitalized]).unwrap();
    assert_eq!(store.count_rows("planner_RRT").unwrap(), 3);
    assert_eq!(
        store.column_values("planner_RRT", "time").unwrap()[2],
        Value::Real(2.0)
    );
}

#[test]
fn close_failure_keeps_its_cause() {
    use std::error::Error;

    let error = ConnectionError::CloseFailed(rusqlite::Error::InvalidQuery);

    assert!(error.source().is_some());
    assert!(error.to_string().starts_with("Failed to close the SQLite connection: "));
}

#[test]
fn registry_is_restored_on_reopen() {
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("benchmark.db");

    let mut store = SchemaStore::open(&path).unwrap();
    store.store_log(&experiment(), &[rrt("")]).unwrap();
    store.close().unwrap();

    let store = SchemaStore::open_read_only(&path).unwrap();
    assert_eq!(
        store.registry().get("RRT").unwrap(),
        &[PropertyColumn::new("time", "REAL"), PropertyColumn::new("solved", "BOOLEAN")]
    );
    store.close().unwrap();
}
