use super::{
    drop_statements, dump, mysql_script,
    statement::{
        auto_increment, boolean_literals, collapse_whitespace, create_table, insert_into, to_mysql,
        Statement, StatementKind,
    },
    write_mysql,
};
use plannerbench_ingest::database::{Experiment, Planner, PlannerRuns, PropertyColumn};
use plannerbench_ingest::SchemaStore;
use rusqlite::Connection;

fn store() -> SchemaStore {
    let mut store = SchemaStore::open_in_memory().unwrap();
    let experiment = Experiment {
        totaltime: 12.5,
        timelimit: 5.0,
        memorylimit: 1000.0,
        hostname: "bench01".to_owned(),
        date: "2012-03-04 05:06:07".to_owned(),
    };
    let planners = [
        PlannerRuns {
            planner: Planner {
                name: "geometric_RRT".to_owned(),
                settings: "range = 0.5".to_owned(),
            },
            properties: vec![
                PropertyColumn::new("solved", "BOOLEAN"),
                PropertyColumn::new("time", "REAL"),
            ],
            runs: vec![vec![Some(1.0), Some(0.25)], vec![Some(0.0), None]],
        },
        PlannerRuns {
            planner: Planner {
                name: "geometric_KPIECE1".to_owned(),
                settings: String::new(),
            },
            properties: vec![PropertyColumn::new("time", "REAL")],
            runs: vec![vec![Some(1.5)]],
        },
    ];
    store.store_log(&experiment, &planners).unwrap();

    store
}

#[test]
fn run_tables_are_dropped_before_parents() {
    let tables = [
        "experiments",
        "sqlite_sequence",
        "planners",
        "planner_geometric_RRT",
        "planner_geometric_KPIECE1",
    ]
    .map(str::to_owned);

    assert_eq!(
        drop_statements(&tables),
        vec![
            "DROP TABLE IF EXISTS `planner_geometric_RRT`;",
            "DROP TABLE IF EXISTS `planner_geometric_KPIECE1`;",
            "DROP TABLE IF EXISTS `experiments`;",
            "DROP TABLE IF EXISTS `planners`;",
        ]
    );
}

#[test]
fn whitespace_runs_collapse() {
    let statement = Statement::new(StatementKind::Other, "", "CREATE VIEW v\n\tAS  SELECT 1;");

    assert_eq!(
        collapse_whitespace(statement).text,
        "CREATE VIEW v AS SELECT 1;"
    );
}

#[test]
fn create_table_gains_engine_and_backticks() {
    let statement = Statement::new(
        StatementKind::CreateTable,
        "planner_x",
        r#"CREATE TABLE "planner_x" ("time" REAL);"#,
    );

    assert_eq!(
        create_table(statement).text,
        "CREATE TABLE IF NOT EXISTS `planner_x` (`time` REAL) ENGINE = InnoDB;"
    );

    let plain = Statement::new(
        StatementKind::CreateTable,
        "experiments",
        "CREATE TABLE experiments (id INTEGER);",
    );
    assert_eq!(
        create_table(plain).text,
        "CREATE TABLE IF NOT EXISTS experiments (id INTEGER) ENGINE = InnoDB;"
    );
}

#[test]
fn insert_loses_table_quotes() {
    let statement = Statement::new(
        StatementKind::Insert,
        "planners",
        r#"INSERT INTO "planners" VALUES(1,'say "hi"',NULL);"#,
    );

    assert_eq!(
        insert_into(statement).text,
        r#"INSERT INTO planners VALUES(1,'say \"hi\"',NULL);"#
    );
}

#[test]
fn rewrites_only_touch_their_statement_kind() {
    let text = r#"INSERT INTO "planners" VALUES(1);"#;
    let statement = Statement::new(StatementKind::Other, "planners", text);

    assert_eq!(create_table(statement.clone()).text, text);
    assert_eq!(insert_into(statement).text, text);
}

#[test]
fn boolean_literals_become_numbers() {
    let statement = Statement::new(
        StatementKind::Insert,
        "t",
        "INSERT INTO t VALUES('t','f','t',1);",
    );

    assert_eq!(
        boolean_literals(statement).text,
        "INSERT INTO t VALUES(1,0,1,1);"
    );

    let quoted = Statement::new(StatementKind::Insert, "t", "INSERT INTO t VALUES('''t''');");
    assert_eq!(
        boolean_literals(quoted).text,
        "INSERT INTO t VALUES('''t''');"
    );
}

#[test]
fn autoincrement_keyword_is_renamed() {
    let statement = Statement::new(
        StatementKind::CreateTable,
        "experiments",
        "CREATE TABLE experiments (id INTEGER PRIMARY KEY AUTOINCREMENT)",
    );

    assert_eq!(
        auto_increment(statement).text,
        "CREATE TABLE experiments (id INTEGER PRIMARY KEY AUTO_INCREMENT)"
    );
}

#[test]
fn bookkeeping_is_dropped() {
    let dropped = [
        Statement::new(StatementKind::Transaction, "", "BEGIN TRANSACTION;"),
        Statement::new(StatementKind::Transaction, "", "COMMIT;"),
        Statement::new(
            StatementKind::Delete,
            "sqlite_sequence",
            r#"DELETE FROM "sqlite_sequence";"#,
        ),
        Statement::new(
            StatementKind::Insert,
            "sqlite_sequence",
            r#"INSERT INTO "sqlite_sequence" VALUES('planners',2);"#,
        ),
        Statement::new(
            StatementKind::CreateUniqueIndex,
            "names",
            "CREATE UNIQUE INDEX names ON planners(name);",
        ),
    ];

    for statement in dropped {
        assert_eq!(to_mysql(statement), None);
    }

    let index = Statement::new(
        StatementKind::CreateIndex,
        "names",
        "CREATE INDEX names ON planners(name);",
    );
    assert!(to_mysql(index).is_some());
}

#[test]
fn dump_lists_parents_first() {
    let statements = dump(&store()).unwrap();
    let created = statements
        .iter()
        .filter(|statement| statement.kind == StatementKind::CreateTable)
        .map(|statement| statement.table.as_str())
        .collect::<Vec<_>>();

    assert_eq!(statements[0].text, "BEGIN TRANSACTION;");
    assert_eq!(statements.last().unwrap().text, "COMMIT;");
    assert_eq!(
        created,
        vec![
            "experiments",
            "planners",
            "planner_geometric_KPIECE1",
            "planner_geometric_RRT"
        ]
    );
    assert!(statements
        .iter()
        .any(|statement| statement.text == r#"DELETE FROM "sqlite_sequence";"#));
}

#[test]
fn script_has_no_sqlite_leftovers() {
    let script = mysql_script(&store()).unwrap();

    assert!(script[0].starts_with("DROP TABLE IF EXISTS"));
    assert!(script.iter().all(|line| !line.contains("sqlite_sequence")));
    assert!(script.iter().all(|line| !line.contains("TRANSACTION")));
    assert!(script.iter().all(|line| !line.contains('\n')));
    assert!(script
        .iter()
        .any(|line| line.starts_with("CREATE TABLE IF NOT EXISTS experiments")
            && line.contains("AUTO_INCREMENT")
            && line.ends_with(" ENGINE = InnoDB;")));
    assert!(script
        .iter()
        .any(|line| line.starts_with("INSERT INTO planners VALUES(")));
}

#[test]
fn replayed_script_reproduces_tables() {
    let store = store();
    let directory = tempfile::tempdir().unwrap();
    let path = directory.path().join("dump.sql");

    let written = write_mysql(&store, &path).unwrap();
    let script = std::fs::read_to_string(&path).unwrap();
    assert_eq!(script.lines().count(), written);

    // undo the engine specific parts so sqlite accepts the script again
    let replay = Connection::open_in_memory().unwrap();
    for line in script.lines() {
        let line = line
            .replace(" ENGINE = InnoDB", "")
            .replace("AUTO_INCREMENT", "AUTOINCREMENT");
        replay.execute_batch(&line).unwrap();
    }

    let mut tables = store
        .table_names()
        .unwrap()
        .into_iter()
        .filter(|table| !table.starts_with("sqlite"))
        .collect::<Vec<_>>();
    tables.sort();

    let mut replayed = replay
        .prepare("select name from sqlite_master where type = 'table' and name not like 'sqlite%'")
        .unwrap()
        .query_map([], |row| row.get::<_, String>(0))
        .unwrap()
        .collect::<Result<Vec<_>, _>>()
        .unwrap();
    replayed.sort();

    assert_eq!(tables, replayed);
    for table in tables {
        let count: i64 = replay
            .query_row(&format!("select count(*) from `{table}`"), [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, store.count_rows(&table).unwrap(), "{table}");
    }
}
