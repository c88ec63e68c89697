use once_cell::sync::Lazy;
use regex::Regex;

/// name of sqlite's autoincrement bookkeeping table
pub const SEQUENCE_TABLE: &str = "sqlite_sequence";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatementKind {
    Transaction,
    CreateTable,
    Insert,
    Delete,
    CreateIndex,
    CreateUniqueIndex,
    Other,
}

/// A single statement of a dump together with the table it belongs to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub kind: StatementKind,
    pub table: String,
    pub text: String,
}

impl Statement {
    pub fn new(kind: StatementKind, table: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            kind,
            table: table.into(),
            text: text.into(),
        }
    }

    /// statements only meaningful to sqlite itself
    pub fn is_bookkeeping(&self) -> bool {
        matches!(
            self.kind,
            StatementKind::Transaction | StatementKind::CreateUniqueIndex
        ) || self.table == SEQUENCE_TABLE
    }
}

pub type Transformer = fn(Statement) -> Statement;

/// rewrites applied to every kept statement, in this order
pub const MYSQL_TRANSFORMERS: [Transformer; 5] = [
    collapse_whitespace,
    create_table,
    insert_into,
    boolean_literals,
    auto_increment,
];

static WHITESPACE: Lazy<Regex> = Lazy::new(|| regex(r"[\n\r\t ]+"));
static CREATE_TABLE: Lazy<Regex> =
    Lazy::new(|| regex(r"CREATE TABLE (?:IF NOT EXISTS )?([a-zA-Z0-9_]*)(.*)"));
static INSERT_INTO: Lazy<Regex> = Lazy::new(|| regex(r#"INSERT INTO "([a-zA-Z0-9_]*)"(.*)"#));
static TRUE: Lazy<Regex> = Lazy::new(|| regex(r"([^'])'t'(.)"));
static FALSE: Lazy<Regex> = Lazy::new(|| regex(r"([^'])'f'(.)"));

fn regex(pattern: &str) -> Regex {
    Regex::new(pattern).expect("dialect patterns are valid")
}

/// translate a dumped statement to MySQL, `None` if it has to be dropped
pub fn to_mysql(statement: Statement) -> Option<Statement> {
    if statement.is_bookkeeping() {
        None
    } else {
        Some(
            MYSQL_TRANSFORMERS
                .iter()
                .fold(statement, |statement, transform| transform(statement)),
        )
    }
}

pub fn collapse_whitespace(mut statement: Statement) -> Statement {
    statement.text = WHITESPACE.replace_all(&statement.text, " ").into_owned();

    statement
}

/// `CREATE TABLE IF NOT EXISTS` with backtick quoting on an engine with foreign keys
pub fn create_table(mut statement: Statement) -> Statement {
    if statement.kind != StatementKind::CreateTable {
        return statement;
    }

    let rewritten = CREATE_TABLE.captures(&statement.text).map(|captures| {
        let definition = captures[2].replace('"', "`");
        let text = format!("CREATE TABLE IF NOT EXISTS {}{definition}", &captures[1]);

        format!(
            "{} ENGINE = InnoDB;",
            text.trim_end_matches(&['\n', '\t', ' ', ';'][..])
        )
    });
    if let Some(text) = rewritten {
        statement.text = text;
    }

    statement
}

/// unquote the table name, double quotes inside the values are escaped
pub fn insert_into(mut statement: Statement) -> Statement {
    if statement.kind != StatementKind::Insert {
        return statement;
    }

    let rewritten = INSERT_INTO.captures(&statement.text).map(|captures| {
        format!(
            "INSERT INTO {}{}",
            &captures[1],
            captures[2].replace('"', "\\\"")
        )
    });
    if let Some(text) = rewritten {
        statement.text = text;
    }

    statement
}

pub fn boolean_literals(mut statement: Statement) -> Statement {
    for (pattern, replacement) in [(&*TRUE, "${1}1${2}"), (&*FALSE, "${1}0${2}")] {
        // matches can't overlap, repeat until adjacent literals are replaced too
        while pattern.is_match(&statement.text) {
            statement.text = pattern.replace_all(&statement.text, replacement).into_owned();
        }
    }

    statement
}

pub fn auto_increment(mut statement: Statement) -> Statement {
    statement.text = statement.text.replace("AUTOINCREMENT", "AUTO_INCREMENT");

    statement
}
