use super::IngestorError;
use crate::database::{Experiment, Planner, PlannerRuns, PropertyColumn, Run};
use itertools::Itertools;
use once_cell::sync::Lazy;
use regex::Regex;
use std::{
    fs::File,
    io::{BufRead, BufReader},
    path::Path,
};
use tracing::{debug, info, warn};

/// separator between the fields of a run line, the last one is followed by it too
pub const FIELD_SEPARATOR: &str = "; ";

static IDENTIFIER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier regex is valid"));
static SQL_TYPE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9_(), ]*$").expect("type regex is valid"));

#[derive(Debug, Clone, PartialEq)]
/// in-memory representation of a complete benchmark log file
pub struct BenchmarkLog {
    pub experiment: Experiment,
    pub planners: Vec<PlannerRuns>,
}

impl BenchmarkLog {
    /// read and parse a log file, the handle is closed before returning
    pub fn read(path: &Path) -> Result<Self, IngestorError> {
        let file = File::open(path)?;

        Self::parse(BufReader::new(file))
    }

    #[tracing::instrument(level = "debug", skip(reader))]
    pub fn parse<R: BufRead>(reader: R) -> Result<Self, IngestorError> {
        let mut lines = LineReader::new(reader);

        let hostname = {
            let line = lines.next_line("host name")?;
            match line.split_whitespace().last() {
                Some(hostname) => hostname.to_owned(),
                None => {
                    return Err(IngestorError::MissingField {
                        line: lines.line,
                        expected: "host name",
                    })
                }
            }
        };
        let date = lines
            .next_line("date")?
            .split_whitespace()
            .skip(2)
            .join(" ");
        let planner_count = lines.count("number of planners")?;
        let timelimit = lines.number("time limit")?;
        let memorylimit = lines.number("memory limit")?;
        let totaltime = lines.number("total time")?;

        let experiment = Experiment {
            totaltime,
            timelimit,
            memorylimit,
            hostname,
            date,
        };
        debug!(experiment = ?experiment, planners = planner_count, "Parsed header");

        let planners = (0..planner_count)
            .map(|_| parse_planner(&mut lines))
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            experiment,
            planners,
        })
    }
}

fn parse_planner<R: BufRead>(lines: &mut LineReader<R>) -> Result<PlannerRuns, IngestorError> {
    let name = strip_terminator(&lines.next_line("planner name")?).to_owned();
    identifier(&name, lines.line, "planner name")?;
    info!(planner = %name, "Parsing data for {name}");

    let setting_count = lines.count("number of common settings")?;
    let mut settings = String::new();
    for _ in 0..setting_count {
        settings.push_str(&lines.next_line("common setting")?);
    }

    let property_count = lines.count("number of properties")?;
    let properties = (0..property_count)
        .map(|_| {
            let line = lines.next_line("property declaration")?;
            parse_property(&line, lines.line)
        })
        .collect::<Result<Vec<_>, _>>()?;

    let run_count = lines.count("number of runs")?;
    let runs = (0..run_count)
        .map(|_| {
            let line = lines.next_line("run")?;
            parse_run(&line, lines.line, properties.len())
        })
        .collect::<Result<Vec<_>, _>>()?;

    lines.skip_separator()?;

    debug!(
        planner = %name,
        properties = properties.len(),
        runs = runs.len(),
        "Parsed planner block"
    );

    Ok(PlannerRuns {
        planner: Planner { name, settings },
        properties,
        runs,
    })
}

/// `<name tokens...> <type>`, name tokens are joined with underscores
pub fn parse_property(line: &str, line_number: usize) -> Result<PropertyColumn, IngestorError> {
    let mut tokens = line.split_whitespace().collect_vec();

    let sql_type = match tokens.pop() {
        Some(sql_type) if !tokens.is_empty() => sql_type,
        _ => {
            return Err(IngestorError::MissingField {
                line: line_number,
                expected: "property name and type",
            })
        }
    };
    let name = tokens.join("_");

    identifier(&name, line_number, "property name")?;
    if !SQL_TYPE.is_match(sql_type) {
        return Err(IngestorError::InvalidIdentifier {
            line: line_number,
            kind: "property type",
            found: sql_type.to_owned(),
        });
    }

    Ok(PropertyColumn::new(name, sql_type))
}

/// Split a run line into its values.
///
/// The segment after the final separator is dropped, empty fields are the
/// "no measurement" marker.
pub fn parse_run(line: &str, line_number: usize, expected: usize) -> Result<Run, IngestorError> {
    let mut fields = strip_terminator(line).split(FIELD_SEPARATOR).collect_vec();

    if let Some(discarded) = fields.pop().filter(|field| !field.trim().is_empty()) {
        warn!(
            line = line_number,
            discarded = discarded,
            "Discarding field after the last separator"
        );
    }

    if fields.len() != expected {
        return Err(IngestorError::FieldCount {
            line: line_number,
            expected,
            found: fields.len(),
        });
    }

    fields
        .into_iter()
        .map(|field| match field.trim() {
            "" => Ok(None),
            value => value
                .parse::<f64>()
                .map(Some)
                .map_err(|_| IngestorError::InvalidNumber {
                    line: line_number,
                    expected: "a numeric run value",
                    found: value.to_owned(),
                }),
        })
        .collect()
}

fn identifier(name: &str, line: usize, kind: &'static str) -> Result<(), IngestorError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(IngestorError::InvalidIdentifier {
            line,
            kind,
            found: name.to_owned(),
        })
    }
}

fn strip_terminator(line: &str) -> &str {
    line.strip_suffix('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .unwrap_or(line)
}

/// line oriented reader keeping track of the current (1-based) line number
struct LineReader<R> {
    inner: R,
    line: usize,
}

impl<R: BufRead> LineReader<R> {
    fn new(inner: R) -> Self {
        Self { inner, line: 0 }
    }

    /// next raw line, including its terminator
    fn next_line(&mut self, expected: &'static str) -> Result<String, IngestorError> {
        let mut buffer = String::new();

        if self.inner.read_line(&mut buffer)? == 0 {
            return Err(IngestorError::PrematureEof {
                line: self.line + 1,
                expected,
            });
        }
        self.line += 1;

        Ok(buffer)
    }

    fn first_token(&mut self, expected: &'static str) -> Result<String, IngestorError> {
        let line = self.next_line(expected)?;

        match line.split_whitespace().next() {
            Some(token) => Ok(token.to_owned()),
            None => Err(IngestorError::MissingField {
                line: self.line,
                expected,
            }),
        }
    }

    fn count(&mut self, expected: &'static str) -> Result<usize, IngestorError> {
        let token = self.first_token(expected)?;

        token
            .parse()
            .map_err(|_| IngestorError::InvalidCount {
                line: self.line,
                expected,
                found: token,
            })
    }

    fn number(&mut self, expected: &'static str) -> Result<f64, IngestorError> {
        let token = self.first_token(expected)?;

        token
            .parse()
            .map_err(|_| IngestorError::InvalidNumber {
                line: self.line,
                expected,
                found: token,
            })
    }

    /// the blank line closing a planner block, missing at the end of the file is fine
    fn skip_separator(&mut self) -> Result<(), IngestorError> {
        let mut buffer = String::new();

        if self.inner.read_line(&mut buffer)? > 0 {
            self.line += 1;
        }

        Ok(())
    }
}
