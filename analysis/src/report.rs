pub mod pdf;
pub mod stats;

#[cfg(test)]
mod stats_test;

use plannerbench_ingest::database::{ConnectionError, FOREIGN_KEY_COLUMNS, PLANNER_TABLE_PREFIX};
use plannerbench_ingest::SchemaStore;
use rusqlite::types::Value;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info};

#[derive(Error, Debug)]
pub enum ReportError {
    #[error("Failed to query the benchmark database: {0}")]
    Store(#[from] ConnectionError),
    #[error("The benchmark database does not contain any planner tables")]
    NoPlannerTables,
    #[error("Failed to write the report: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to render the report: {0}")]
    Pdf(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// whiskers reach the most extreme sample within `whisker` * IQR of the box
    pub whisker: f64,
    /// page size in millimeters
    pub page_width: f64,
    pub page_height: f64,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            whisker: 1.5,
            page_width: 297.0,
            page_height: 210.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannerTable {
    pub name: String,
    pub columns: Vec<String>,
}

impl PlannerTable {
    /// planner name as shown on the x axis
    pub fn label(&self) -> &str {
        self.name
            .strip_prefix(PLANNER_TABLE_PREFIX)
            .unwrap_or(&self.name)
    }
}

#[derive(Debug, Clone, PartialEq)]
/// measurements of one attribute for one planner
pub struct Series {
    pub label: String,
    pub samples: Vec<f64>,
    pub missing: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AttributePage {
    pub attribute: String,
    pub series: Vec<Series>,
}

impl AttributePage {
    pub fn has_missing(&self) -> bool {
        self.series.iter().any(|series| series.missing > 0)
    }

    /// Marker counts drawn above the boxes.
    ///
    /// Either every box is annotated (`0` included) or none is, depending on
    /// whether any planner lacks a measurement for this attribute.
    pub fn annotations(&self) -> Option<Vec<String>> {
        if self.has_missing() {
            Some(
                self.series
                    .iter()
                    .map(|series| series.missing.to_string())
                    .collect(),
            )
        } else {
            None
        }
    }

    pub fn axis_label(&self) -> String {
        self.attribute.replace('_', " ")
    }
}

/// all run tables with their column names, in creation order
pub fn discover_tables(store: &SchemaStore) -> Result<Vec<PlannerTable>, ReportError> {
    store
        .planner_tables()?
        .into_iter()
        .map(|name| {
            let columns = store
                .table_columns(&name)?
                .into_iter()
                .map(|column| column.name)
                .collect();

            Ok(PlannerTable { name, columns })
        })
        .collect()
}

/// attributes of the first discovered table, sorted by name
pub fn attributes(tables: &[PlannerTable]) -> Result<Vec<String>, ReportError> {
    let first = tables.first().ok_or(ReportError::NoPlannerTables)?;
    let mut attributes = first
        .columns
        .iter()
        .filter(|column| !FOREIGN_KEY_COLUMNS.contains(&column.as_str()))
        .cloned()
        .collect::<Vec<_>>();
    attributes.sort();

    Ok(attributes)
}

/// gather samples of `attribute` from every table that defines it
pub fn attribute_page(
    store: &SchemaStore,
    tables: &[PlannerTable],
    attribute: &str,
) -> Result<AttributePage, ReportError> {
    let mut series = Vec::new();

    for table in tables
        .iter()
        .filter(|table| table.columns.iter().any(|column| column == attribute))
    {
        let mut samples = Vec::new();
        let mut missing = 0;

        for value in store.column_values(&table.name, attribute)? {
            match value {
                Value::Null => missing += 1,
                Value::Integer(value) => samples.push(value as f64),
                Value::Real(value) => samples.push(value),
                Value::Text(text) => match text.trim().parse::<f64>() {
                    Ok(value) => samples.push(value),
                    Err(_) => debug!(table = %table.name, attribute, text = %text, "Skipping non-numeric value"),
                },
                Value::Blob(_) => debug!(table = %table.name, attribute, "Skipping blob value"),
            }
        }

        series.push(Series {
            label: table.label().to_owned(),
            samples,
            missing,
        });
    }

    Ok(AttributePage {
        attribute: attribute.to_owned(),
        series,
    })
}

pub fn collect_pages(store: &SchemaStore) -> Result<Vec<AttributePage>, ReportError> {
    let tables = discover_tables(store)?;

    attributes(&tables)?
        .iter()
        .map(|attribute| attribute_page(store, &tables, attribute))
        .collect()
}

/// Render one box plot page per attribute into a single PDF document.
///
/// Returns the number of pages written.
pub fn write_boxplots(
    store: &SchemaStore,
    path: &Path,
    config: &ReportConfig,
) -> Result<usize, ReportError> {
    let pages = collect_pages(store)?;

    for page in pages.iter() {
        info!(
            attribute = %page.attribute,
            planners = page.series.len(),
            "Plotting attribute"
        );
    }

    pdf::render(&pages, path, config)?;
    info!(path = ?path, pages = pages.len(), "Wrote box plots");

    Ok(pages.len())
}
