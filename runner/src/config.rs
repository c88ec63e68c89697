use clap::{ArgAction, Parser};
use plannerbench_analysis::ReportConfig;
use serde::{Deserialize, Serialize};
use std::{
    fs::File,
    path::{Path, PathBuf},
};
use thiserror::Error;
use tracing::{error, warn};

#[derive(Error, Debug)]
pub enum ConfigErrors {
    #[error("Config file could not be read: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config file is not valid: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Preflight checks failed, see the log for details")]
    PreflightFailed,
}

/// Ingest motion planner benchmark logs, plot them and export the store
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "plannerbench", version, about, long_about = None)]
pub struct Cli {
    /// Benchmark database to fill and read from [default: benchmark.db]
    #[arg(short, long, value_name = "PATH")]
    pub database: Option<PathBuf>,

    /// Write box plots of every attribute to this PDF
    #[arg(short, long, value_name = "PATH")]
    pub boxplot: Option<PathBuf>,

    /// Write a MySQL dump of the database to this file
    #[arg(short, long, value_name = "PATH")]
    pub mysql: Option<PathBuf>,

    /// YAML config file
    #[arg(short, long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Raise the log level, can be repeated
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Benchmark logs to ingest
    #[arg(value_name = "LOGFILE")]
    pub logs: Vec<PathBuf>,
}

#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    #[serde(default, alias = "db")]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub report: ReportSettings,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_path")]
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_database_path(),
        }
    }
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ReportSettings {
    #[serde(default = "default_whisker")]
    pub whisker: f64,
    #[serde(default = "default_page_width")]
    pub page_width: f64,
    #[serde(default = "default_page_height")]
    pub page_height: f64,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            whisker: default_whisker(),
            page_width: default_page_width(),
            page_height: default_page_height(),
        }
    }
}

impl From<&ReportSettings> for ReportConfig {
    fn from(settings: &ReportSettings) -> Self {
        Self {
            whisker: settings.whisker,
            page_width: settings.page_width,
            page_height: settings.page_height,
        }
    }
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigErrors> {
        Ok(serde_yaml::from_reader(File::open(path)?)?)
    }
}

/// Everything a run needs, config file values overridden by the command line
#[derive(Clone, Debug, PartialEq)]
pub struct Settings {
    pub database: PathBuf,
    pub boxplot: Option<PathBuf>,
    pub mysql: Option<PathBuf>,
    pub report: ReportConfig,
    pub logs: Vec<PathBuf>,
}

impl Settings {
    pub fn from_cli(cli: Cli) -> Result<Self, ConfigErrors> {
        let file = match cli.config {
            Some(ref path) => FileConfig::load(path)?,
            None => FileConfig::default(),
        };

        Ok(Self::merge(cli, file))
    }

    pub fn merge(cli: Cli, file: FileConfig) -> Self {
        Self {
            database: cli.database.unwrap_or(file.database.path),
            boxplot: cli.boxplot,
            mysql: cli.mysql,
            report: ReportConfig::from(&file.report),
            logs: cli.logs,
        }
    }

    pub fn preflight_checks(&self) -> Result<(), ConfigErrors> {
        // log all problems before failing
        let mut contains_error = false;

        for log in self.logs.iter() {
            if !log.is_file() {
                error!(
                    "Log file {} does not exist or is not a file",
                    log.to_string_lossy()
                );
                contains_error = true;
            }
        }

        if !is_positive(self.report.whisker) {
            error!(
                "report.whisker must be positive, got {}",
                self.report.whisker
            );
            contains_error = true;
        }

        for (name, value) in [
            ("page_width", self.report.page_width),
            ("page_height", self.report.page_height),
        ] {
            if !is_positive(value) {
                error!("report.{name} must be positive, got {value}");
                contains_error = true;
            }
        }

        if self.logs.is_empty() && self.boxplot.is_none() && self.mysql.is_none() {
            warn!("Neither log files nor outputs were given, nothing to do");
        }

        if contains_error {
            Err(ConfigErrors::PreflightFailed)
        } else {
            Ok(())
        }
    }
}

/// false for NaN as well
fn is_positive(value: f64) -> bool {
    value > 0.0
}

fn default_database_path() -> PathBuf {
    PathBuf::from("benchmark.db")
}

fn default_whisker() -> f64 {
    ReportConfig::default().whisker
}

fn default_page_width() -> f64 {
    ReportConfig::default().page_width
}

fn default_page_height() -> f64 {
    ReportConfig::default().page_height
}
