pub mod export;
pub mod report;

pub use export::{write_mysql, ExportError};
pub use report::{write_boxplots, ReportConfig, ReportError};
