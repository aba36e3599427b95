//! Output sink trait and row types
//!
//! A sink receives the finished, ordered record set of a run and writes it
//! somewhere. Sinks only run after a successful (or cancelled) crawl, never
//! after a fatal one.

use crate::crawler::QuoteRecord;
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur during output operations
#[derive(Debug, Error)]
pub enum OutputError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for output operations
pub type OutputResult<T> = Result<T, OutputError>;

/// One finalized record as written to CSV and JSON
///
/// Author fields are `None` when the detail page could not be resolved, the
/// quote had no author link, or the page lacked that field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuoteRow {
    pub quote_text: String,
    pub author_name: String,
    pub tags: Vec<String>,
    pub author_full_name: Option<String>,
    pub author_born_date: Option<String>,
    pub author_born_location: Option<String>,
}

impl From<&QuoteRecord> for QuoteRow {
    fn from(record: &QuoteRecord) -> Self {
        let author = record.author();
        let field = |value: Option<&String>| value.filter(|v| !v.is_empty()).cloned();

        Self {
            quote_text: record.text.clone(),
            author_name: record.author_name.clone(),
            tags: record.tags.clone(),
            author_full_name: field(author.map(|a| &a.full_name)),
            author_born_date: field(author.map(|a| &a.date_of_birth)),
            author_born_location: field(author.map(|a| &a.place_of_birth)),
        }
    }
}

/// Trait for record sinks
pub trait RecordSink {
    /// Short name used in log lines
    fn name(&self) -> &'static str;

    /// Writes all rows, replacing any previous output
    fn write_rows(&self, rows: &[QuoteRow]) -> OutputResult<()>;
}
