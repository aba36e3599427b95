//! Output module for writing crawl results
//!
//! This module handles:
//! - Converting records into output rows
//! - Writing CSV and JSON files without leaving partial files behind
//! - Recording and printing run statistics

mod csv_output;
mod json_output;
pub mod stats;
mod traits;

pub use csv_output::CsvOutput;
pub use json_output::JsonOutput;
pub use stats::{print_statistics, CrawlStatistics};
pub use traits::{OutputError, OutputResult, QuoteRow, RecordSink};

use crate::config::OutputConfig;
use crate::crawler::CrawlReport;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Writes the report's records to every configured sink
///
/// # Arguments
///
/// * `report` - The finished run
/// * `config` - Output paths
///
/// # Returns
///
/// * `Ok(usize)` - Number of rows written to each sink
/// * `Err(OutputError)` - A sink failed; files already renamed into place stay
pub fn write_report(report: &CrawlReport, config: &OutputConfig) -> OutputResult<usize> {
    let rows: Vec<QuoteRow> = report.records.iter().map(QuoteRow::from).collect();

    let sinks: [Box<dyn RecordSink>; 2] = [
        Box::new(CsvOutput::new(&config.csv_path)),
        Box::new(JsonOutput::new(&config.json_path)),
    ];

    for sink in &sinks {
        sink.write_rows(&rows)?;
        tracing::info!(sink = sink.name(), rows = rows.len(), "Output written");
    }

    Ok(rows.len())
}

/// Writes a file through a sibling temp file and renames it into place
///
/// A failure part-way leaves the destination untouched.
pub(crate) fn write_atomically<F>(path: &Path, write: F) -> OutputResult<()>
where
    F: FnOnce(&mut File) -> OutputResult<()>,
{
    let tmp = temp_path(path);

    let result = File::create(&tmp)
        .map_err(OutputError::from)
        .and_then(|mut file| {
            write(&mut file)?;
            file.sync_all()?;
            Ok(())
        });

    match result {
        Ok(()) => {
            std::fs::rename(&tmp, path)?;
            Ok(())
        }
        Err(e) => {
            let _ = std::fs::remove_file(&tmp);
            Err(e)
        }
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
