use crate::output::traits::{OutputResult, QuoteRow, RecordSink};
use crate::output::write_atomically;
use std::io::Write;
use std::path::PathBuf;

/// Writes rows as a pretty-printed JSON array, tags kept as a list
#[derive(Debug, Clone)]
pub struct JsonOutput {
    path: PathBuf,
}

impl JsonOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSink for JsonOutput {
    fn name(&self) -> &'static str {
        "json"
    }

    fn write_rows(&self, rows: &[QuoteRow]) -> OutputResult<()> {
        write_atomically(&self.path, |file| {
            serde_json::to_writer_pretty(&mut *file, rows)?;
            file.write_all(b"\n")?;
            Ok(())
        })
    }
}
