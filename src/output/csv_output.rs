use crate::output::traits::{OutputResult, QuoteRow, RecordSink};
use crate::output::write_atomically;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;

/// UTF-8 byte order mark; lets spreadsheet tools detect the encoding
const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Writes rows as CSV with tags joined into one `", "`-separated column
#[derive(Debug, Clone)]
pub struct CsvOutput {
    path: PathBuf,
}

#[derive(Serialize)]
struct CsvRow<'a> {
    quote_text: &'a str,
    author_name: &'a str,
    tags: String,
    author_full_name: Option<&'a str>,
    author_born_date: Option<&'a str>,
    author_born_location: Option<&'a str>,
}

impl<'a> From<&'a QuoteRow> for CsvRow<'a> {
    fn from(row: &'a QuoteRow) -> Self {
        Self {
            quote_text: &row.quote_text,
            author_name: &row.author_name,
            tags: row.tags.join(", "),
            author_full_name: row.author_full_name.as_deref(),
            author_born_date: row.author_born_date.as_deref(),
            author_born_location: row.author_born_location.as_deref(),
        }
    }
}

impl CsvOutput {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSink for CsvOutput {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn write_rows(&self, rows: &[QuoteRow]) -> OutputResult<()> {
        write_atomically(&self.path, |file| {
            file.write_all(UTF8_BOM)?;

            // An explicit header keeps the file self-describing even with zero rows
            let mut writer = csv::WriterBuilder::new()
                .has_headers(false)
                .from_writer(file);
            writer.write_record([
                "quote_text",
                "author_name",
                "tags",
                "author_full_name",
                "author_born_date",
                "author_born_location",
            ])?;
            for row in rows {
                writer.serialize(CsvRow::from(row))?;
            }
            writer.flush()?;
            Ok(())
        })
    }
}
