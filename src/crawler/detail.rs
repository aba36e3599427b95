//! Author detail page parser

use crate::crawler::fetcher::RawPage;
use crate::crawler::parser::first_text;
use crate::ParseError;
use scraper::{Html, Selector};
use serde::Serialize;

const FULL_NAME: &str = "h3.author-title";
const BORN_DATE: &str = "span.author-born-date";
const BORN_LOCATION: &str = "span.author-born-location";

/// Fields taken from an author detail page
///
/// A field missing from the page is an empty string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailRecord {
    pub full_name: String,
    pub date_of_birth: String,
    pub place_of_birth: String,
}

/// Parses an author detail page
///
/// Fails only when none of the three fields is present, which means the
/// page is not an author page at all.
pub fn parse_detail(page: &RawPage) -> Result<DetailRecord, ParseError> {
    let url = page.reference.as_str();
    let document = Html::parse_document(&page.body);
    let root = document.root_element();

    let field = |css: &str| -> Result<Option<String>, ParseError> {
        let selector = Selector::parse(css).map_err(|e| ParseError {
            url: url.to_string(),
            message: format!("invalid selector '{}': {}", css, e),
        })?;
        Ok(first_text(root, &selector))
    };

    let full_name = field(FULL_NAME)?;
    let date_of_birth = field(BORN_DATE)?;
    let place_of_birth = field(BORN_LOCATION)?;

    if full_name.is_none() && date_of_birth.is_none() && place_of_birth.is_none() {
        return Err(ParseError {
            url: url.to_string(),
            message: "no author fields found".to_string(),
        });
    }

    Ok(DetailRecord {
        full_name: full_name.unwrap_or_default(),
        date_of_birth: date_of_birth.unwrap_or_default(),
        place_of_birth: place_of_birth.unwrap_or_default(),
    })
}
