//! Listing page parser
//!
//! This module turns the HTML of one listing page into:
//! - The quote records on the page, in document order
//! - The absolute reference of the next listing page, if any
//! - Issues found along the way (skipped blocks, unusable links)

use crate::crawler::detail::DetailRecord;
use crate::crawler::fetcher::RawPage;
use crate::url::Reference;
use crate::ParseError;
use scraper::{ElementRef, Html, Selector};

const QUOTE_BLOCK: &str = "div.quote";
const QUOTE_TEXT: &str = "span.text";
const AUTHOR_NAME: &str = "small.author";
const TAG: &str = "div.tags a.tag";
const AUTHOR_LINK: &str = "span a[href^='/author/']";
const NEXT_LINK: &str = "li.next a";

/// One quote extracted from a listing page
///
/// The author detail starts out empty and is attached at most once, after
/// the detail page has been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuoteRecord {
    pub text: String,
    pub author_name: String,
    pub tags: Vec<String>,

    /// Absolute reference of the author's detail page
    pub author_ref: Option<Reference>,

    author: Option<DetailRecord>,
}

impl QuoteRecord {
    pub fn new(
        text: String,
        author_name: String,
        tags: Vec<String>,
        author_ref: Option<Reference>,
    ) -> Self {
        Self {
            text,
            author_name,
            tags,
            author_ref,
            author: None,
        }
    }

    /// The resolved author detail, if resolution succeeded
    pub fn author(&self) -> Option<&DetailRecord> {
        self.author.as_ref()
    }

    /// Attaches the author detail
    ///
    /// Returns false and leaves the record untouched if a detail was already
    /// attached.
    pub fn attach_author(&mut self, detail: DetailRecord) -> bool {
        if self.author.is_some() {
            return false;
        }
        self.author = Some(detail);
        true
    }
}

/// A problem found on a listing page that did not stop the page from parsing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingIssue {
    /// Zero-based index of the quote block, `None` for page-level issues
    pub block: Option<usize>,
    pub message: String,
}

/// Result of parsing one listing page
#[derive(Debug, Clone)]
pub struct ParsedListing {
    /// Records in document order
    pub records: Vec<QuoteRecord>,

    /// Next listing page; `None` ends pagination
    pub next: Option<Reference>,

    pub issues: Vec<ListingIssue>,
}

struct ListingSelectors {
    block: Selector,
    text: Selector,
    author: Selector,
    tag: Selector,
    author_link: Selector,
    next: Selector,
}

impl ListingSelectors {
    fn build(url: &str) -> Result<Self, ParseError> {
        let parse = |css: &str| {
            Selector::parse(css).map_err(|e| ParseError {
                url: url.to_string(),
                message: format!("invalid selector '{}': {}", css, e),
            })
        };

        Ok(Self {
            block: parse(QUOTE_BLOCK)?,
            text: parse(QUOTE_TEXT)?,
            author: parse(AUTHOR_NAME)?,
            tag: parse(TAG)?,
            author_link: parse(AUTHOR_LINK)?,
            next: parse(NEXT_LINK)?,
        })
    }
}

/// Parses a listing page
///
/// Blocks missing the quote text or the author name are skipped and reported
/// in `issues`. A block without an author link is kept with no detail
/// reference. Relative links are resolved against the page's own reference.
///
/// # Example
///
/// ```
/// use quote_harvest::crawler::{parse_listing, RawPage};
/// use quote_harvest::Reference;
///
/// let page = RawPage {
///     reference: Reference::parse("https://quotes.example.com/page/1/").unwrap(),
///     status: 200,
///     body: r#"<div class="quote"><span class="text">Hi</span>
///              <span><small class="author">Ann</small></span></div>"#.to_string(),
///     attempts: 1,
/// };
/// let listing = parse_listing(&page).unwrap();
/// assert_eq!(listing.records.len(), 1);
/// assert!(listing.next.is_none());
/// ```
pub fn parse_listing(page: &RawPage) -> Result<ParsedListing, ParseError> {
    let selectors = ListingSelectors::build(page.reference.as_str())?;
    let document = Html::parse_document(&page.body);

    let mut records = Vec::new();
    let mut issues = Vec::new();

    for (index, block) in document.select(&selectors.block).enumerate() {
        match parse_block(block, &selectors, &page.reference, &mut issues, index) {
            Ok(record) => records.push(record),
            Err(message) => issues.push(ListingIssue {
                block: Some(index),
                message,
            }),
        }
    }

    let next = match document
        .select(&selectors.next)
        .next()
        .and_then(|link| link.value().attr("href"))
    {
        Some(href) => match page.reference.join(href) {
            Ok(next) => Some(next),
            Err(e) => {
                issues.push(ListingIssue {
                    block: None,
                    message: format!("unusable next link '{}': {}", href, e),
                });
                None
            }
        },
        None => None,
    };

    Ok(ParsedListing {
        records,
        next,
        issues,
    })
}

fn parse_block(
    block: ElementRef<'_>,
    selectors: &ListingSelectors,
    page: &Reference,
    issues: &mut Vec<ListingIssue>,
    index: usize,
) -> Result<QuoteRecord, String> {
    let text = first_text(block, &selectors.text).ok_or("missing quote text")?;
    let author_name = first_text(block, &selectors.author).ok_or("missing author name")?;

    let tags = block
        .select(&selectors.tag)
        .map(element_text)
        .filter(|tag| !tag.is_empty())
        .collect();

    let author_ref = match block
        .select(&selectors.author_link)
        .next()
        .and_then(|link| link.value().attr("href"))
    {
        Some(href) => match page.join(href) {
            Ok(reference) => Some(reference),
            Err(e) => {
                issues.push(ListingIssue {
                    block: Some(index),
                    message: format!("unusable author link '{}': {}", href, e),
                });
                None
            }
        },
        None => None,
    };

    Ok(QuoteRecord::new(text, author_name, tags, author_ref))
}

/// Trimmed text of the first match, `None` when absent or blank
pub(crate) fn first_text(scope: ElementRef<'_>, selector: &Selector) -> Option<String> {
    scope
        .select(selector)
        .next()
        .map(element_text)
        .filter(|text| !text.is_empty())
}

pub(crate) fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}
