//! What a finished run hands to the output layer

use crate::crawler::fetcher::FetchErrorKind;
use crate::crawler::parser::{ListingIssue, QuoteRecord};
use crate::crawler::resolver::DetailError;
use crate::output::CrawlStatistics;
use crate::url::Reference;
use serde::Serialize;
use std::fmt;

/// Which kind of page a diagnostic is about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Page,
    Detail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Network error, timeout or retryable status after all retries
    TransientNetwork,
    /// Non-retryable HTTP status
    PermanentHttp,
    /// Page shape did not match the expected selectors
    Parse,
    /// Pagination stopped by the revisit or page-limit guard
    Pagination,
}

impl ErrorKind {
    /// Classifies a fetch failure; `None` for cancellation, which drops work
    /// instead of reporting it
    pub fn from_fetch(kind: &FetchErrorKind) -> Option<Self> {
        match kind {
            FetchErrorKind::Transient => Some(Self::TransientNetwork),
            FetchErrorKind::Permanent { .. } => Some(Self::PermanentHttp),
            FetchErrorKind::Cancelled => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::TransientNetwork => "transient_network",
            Self::PermanentHttp => "permanent_http",
            Self::Parse => "parse",
            Self::Pagination => "pagination",
        };
        f.write_str(name)
    }
}

/// A non-fatal failure recorded during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub reference: String,
    pub phase: Phase,
    pub kind: ErrorKind,
    pub message: String,
}

impl Diagnostic {
    /// A skipped block or unusable link on a listing page
    pub fn listing_issue(page: &Reference, issue: &ListingIssue) -> Self {
        let message = match issue.block {
            Some(block) => format!("quote block {}: {}", block, issue.message),
            None => issue.message.clone(),
        };
        Self {
            reference: page.to_string(),
            phase: Phase::Page,
            kind: ErrorKind::Parse,
            message,
        }
    }

    /// A detail reference that could not be resolved
    ///
    /// Returns `None` for a cancelled resolution.
    pub fn detail(reference: &Reference, error: &DetailError) -> Option<Self> {
        let kind = match error {
            DetailError::Fetch(e) => ErrorKind::from_fetch(&e.kind)?,
            DetailError::Parse(_) => ErrorKind::Parse,
        };
        Some(Self {
            reference: reference.to_string(),
            phase: Phase::Detail,
            kind,
            message: error.to_string(),
        })
    }

    /// Pagination ended early by a guard
    pub fn pagination(reference: &Reference, message: impl Into<String>) -> Self {
        Self {
            reference: reference.to_string(),
            phase: Phase::Page,
            kind: ErrorKind::Pagination,
            message: message.into(),
        }
    }
}

/// The result of a completed (or cancelled) run
#[derive(Debug, Clone)]
pub struct CrawlReport {
    /// Every emitted record, in page-visit then document order
    pub records: Vec<QuoteRecord>,

    pub diagnostics: Vec<Diagnostic>,

    /// True when the run stopped early on its cancellation token
    pub cancelled: bool,

    pub statistics: CrawlStatistics,
}
