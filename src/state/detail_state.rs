//! Per-reference state of the detail cache
//!
//! An entry is created `Pending` and moves exactly once to `Resolved` or
//! `Failed`. Neither terminal state ever goes back to `Pending`.

use crate::crawler::{DetailError, DetailRecord};
use futures::future::{BoxFuture, Shared};

/// Outcome of one fetch + parse of a detail page
pub type DetailOutcome = Result<DetailRecord, DetailError>;

/// The in-flight work for one reference, awaitable by any number of callers
pub type PendingDetail = Shared<BoxFuture<'static, DetailOutcome>>;

#[derive(Clone)]
pub enum DetailState {
    /// Fetch + parse has been installed and is being driven by its waiters
    Pending(PendingDetail),

    /// Parsed successfully; served from memory for the rest of the run
    Resolved(DetailRecord),

    /// Failed after the fetcher's own retries; sticky for the run
    Failed(DetailError),
}

impl DetailState {
    pub fn is_pending(&self) -> bool {
        matches!(self, Self::Pending(_))
    }

    /// Returns true for `Resolved` and `Failed`
    pub fn is_settled(&self) -> bool {
        !self.is_pending()
    }

    /// Builds the terminal state for an outcome
    pub fn settled(outcome: &DetailOutcome) -> Self {
        match outcome {
            Ok(record) => Self::Resolved(record.clone()),
            Err(error) => Self::Failed(error.clone()),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending(_) => "pending",
            Self::Resolved(_) => "resolved",
            Self::Failed(_) => "failed",
        }
    }
}

impl std::fmt::Debug for DetailState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Pending(_) => f.write_str("Pending"),
            Self::Resolved(record) => f.debug_tuple("Resolved").field(record).finish(),
            Self::Failed(error) => f.debug_tuple("Failed").field(error).finish(),
        }
    }
}
