//! Detail resolver: fetch and parse each author page at most once per run
//!
//! The cache maps a [`Reference`] to a [`DetailState`]. The map lock is held
//! only to read or change an entry, never across I/O:
//!
//! 1. Lock, look up the reference.
//! 2. `Resolved` / `Failed`: return the stored outcome.
//! 3. `Pending`: clone the shared in-flight future, unlock, await it.
//! 4. Absent: install a `Pending` entry wrapping a not-yet-started
//!    fetch + parse, unlock, await it.
//! 5. Whoever observes completion first moves the entry to `Resolved` or
//!    `Failed`; everyone awaiting the same shared future gets the same value.
//!
//! Failures are sticky for the run. Cancellation is the exception: a
//! cancelled fetch leaves no entry behind.

use crate::crawler::detail::{parse_detail, DetailRecord};
use crate::crawler::fetcher::{FetchError, Fetcher};
use crate::state::{DetailOutcome, DetailState, PendingDetail};
use crate::url::Reference;
use crate::ParseError;
use futures::FutureExt;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Why a detail could not be resolved
#[derive(Debug, Clone, Error)]
pub enum DetailError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Parse(#[from] ParseError),
}

impl DetailError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Fetch(e) if e.is_cancelled())
    }
}

/// Deduplicating, concurrency-safe cache of author details
///
/// Cloning is cheap; clones share the same cache.
#[derive(Clone)]
pub struct DetailResolver {
    fetcher: Fetcher,
    entries: Arc<Mutex<HashMap<Reference, DetailState>>>,
}

impl DetailResolver {
    pub fn new(fetcher: Fetcher) -> Self {
        Self {
            fetcher,
            entries: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Resolves a detail reference, fetching it only if nobody has yet
    pub async fn resolve(&self, reference: &Reference) -> DetailOutcome {
        let work = {
            let mut entries = self.lock();
            match entries.get(reference) {
                Some(DetailState::Resolved(record)) => {
                    tracing::debug!(url = %reference, "Detail cache hit");
                    return Ok(record.clone());
                }
                Some(DetailState::Failed(error)) => {
                    tracing::debug!(url = %reference, "Detail cache hit (failed)");
                    return Err(error.clone());
                }
                Some(DetailState::Pending(work)) => {
                    tracing::debug!(url = %reference, "Joining in-flight detail fetch");
                    work.clone()
                }
                None => {
                    let work: PendingDetail =
                        fetch_and_parse(self.fetcher.clone(), reference.clone())
                            .boxed()
                            .shared();
                    entries.insert(reference.clone(), DetailState::Pending(work.clone()));
                    work
                }
            }
        };

        let outcome = work.clone().await;
        self.settle(reference, &work, &outcome);
        outcome
    }

    /// Moves a pending entry to its terminal state
    ///
    /// Only the entry created for `work` is touched, so a late waiter cannot
    /// overwrite a newer entry for the same reference.
    fn settle(&self, reference: &Reference, work: &PendingDetail, outcome: &DetailOutcome) {
        let mut entries = self.lock();
        let owns_entry = matches!(
            entries.get(reference),
            Some(DetailState::Pending(current)) if current.ptr_eq(work)
        );
        if !owns_entry {
            return;
        }

        match outcome {
            Err(error) if error.is_cancelled() => {
                entries.remove(reference);
            }
            _ => {
                entries.insert(reference.clone(), DetailState::settled(outcome));
            }
        }
    }

    /// Drops a settled entry so the next `resolve` fetches again
    ///
    /// Pending entries are left alone. Returns true if an entry was removed.
    pub fn forget(&self, reference: &Reference) -> bool {
        let mut entries = self.lock();
        if entries.get(reference).is_some_and(DetailState::is_settled) {
            entries.remove(reference);
            true
        } else {
            false
        }
    }

    /// Current state of one entry: "pending", "resolved" or "failed"
    pub fn state_of(&self, reference: &Reference) -> Option<&'static str> {
        self.lock().get(reference).map(DetailState::as_str)
    }

    /// Number of references the cache knows about
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Reference, DetailState>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

async fn fetch_and_parse(fetcher: Fetcher, reference: Reference) -> DetailOutcome {
    tracing::debug!(url = %reference, "Fetching author detail");

    let fetched = fetcher.fetch(&reference).await;

    // Counted only once a request actually went out
    let attempts = match &fetched {
        Ok(page) => page.attempts,
        Err(e) => e.attempts,
    };
    if attempts > 0 {
        fetcher.counters().record_detail_fetch();
    }

    let page = fetched?;
    let record: DetailRecord = parse_detail(&page)?;
    Ok(record)
}
