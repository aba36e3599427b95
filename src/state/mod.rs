//! State module for tracking crawl progress
//!
//! This module holds the mutable state of a single run.
//!
//! # Components
//!
//! - `DetailState`: per-reference state of the detail cache (pending, resolved, failed)
//! - `PaginationCursor`: the next listing page to fetch, with revisit and page-limit guards
//! - `RunCounters`: request, retry and detail-fetch counters shared across tasks

mod cursor;
mod detail_state;
mod run_counters;

// Re-export main types
pub use cursor::{CursorStop, PaginationCursor};
pub use detail_state::{DetailOutcome, DetailState, PendingDetail};
pub use run_counters::{CounterSnapshot, RunCounters};
