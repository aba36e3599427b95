//! Run statistics
//!
//! Collected by the coordinator at the end of a run and printed by the CLI.

use crate::crawler::Diagnostic;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Crawl statistics summary
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub elapsed: Duration,

    /// Listing pages fetched successfully
    pub pages_fetched: u64,

    /// Records emitted
    pub records: usize,

    /// Diagnostics recorded
    pub diagnostics: usize,

    /// HTTP requests sent, retries included
    pub requests: u64,

    pub retries: u64,
    pub non_success_responses: u64,

    /// Unique author pages requested, whatever the outcome
    pub detail_fetches: u64,

    pub cancelled: bool,
}

impl CrawlStatistics {
    /// Records per second of wall time
    pub fn records_per_second(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs == 0.0 {
            return 0.0;
        }
        self.records as f64 / secs
    }
}

/// Prints statistics and diagnostics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics, diagnostics: &[Diagnostic]) {
    println!("=== Crawl Statistics ===\n");

    println!("Run:");
    println!("  Started:  {}", stats.started_at.to_rfc3339());
    println!("  Finished: {}", stats.finished_at.to_rfc3339());
    println!("  Elapsed:  {:.2}s", stats.elapsed.as_secs_f64());
    if stats.cancelled {
        println!("  Status:   cancelled (partial results)");
    }
    println!();

    println!("Requests:");
    println!("  Listing pages fetched: {}", stats.pages_fetched);
    println!("  Author pages fetched: {}", stats.detail_fetches);
    println!("  Total requests: {}", stats.requests);
    println!("  Retries: {}", stats.retries);
    println!("  Non-2xx responses: {}", stats.non_success_responses);
    println!();

    println!(
        "Records: {} ({:.1}/s)",
        stats.records,
        stats.records_per_second()
    );

    if !diagnostics.is_empty() {
        println!("\nDiagnostics ({}):", diagnostics.len());
        for diagnostic in diagnostics {
            println!(
                "  - [{:?}/{}] {}: {}",
                diagnostic.phase, diagnostic.kind, diagnostic.reference, diagnostic.message
            );
        }
    }
}
