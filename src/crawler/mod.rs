//! Crawler module for quote and author page processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and backoff
//! - Listing and author page parsing
//! - Shared concurrency limiting and politeness delay
//! - The deduplicating author detail cache
//! - Overall crawl coordination

mod coordinator;
mod detail;
mod fetcher;
mod parser;
mod report;
mod resolver;
mod scheduler;

pub use coordinator::{run_crawl, Coordinator, RunContext};
pub use detail::{parse_detail, DetailRecord};
pub use fetcher::{build_http_client, FetchError, FetchErrorKind, Fetcher, RawPage};
pub use parser::{parse_listing, ListingIssue, ParsedListing, QuoteRecord};
pub use report::{CrawlReport, Diagnostic, ErrorKind, Phase};
pub use resolver::{DetailError, DetailResolver};
pub use scheduler::{Cancelled, RequestSlot, Scheduler};
