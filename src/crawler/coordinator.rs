//! Crawler coordinator - main crawl orchestration logic
//!
//! This module drives one run:
//! - Building the run context (HTTP client, scheduler, counters, cache)
//! - Walking the listing pages strictly one after another
//! - Fanning out author detail resolution for each page's records
//! - Appending each page's records, in document order, once all of its
//!   details have settled
//! - Assembling the final report

use crate::config::{validate, Config};
use crate::crawler::fetcher::{build_http_client, Fetcher};
use crate::crawler::parser::{parse_listing, QuoteRecord};
use crate::crawler::report::{CrawlReport, Diagnostic};
use crate::crawler::resolver::DetailResolver;
use crate::crawler::scheduler::Scheduler;
use crate::output::CrawlStatistics;
use crate::state::{CursorStop, PaginationCursor, RunCounters};
use crate::url::Reference;
use crate::{ConfigError, HarvestError};
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Everything a run shares between its tasks
///
/// Built once at run start and dropped at run end; nothing here is global.
#[derive(Clone)]
pub struct RunContext {
    pub config: Arc<Config>,
    pub fetcher: Fetcher,
    pub cancel: CancellationToken,
}

impl RunContext {
    /// Validates the configuration and builds the shared client and scheduler
    ///
    /// Fails before any network activity if the configuration is invalid.
    pub fn new(config: Config, cancel: CancellationToken) -> Result<Self, HarvestError> {
        validate(&config)?;

        let client = build_http_client(&config.crawler, &config.user_agent)?;
        let scheduler = Scheduler::new(
            config.crawler.max_concurrent_requests as usize,
            config.crawler.rate_limit_delay(),
            cancel.clone(),
        );
        let fetcher = Fetcher::new(
            client,
            scheduler,
            config.retry.clone(),
            Arc::new(RunCounters::new()),
        );

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            cancel,
        })
    }

    pub fn counters(&self) -> &RunCounters {
        self.fetcher.counters()
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    context: RunContext,
    resolver: DetailResolver,
    start: Reference,
}

impl Coordinator {
    /// Creates a coordinator for one run
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    /// * `cancel` - Run-scoped cancellation signal
    pub fn new(config: Config, cancel: CancellationToken) -> Result<Self, HarvestError> {
        let context = RunContext::new(config, cancel)?;
        let start = Reference::parse(&context.config.crawler.base_url).map_err(|e| {
            ConfigError::InvalidUrl(format!(
                "Invalid base_url '{}': {}",
                context.config.crawler.base_url, e
            ))
        })?;
        let resolver = DetailResolver::new(context.fetcher.clone());

        Ok(Self {
            context,
            resolver,
            start,
        })
    }

    pub fn resolver(&self) -> &DetailResolver {
        &self.resolver
    }

    pub fn context(&self) -> &RunContext {
        &self.context
    }

    /// Runs the crawl to completion
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlReport)` - All pages visited (or the run was cancelled);
    ///   detail failures are listed in `diagnostics`
    /// * `Err(HarvestError::PageFetch)` - A listing page could not be fetched;
    ///   nothing accumulated so far is returned
    pub async fn run(&self) -> Result<CrawlReport, HarvestError> {
        let started_at = Utc::now();
        let clock = Instant::now();
        tracing::info!(
            base_url = %self.start,
            started_at = %started_at.to_rfc3339(),
            "Crawl started"
        );

        let mut cursor = PaginationCursor::new(
            self.start.clone(),
            self.context.config.crawler.max_pages,
        );
        let mut records: Vec<QuoteRecord> = Vec::new();
        let mut diagnostics: Vec<Diagnostic> = Vec::new();
        let mut failed_details: HashSet<Reference> = HashSet::new();
        let mut pages_fetched: u64 = 0;
        let mut cancelled = false;

        while let Some(page_ref) = cursor.take() {
            if self.context.cancel.is_cancelled() {
                cancelled = true;
                break;
            }

            tracing::info!(url = %page_ref, "Scraping page");
            let page = match self.context.fetcher.fetch(&page_ref).await {
                Ok(page) => page,
                Err(e) if e.is_cancelled() => {
                    cancelled = true;
                    break;
                }
                Err(e) => {
                    tracing::error!(
                        url = %page_ref,
                        pages_completed = pages_fetched,
                        cause = %e,
                        "Listing page fetch failed, aborting run"
                    );
                    return Err(HarvestError::PageFetch {
                        url: page_ref.to_string(),
                        source: e,
                        pages_completed: pages_fetched,
                        records_accumulated: records.len(),
                    });
                }
            };
            pages_fetched += 1;

            let listing = parse_listing(&page)?;
            drop(page);

            let Some(page_records) = self
                .resolve_details(listing.records, &mut diagnostics, &mut failed_details)
                .await
            else {
                tracing::warn!(url = %page_ref, "Cancelled while resolving details, page dropped");
                cancelled = true;
                break;
            };

            for issue in &listing.issues {
                tracing::warn!(url = %page_ref, block = ?issue.block, "{}", issue.message);
                diagnostics.push(Diagnostic::listing_issue(&page_ref, issue));
            }

            tracing::info!(
                url = %page_ref,
                records = page_records.len(),
                "Page scraped"
            );
            records.extend(page_records);
            tracing::info!("Scraped {} quotes so far", records.len());

            match cursor.advance(listing.next) {
                Ok(()) | Err(CursorStop::Exhausted) => {}
                Err(CursorStop::Revisit(next)) => {
                    tracing::warn!(url = %next, "Next link points to a visited page, stopping");
                    diagnostics.push(Diagnostic::pagination(
                        &next,
                        format!("next link from {} revisits an earlier page", page_ref),
                    ));
                }
                Err(CursorStop::PageLimit { limit, next }) => {
                    tracing::warn!(url = %next, limit, "Page limit reached, stopping");
                    diagnostics.push(Diagnostic::pagination(
                        &next,
                        format!("page limit of {} reached", limit),
                    ));
                }
            }
        }

        let finished_at = Utc::now();
        let elapsed = clock.elapsed();
        let counters = self.context.counters().snapshot();

        if cancelled {
            tracing::warn!(
                records = records.len(),
                "Crawl cancelled, returning records accumulated so far"
            );
        }
        tracing::info!(
            finished_at = %finished_at.to_rfc3339(),
            records = records.len(),
            diagnostics = diagnostics.len(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Crawl finished"
        );

        let statistics = CrawlStatistics {
            started_at,
            finished_at,
            elapsed,
            pages_fetched,
            records: records.len(),
            diagnostics: diagnostics.len(),
            requests: counters.requests,
            retries: counters.retries,
            non_success_responses: counters.non_success,
            detail_fetches: counters.detail_fetches,
            cancelled,
        };

        Ok(CrawlReport {
            records,
            diagnostics,
            cancelled,
            statistics,
        })
    }

    /// Resolves and attaches the author detail of every record of one page
    ///
    /// Resolutions run concurrently; the returned records keep their input
    /// order. A failed detail leaves the record without one and is reported
    /// once per reference for the whole run. Returns `None` if cancellation
    /// cut any resolution short.
    async fn resolve_details(
        &self,
        mut page_records: Vec<QuoteRecord>,
        diagnostics: &mut Vec<Diagnostic>,
        failed_details: &mut HashSet<Reference>,
    ) -> Option<Vec<QuoteRecord>> {
        let lookups = page_records.iter().map(|record| {
            let reference = record.author_ref.clone();
            async move {
                match reference {
                    Some(reference) => Some(self.resolver.resolve(&reference).await),
                    None => None,
                }
            }
        });
        let outcomes = join_all(lookups).await;

        let mut interrupted = false;
        let mut failures = Vec::new();
        for (record, outcome) in page_records.iter_mut().zip(outcomes) {
            match outcome {
                None => {}
                Some(Ok(detail)) => {
                    record.attach_author(detail);
                }
                Some(Err(e)) => {
                    let Some(reference) = &record.author_ref else {
                        continue;
                    };
                    match Diagnostic::detail(reference, &e) {
                        Some(diagnostic) => failures.push((reference.clone(), e, diagnostic)),
                        None => interrupted = true,
                    }
                }
            }
        }

        if interrupted {
            return None;
        }

        for (reference, error, diagnostic) in failures {
            if failed_details.insert(reference) {
                tracing::warn!(url = %diagnostic.reference, cause = %error, "Author detail unavailable");
                diagnostics.push(diagnostic);
            }
        }
        Some(page_records)
    }
}

/// Runs a complete crawl with the given configuration
///
/// # Example
///
/// ```no_run
/// use quote_harvest::config::Config;
/// use quote_harvest::crawler::run_crawl;
/// use tokio_util::sync::CancellationToken;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let report = run_crawl(Config::default(), CancellationToken::new()).await?;
/// println!("{} quotes", report.records.len());
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(
    config: Config,
    cancel: CancellationToken,
) -> Result<CrawlReport, HarvestError> {
    let coordinator = Coordinator::new(config, cancel)?;
    coordinator.run().await
}
