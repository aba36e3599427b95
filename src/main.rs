//! Quote-Harvest main entry point
//!
//! This is the command-line interface for the Quote-Harvest crawler.

use anyhow::Context;
use clap::Parser;
use quote_harvest::config::{apply_env_overrides, load_config_with_hash, validate, Config};
use quote_harvest::crawler::run_crawl;
use quote_harvest::output::{print_statistics, write_report};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Quote-Harvest: a polite quote and author crawler
///
/// Quote-Harvest walks a paginated quote listing, fetches each author's
/// detail page once, and writes the combined records to CSV and JSON.
#[derive(Parser, Debug)]
#[command(name = "quote-harvest")]
#[command(version = "1.0.0")]
#[command(about = "A polite quote and author crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (defaults apply when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Override the first listing page
    #[arg(long, value_name = "URL")]
    base_url: Option<String>,

    /// Override the global limit on requests in flight
    #[arg(long, value_name = "N")]
    max_concurrent: Option<u32>,

    /// Override the listing page cap
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Override the per-request timeout
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Override the politeness delay before each request
    #[arg(long, value_name = "MS")]
    rate_limit_ms: Option<u64>,

    /// Send this exact User-Agent header
    #[arg(long, value_name = "HEADER")]
    user_agent: Option<String>,

    /// Override the CSV output path
    #[arg(long, value_name = "PATH")]
    csv: Option<PathBuf>,

    /// Override the JSON output path
    #[arg(long, value_name = "PATH")]
    json: Option<PathBuf>,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,
}

impl Cli {
    fn apply_overrides(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.crawler.base_url = base_url.clone();
        }
        if let Some(max) = self.max_concurrent {
            config.crawler.max_concurrent_requests = max;
        }
        if let Some(max) = self.max_pages {
            config.crawler.max_pages = max;
        }
        if let Some(ms) = self.timeout_ms {
            config.crawler.request_timeout_ms = ms;
        }
        if let Some(ms) = self.rate_limit_ms {
            config.crawler.rate_limit_delay_ms = ms;
        }
        if let Some(header) = &self.user_agent {
            config.user_agent.header = Some(header.clone());
        }
        if let Some(path) = &self.csv {
            config.output.csv_path = path.display().to_string();
        }
        if let Some(path) = &self.json {
            config.output.json_path = path.display().to_string();
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let mut config = match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            match load_config_with_hash(path) {
                Ok((cfg, hash)) => {
                    tracing::info!("Configuration loaded successfully (hash: {})", hash);
                    cfg
                }
                Err(e) => {
                    tracing::error!("Failed to load configuration: {}", e);
                    return Err(e.into());
                }
            }
        }
        None => {
            tracing::info!("No configuration file given, using defaults");
            Config::default()
        }
    };

    // Environment sits between the file and the flags
    if let Err(e) = apply_env_overrides(&mut config) {
        tracing::error!("Invalid environment override: {}", e);
        return Err(e.into());
    }
    cli.apply_overrides(&mut config);
    if let Err(e) = validate(&config) {
        tracing::error!("Invalid configuration: {}", e);
        return Err(e.into());
    }

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    handle_crawl(config).await
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("quote_harvest=info,warn"),
            1 => EnvFilter::new("quote_harvest=debug,info"),
            2 => EnvFilter::new("quote_harvest=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the effective configuration
fn handle_dry_run(config: &Config) {
    println!("=== Quote-Harvest Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Base URL: {}", config.crawler.base_url);
    println!("  Max pages: {}", config.crawler.max_pages);
    println!(
        "  Max concurrent requests: {}",
        config.crawler.max_concurrent_requests
    );
    println!("  Request timeout: {}ms", config.crawler.request_timeout_ms);
    println!("  Rate limit delay: {}ms", config.crawler.rate_limit_delay_ms);

    println!("\nRetry:");
    println!("  Attempts: {}", config.retry.attempts);
    println!("  Strategy: {:?}", config.retry.strategy);
    println!(
        "  Delay: {}ms base, {}ms max",
        config.retry.base_delay_ms, config.retry.max_delay_ms
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  CSV: {}", config.output.csv_path);
    println!("  JSON: {}", config.output.json_path);

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling crawl");
            on_signal.cancel();
        }
    });

    let output = config.output.clone();

    let report = match run_crawl(config, cancel).await {
        Ok(report) => report,
        Err(e) => {
            tracing::error!("Crawl failed: {}", e);
            return Err(e.into());
        }
    };

    write_report(&report, &output).context("Failed to write output")?;

    print_statistics(&report.statistics, &report.diagnostics);
    println!(
        "\nScraped {} quotes in {:.2} seconds.",
        report.records.len(),
        report.statistics.elapsed.as_secs_f64()
    );

    Ok(())
}
