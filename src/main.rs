//! Gleaner main entry point
//!
//! This is the command-line interface for the Gleaner site crawler.

use anyhow::Context;
use clap::Parser;
use gleaner::config::{read_config, repair_seed_url, validate, CrawlConfig};
use gleaner::output::{print_summary, write_markdown_summary};
use gleaner::Crawler;
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Gleaner: a polite single-site content crawler
///
/// Gleaner crawls a site from one seed URL, extracts the readable content
/// of each page, and reports what it captured. JavaScript-heavy seed pages
/// can be rendered with a local headless Chromium.
#[derive(Parser, Debug)]
#[command(name = "gleaner")]
#[command(version)]
#[command(about = "A polite single-site content crawler", long_about = None)]
struct Cli {
    /// Seed URL to crawl (a missing scheme defaults to https)
    #[arg(value_name = "URL", required_unless_present = "config")]
    url: Option<String>,

    /// Path to a TOML crawl configuration
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Maximum number of pages to capture
    #[arg(long, value_name = "N")]
    max_pages: Option<usize>,

    /// Follow links discovered on captured pages
    #[arg(long)]
    follow_links: bool,

    /// Restrict crawling to this domain (repeatable)
    #[arg(long = "allowed-domain", value_name = "DOMAIN")]
    allowed_domains: Vec<String>,

    /// Restrict crawling to paths with this prefix (repeatable)
    #[arg(long = "allowed-path", value_name = "PREFIX")]
    allowed_paths: Vec<String>,

    /// Render the seed page with headless Chromium first
    #[arg(long)]
    render_js: bool,

    /// CSS selector to wait for while rendering
    #[arg(long, value_name = "SELECTOR", requires = "render_js")]
    wait_selector: Option<String>,

    /// Write a markdown summary to this file
    #[arg(long, value_name = "FILE")]
    summary: Option<PathBuf>,

    /// Write the full crawl result as JSON to this file
    #[arg(long, value_name = "FILE")]
    json: Option<PathBuf>,

    /// Validate the configuration and show what would be crawled
    #[arg(long)]
    dry_run: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

impl Cli {
    /// Builds the crawl configuration, letting flags override the file
    fn crawl_config(&self) -> anyhow::Result<CrawlConfig> {
        let mut config = match &self.config {
            Some(path) => {
                tracing::info!("Loading configuration from: {}", path.display());
                read_config(path)
                    .with_context(|| format!("failed to load {}", path.display()))?
            }
            None => CrawlConfig::new(String::new()),
        };

        if let Some(url) = &self.url {
            config.url = url.clone();
        }
        if let Some(max_pages) = self.max_pages {
            config.max_pages = max_pages;
        }
        if self.follow_links {
            config.follow_links = true;
        }
        if !self.allowed_domains.is_empty() {
            config.allowed_domains = self.allowed_domains.clone();
        }
        if !self.allowed_paths.is_empty() {
            config.allowed_paths = self.allowed_paths.clone();
        }
        if self.render_js {
            config.render_js = true;
        }
        if self.wait_selector.is_some() {
            config.wait_selector = self.wait_selector.clone();
        }

        validate(&config)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    let config = cli.crawl_config()?;

    if cli.dry_run {
        print_dry_run(&config);
        return Ok(());
    }

    let crawler = Crawler::new()?;
    let result = crawler.crawl(&config).await?;

    if !cli.quiet {
        print_summary(&result);
    }

    if let Some(path) = &cli.summary {
        write_markdown_summary(&result, path)
            .with_context(|| format!("failed to write {}", path.display()))?;
        tracing::info!("Summary written to {}", path.display());
    }

    if let Some(path) = &cli.json {
        let file =
            File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
        serde_json::to_writer_pretty(file, &result)?;
        tracing::info!("Result written to {}", path.display());
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("gleaner=info,warn"),
            1 => EnvFilter::new("gleaner=debug,info"),
            2 => EnvFilter::new("gleaner=trace,debug"),
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

/// Shows the effective configuration without crawling
fn print_dry_run(config: &CrawlConfig) {
    println!("=== Gleaner Dry Run ===\n");

    println!("Seed: {}", repair_seed_url(&config.url));
    println!("  Max pages: {}", config.max_pages);
    println!("  Follow links: {}", config.follow_links);
    println!("  Request timeout: {:?}", config.timeout());

    if config.allowed_domains.is_empty() {
        println!("  Allowed domains: derived from seed");
    } else {
        println!("  Allowed domains: {}", config.allowed_domains.join(", "));
    }
    if !config.allowed_paths.is_empty() {
        println!("  Allowed paths: {}", config.allowed_paths.join(", "));
    }

    println!("\nPoliteness:");
    println!("  Per-domain parallelism: {}", config.politeness.parallelism);
    println!(
        "  Delay: {:?} + up to {:?} jitter",
        config.politeness.delay(),
        config.politeness.random_delay()
    );
    println!("  Max concurrency: {}", config.politeness.max_concurrency);

    if config.render_js {
        println!("\nRendering:");
        println!("  Timeout: {:?}", config.render_timeout());
        if let Some(selector) = config.wait_selector() {
            println!("  Wait selector: {}", selector);
        }
        if let Some(idle) = config.network_idle_after() {
            println!("  Network idle: {:?}", idle);
        }
    }

    println!("\n✓ Configuration is valid");
}
