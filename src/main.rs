//! Directory Scout main entry point
//!
//! Command-line interface for the business-directory contact crawler.

use clap::Parser;
use directory_scout::config::load_config;
use directory_scout::crawler::run_categories;
use directory_scout::driver::ChromiumDriver;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Directory Scout: a business-directory contact crawler
///
/// Crawls a paginated directory search for each configured category,
/// extracts contact fields from every listing's detail page, and appends
/// deduplicated records to a CSV store. Categories already present in the
/// store are skipped, so repeated runs are idempotent.
#[derive(Parser, Debug)]
#[command(name = "directory-scout")]
#[command(version = "1.0.0")]
#[command(about = "A business-directory contact crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Run the browser with a visible window
    #[arg(long)]
    headful: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let config = match load_config(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    if cli.dry_run {
        handle_dry_run(&config);
        return Ok(());
    }

    tracing::info!(
        "Crawling {} categories into {}",
        config.categories.len(),
        config.output.csv_path
    );

    let driver = Arc::new(ChromiumDriver::launch(!cli.headful).await?);

    let summary = run_categories(driver, config).await?;

    tracing::info!(
        "Run complete: {} categories crawled, {} skipped, {} faulted, {} records appended",
        summary.completed,
        summary.skipped,
        summary.faulted,
        summary.appended
    );

    if summary.faulted > 0 {
        tracing::warn!(
            "{} categories faulted and will be retried on the next run",
            summary.faulted
        );
    }

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("directory_scout=info,warn"),
            1 => EnvFilter::new("directory_scout=debug,info"),
            2 => EnvFilter::new("directory_scout=trace,debug"),
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

/// Handles the --dry-run mode: validates config and echoes the crawl plan
fn handle_dry_run(config: &directory_scout::config::Config) {
    println!("=== Directory Scout Dry Run ===\n");

    println!("Site:");
    println!("  Root URL: {}", config.site.root_url);
    println!("  Result container: {}", config.site.result_container);
    println!("  Listing link: {}", config.site.listing_link);
    println!("  Next control: {}", config.site.next_control);
    println!("  Detail marker: {}", config.site.detail_marker);

    println!("\nCrawler:");
    println!(
        "  Max concurrent details: {}",
        config.crawler.max_concurrent_details
    );
    println!(
        "  Navigation timeout: {}ms",
        config.crawler.navigation_timeout
    );
    println!("  Marker timeout: {}ms", config.crawler.marker_timeout);

    println!("\nOutput:");
    println!("  CSV: {}", config.output.csv_path);

    println!("\nCategories ({}):", config.categories.len());
    for category in &config.categories {
        println!("  - {}", category);
    }

    println!("\n✓ Configuration is valid");
}
