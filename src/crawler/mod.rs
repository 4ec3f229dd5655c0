//! Crawl orchestration
//!
//! This module contains the core crawl logic:
//! - Pagination state machine over the shared search session
//! - Bounded per-page concurrent fan-out of detail fetches
//! - Per-category runs with resume gating and single-append persistence

mod category;
mod detail;
mod fanout;
mod paginator;

pub use category::{CategoryCrawler, CategoryOutcome};
pub use detail::DetailFetcher;
pub use fanout::PageFanOut;
pub use paginator::{Cursor, Paginator};

use crate::config::Config;
use crate::driver::PageDriver;
use crate::Result;
use std::sync::Arc;

/// Totals across one invocation's category runs
#[derive(Debug, Default, Clone, Copy)]
pub struct CrawlSummary {
    pub completed: usize,
    pub skipped: usize,
    pub faulted: usize,
    pub appended: usize,
}

/// Runs every configured category in order
///
/// A fault in one category is logged and does not stop the remaining
/// categories; the faulted category appended nothing and will be retried by
/// a future invocation.
pub async fn run_categories(driver: Arc<dyn PageDriver>, config: Config) -> Result<CrawlSummary> {
    let categories = config.categories.clone();
    let crawler = CategoryCrawler::new(driver, config)?;

    let mut summary = CrawlSummary::default();
    for category in &categories {
        match crawler.run(category).await {
            Ok(CategoryOutcome::Skipped) => summary.skipped += 1,
            Ok(CategoryOutcome::Completed { appended, .. }) => {
                summary.completed += 1;
                summary.appended += appended;
            }
            Err(e) => {
                tracing::error!("Category '{}' failed: {}", category, e);
                summary.faulted += 1;
            }
        }
    }

    Ok(summary)
}
