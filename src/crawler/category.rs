//! Category crawl driver and resume gate
//!
//! One category run owns one shared session: opened here, mutated only by
//! the search submission and the paginator, never seen by detail fetchers,
//! and closed on every exit path. Records accumulate across all result
//! pages and are filtered and appended once at the end of the run, so an
//! aborted category leaves no partial rows behind.

use crate::config::Config;
use crate::crawler::detail::DetailFetcher;
use crate::crawler::fanout::PageFanOut;
use crate::crawler::paginator::Paginator;
use crate::driver::{PageDriver, PageSession};
use crate::extract::{FieldExtractor, ListExtractor};
use crate::record::CompanyRecord;
use crate::store::CsvStore;
use crate::{Result, ScoutError};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// How one category run concluded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryOutcome {
    /// The resume gate found the category already represented in the store
    Skipped,

    /// The run finished; `appended` records survived the dedup filter
    Completed { pages: usize, appended: usize },
}

/// Crawls one category end to end
pub struct CategoryCrawler {
    driver: Arc<dyn PageDriver>,
    config: Config,
    fanout: PageFanOut,
    lists: ListExtractor,
    store: CsvStore,
    navigation_timeout: Duration,
    marker_timeout: Duration,
}

impl CategoryCrawler {
    /// Builds a crawler from configuration
    pub fn new(driver: Arc<dyn PageDriver>, config: Config) -> Result<Self> {
        let site_root = Url::parse(&config.site.root_url)?;

        let fetcher = DetailFetcher::new(
            Arc::clone(&driver),
            FieldExtractor::new(config.fields.clone()),
            site_root,
            &config.site,
            &config.crawler,
        );
        let fanout = PageFanOut::new(
            Arc::new(fetcher),
            config.crawler.max_concurrent_details as usize,
        );
        let lists = ListExtractor::new(&config.site.listing_link);
        let store = CsvStore::new(&config.output.csv_path);
        let navigation_timeout = config.crawler.navigation_timeout();
        let marker_timeout = config.crawler.marker_timeout();

        Ok(Self {
            driver,
            config,
            fanout,
            lists,
            store,
            navigation_timeout,
            marker_timeout,
        })
    }

    /// Runs one category: resume gate, paginated fan-out, single append
    ///
    /// Any error escaping this method is a category-level fault: nothing was
    /// appended for the category, so a later run retries it from scratch.
    pub async fn run(&self, category: &str) -> Result<CategoryOutcome> {
        if self.store.category_already_done(category)? {
            tracing::info!("Category '{}' already done, skipping", category);
            return Ok(CategoryOutcome::Skipped);
        }

        tracing::info!("Starting category '{}'", category);
        let session = self.driver.open_session().await?;

        let crawled = self.crawl_category(session.as_ref(), category).await;

        // The shared session is closed whether the crawl succeeded or not.
        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close search session: {}", e);
        }

        let (records, pages) = crawled?;
        let total = records.len();
        let fresh = self.store.filter_new(records)?;
        let appended = fresh.len();
        self.store.append(&fresh)?;

        tracing::info!(
            "Category '{}' complete: {} pages, {} records, {} appended after dedup",
            category,
            pages,
            total,
            appended
        );

        Ok(CategoryOutcome::Completed { pages, appended })
    }

    /// Submits the search and drives the pagination loop to exhaustion
    async fn crawl_category(
        &self,
        session: &dyn PageSession,
        category: &str,
    ) -> Result<(Vec<CompanyRecord>, usize)> {
        self.submit_search(session, category).await?;

        let mut paginator = Paginator::new(session, &self.config.site.next_control);
        let mut accumulated = Vec::new();
        let mut pages = 0usize;

        loop {
            pages += 1;
            let listings = paginator.current_listings(&self.lists).await;
            tracing::info!(
                "Category '{}' page {}: {} listings",
                category,
                pages,
                listings.len()
            );

            let records = self.fanout.process_page(category, listings).await;
            accumulated.extend(records);

            if !paginator.advance().await {
                break;
            }
        }

        Ok((accumulated, pages))
    }

    /// Navigates to the site root and submits the category search
    async fn submit_search(
        &self,
        session: &dyn PageSession,
        category: &str,
    ) -> std::result::Result<(), ScoutError> {
        let site = &self.config.site;

        session
            .navigate(&site.root_url, self.navigation_timeout)
            .await?;
        session.fill(&site.search_input, category).await?;
        session.click(&site.search_submit).await?;
        session
            .wait_for_marker(&site.result_container, self.marker_timeout)
            .await?;

        Ok(())
    }
}
