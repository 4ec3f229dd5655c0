//! Per-page concurrent fan-out over listings
//!
//! All detail fetches for one result page run concurrently, gated by a
//! configured semaphore so the number of open isolated sessions stays
//! bounded regardless of how many listings a page shows. The coordinator
//! waits for every task; one listing's failure never cancels or affects a
//! sibling.

use crate::crawler::detail::DetailFetcher;
use crate::record::{CompanyRecord, ListingRef};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Runs the detail fetcher over every listing of a result page
pub struct PageFanOut {
    fetcher: Arc<DetailFetcher>,
    permits: Arc<Semaphore>,
}

impl PageFanOut {
    pub fn new(fetcher: Arc<DetailFetcher>, max_concurrent: usize) -> Self {
        Self {
            fetcher,
            permits: Arc::new(Semaphore::new(max_concurrent)),
        }
    }

    /// Processes one page's listings and returns their records in
    /// completion order
    ///
    /// Each record is stamped with `last_checked` as it is finalized. A task
    /// that produced no record (panic or closed semaphore) is discarded; the
    /// rest of the batch is unaffected.
    pub async fn process_page(
        &self,
        category: &str,
        listings: Vec<ListingRef>,
    ) -> Vec<CompanyRecord> {
        let mut tasks: JoinSet<Option<CompanyRecord>> = JoinSet::new();

        for listing in listings {
            let fetcher = Arc::clone(&self.fetcher);
            let permits = Arc::clone(&self.permits);
            let category = category.to_string();

            tasks.spawn(async move {
                let _permit = permits.acquire_owned().await.ok()?;
                Some(fetcher.fetch(&category, &listing).await)
            });
        }

        let mut records = Vec::new();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some(mut record)) => {
                    record.last_checked = Utc::now().to_rfc3339();
                    records.push(record);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!("Detail task produced no record: {}", e);
                }
            }
        }

        records
    }
}
