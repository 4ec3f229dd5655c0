//! Detail fetcher: one isolated session per listing
//!
//! Every call yields a `CompanyRecord`, complete or error-annotated; no
//! failure escapes to the caller. The isolated session opened for a fetch is
//! closed on every exit path.

use crate::config::{CrawlerConfig, SiteConfig};
use crate::driver::{DriverError, PageDriver, PageSession};
use crate::extract::FieldExtractor;
use crate::record::{CompanyRecord, ListingRef};
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Fetches one listing's detail page in a fresh isolated session
pub struct DetailFetcher {
    driver: Arc<dyn PageDriver>,
    extractor: FieldExtractor,
    site_root: Url,
    detail_marker: String,
    navigation_timeout: Duration,
    marker_timeout: Duration,
}

impl DetailFetcher {
    pub fn new(
        driver: Arc<dyn PageDriver>,
        extractor: FieldExtractor,
        site_root: Url,
        site: &SiteConfig,
        crawler: &CrawlerConfig,
    ) -> Self {
        Self {
            driver,
            extractor,
            site_root,
            detail_marker: site.detail_marker.clone(),
            navigation_timeout: crawler.navigation_timeout(),
            marker_timeout: crawler.marker_timeout(),
        }
    }

    /// Fetches the detail page for one listing
    ///
    /// Never propagates an error: a failure at any step yields a record with
    /// all structured fields absent and `error` describing what went wrong.
    /// `last_checked` is stamped later by the fan-out coordinator.
    pub async fn fetch(&self, category: &str, listing: &ListingRef) -> CompanyRecord {
        let detail_url = self.absolute_url(&listing.link);

        let session = match self.driver.open_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!("Could not open session for '{}': {}", listing.name, e);
                return CompanyRecord::failed(
                    category,
                    &listing.name,
                    detail_url,
                    format!("session open failed: {}", e),
                );
            }
        };

        let record = match self
            .fetch_in_session(session.as_ref(), category, listing, &detail_url)
            .await
        {
            Ok(record) => record,
            Err(e) => {
                tracing::warn!("Detail fetch failed for '{}': {}", listing.name, e);
                CompanyRecord::failed(category, &listing.name, detail_url, e.to_string())
            }
        };

        // Closed regardless of how the fetch concluded.
        if let Err(e) = session.close().await {
            tracing::warn!("Failed to close detail session for '{}': {}", listing.name, e);
        }

        record
    }

    async fn fetch_in_session(
        &self,
        session: &dyn PageSession,
        category: &str,
        listing: &ListingRef,
        detail_url: &str,
    ) -> Result<CompanyRecord, DriverError> {
        session.navigate(detail_url, self.navigation_timeout).await?;
        session
            .wait_for_marker(&self.detail_marker, self.marker_timeout)
            .await?;

        let fields = self.extractor.extract(session).await;

        // Session-reported URL accounts for redirects; fall back to the
        // resolved link when the session cannot report one.
        let source_url = session
            .current_url()
            .await
            .unwrap_or_else(|_| detail_url.to_string());

        Ok(CompanyRecord::from_fields(
            category,
            &listing.name,
            source_url,
            fields,
        ))
    }

    /// Resolves a site-relative link against the site root
    fn absolute_url(&self, link: &str) -> String {
        match self.site_root.join(link) {
            Ok(url) => url.to_string(),
            Err(_) => format!(
                "{}/{}",
                self.site_root.as_str().trim_end_matches('/'),
                link.trim_start_matches('/')
            ),
        }
    }
}
