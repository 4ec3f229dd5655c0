use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Directory Scout
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    pub crawler: CrawlerConfig,
    pub fields: FieldSelectors,
    pub output: OutputConfig,

    /// Ordered list of search terms to crawl, one category run each
    pub categories: Vec<String>,
}

/// Selectors and root URL describing the directory site
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Absolute root URL of the directory site
    #[serde(rename = "root-url")]
    pub root_url: String,

    /// Selector for the search input box on the root page
    #[serde(rename = "search-input")]
    pub search_input: String,

    /// Selector for the control that submits the search
    #[serde(rename = "search-submit")]
    pub search_submit: String,

    /// Selector confirming the result list has rendered
    #[serde(rename = "result-container")]
    pub result_container: String,

    /// Selector matching the listing anchors on a result page
    #[serde(rename = "listing-link")]
    pub listing_link: String,

    /// Selector for the next-page control
    #[serde(rename = "next-control")]
    pub next_control: String,

    /// Selector confirming a detail page has rendered
    #[serde(rename = "detail-marker")]
    pub detail_marker: String,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of detail pages fetched concurrently per result page
    #[serde(rename = "max-concurrent-details")]
    pub max_concurrent_details: u32,

    /// Navigation timeout for detail-page loads (milliseconds)
    #[serde(rename = "navigation-timeout")]
    pub navigation_timeout: u64,

    /// Timeout waiting for a marker selector to appear (milliseconds)
    #[serde(rename = "marker-timeout")]
    pub marker_timeout: u64,
}

impl CrawlerConfig {
    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout)
    }

    pub fn marker_timeout(&self) -> Duration {
        Duration::from_millis(self.marker_timeout)
    }
}

/// Per-field selectors for detail-page contact extraction
///
/// Each field is read independently and is optional on the page; a selector
/// that matches nothing yields an absent field, never a failed record.
#[derive(Debug, Clone, Deserialize)]
pub struct FieldSelectors {
    pub address: String,
    pub city: String,
    pub state: String,
    pub phone: String,
    pub website: String,

    /// Selector for the mail-link element; its absence is recorded as the
    /// literal sentinel "NIL" rather than an empty field
    #[serde(rename = "email-link")]
    pub email_link: String,
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the CSV results file
    #[serde(rename = "csv-path")]
    pub csv_path: String,
}
