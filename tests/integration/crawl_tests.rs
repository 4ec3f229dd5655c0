//! Integration tests for the crawler
//!
//! These tests drive the full category crawl cycle against a scripted
//! in-memory fake page driver: a fixed set of result pages, a detail page
//! per listing, and per-listing failure injection.

use async_trait::async_trait;
use directory_scout::config::{Config, CrawlerConfig, FieldSelectors, OutputConfig, SiteConfig};
use directory_scout::crawler::{run_categories, CategoryCrawler, CategoryOutcome};
use directory_scout::driver::{DriverError, PageDriver, PageElement, PageSession};
use directory_scout::record::EMAIL_MISSING_SENTINEL;
use directory_scout::store::CsvStore;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

const ROOT_URL: &str = "https://directory.example.com/";

const LISTING_SELECTOR: &str = "#results dl dt a";
const NEXT_SELECTOR: &str = "a.next";
const ADDRESS_SELECTOR: &str = "span.addr";
const CITY_SELECTOR: &str = "span.city";
const STATE_SELECTOR: &str = "span.state";
const PHONE_SELECTOR: &str = "span.phone";
const WEBSITE_SELECTOR: &str = "a.website";
const EMAIL_SELECTOR: &str = "a[href^='mailto:']";

/// Creates a test configuration writing to `csv_path`
fn create_test_config(csv_path: &str, categories: Vec<String>) -> Config {
    Config {
        site: SiteConfig {
            root_url: ROOT_URL.to_string(),
            search_input: "input[name='q']".to_string(),
            search_submit: "input[type='image']".to_string(),
            result_container: "#results".to_string(),
            listing_link: LISTING_SELECTOR.to_string(),
            next_control: NEXT_SELECTOR.to_string(),
            detail_marker: "div.bx-inner".to_string(),
        },
        crawler: CrawlerConfig {
            max_concurrent_details: 3,
            navigation_timeout: 5000,
            marker_timeout: 5000,
        },
        fields: FieldSelectors {
            address: ADDRESS_SELECTOR.to_string(),
            city: CITY_SELECTOR.to_string(),
            state: STATE_SELECTOR.to_string(),
            phone: PHONE_SELECTOR.to_string(),
            website: WEBSITE_SELECTOR.to_string(),
            email_link: EMAIL_SELECTOR.to_string(),
        },
        output: OutputConfig {
            csv_path: csv_path.to_string(),
        },
        categories,
    }
}

// ===== Scripted fake site =====

/// How a scripted detail page misbehaves, if at all
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Failure {
    None,
    Navigation,
    Marker,
}

/// One scripted detail page
#[derive(Debug, Clone)]
struct FakeDetail {
    address: Option<String>,
    city: Option<String>,
    state: Option<String>,
    phones: Vec<String>,
    website: Option<String>,
    /// None means the page has no mail link at all
    email: Option<String>,
    failure: Failure,
}

impl FakeDetail {
    fn ok() -> Self {
        Self {
            address: Some("1 Main St".to_string()),
            city: Some("Lagos".to_string()),
            state: Some("Lagos State".to_string()),
            phones: vec!["555 000".to_string()],
            website: Some("https://acme.example".to_string()),
            email: Some("info@acme.example".to_string()),
            failure: Failure::None,
        }
    }

    fn failing(failure: Failure) -> Self {
        Self {
            address: None,
            city: None,
            state: None,
            phones: vec![],
            website: None,
            email: None,
            failure,
        }
    }
}

/// One scripted result page
#[derive(Debug, Clone)]
struct FakeResultPage {
    /// (display name, relative link) pairs
    listings: Vec<(String, String)>,
    /// Some(href) renders a next control with that href; None renders none
    next_href: Option<Option<String>>,
}

/// Scripted state of the fake directory site
struct FakeSite {
    pages: Vec<FakeResultPage>,
    details: HashMap<String, FakeDetail>,
    /// When true, the result container never appears after search submission
    search_fails: bool,
    /// The result container never appears for this one search term
    fail_search_for: Option<String>,
    sessions_opened: AtomicUsize,
    sessions_closed: AtomicUsize,
}

struct FakeDriver {
    site: Arc<FakeSite>,
}

#[async_trait]
impl PageDriver for FakeDriver {
    async fn open_session(&self) -> Result<Box<dyn PageSession>, DriverError> {
        self.site.sessions_opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            site: Arc::clone(&self.site),
            mode: Mutex::new(Mode::Unbound),
            query: Mutex::new(None),
        }))
    }
}

/// What a fake session is currently looking at
#[derive(Debug, Clone)]
enum Mode {
    Unbound,
    /// The shared search session, positioned on a result page
    Results { page: usize },
    /// An isolated detail session bound to one listing link
    Detail { link: String },
}

struct FakeSession {
    site: Arc<FakeSite>,
    mode: Mutex<Mode>,
    /// Last text typed into the search input
    query: Mutex<Option<String>>,
}

impl FakeSession {
    fn detail(&self) -> Option<FakeDetail> {
        let mode = self.mode.lock().unwrap();
        match &*mode {
            Mode::Detail { link } => self.site.details.get(link).cloned(),
            _ => None,
        }
    }
}

#[async_trait]
impl PageSession for FakeSession {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<(), DriverError> {
        let mut mode = self.mode.lock().unwrap();
        if url == ROOT_URL {
            *mode = Mode::Results { page: 0 };
            return Ok(());
        }

        let link = url.strip_prefix(ROOT_URL.trim_end_matches('/')).unwrap_or(url);
        if let Some(detail) = self.site.details.get(link) {
            if detail.failure == Failure::Navigation {
                return Err(DriverError::NavigationTimeout {
                    url: url.to_string(),
                });
            }
        }
        *mode = Mode::Detail {
            link: link.to_string(),
        };
        Ok(())
    }

    async fn wait_for_marker(
        &self,
        selector: &str,
        _timeout: Duration,
    ) -> Result<(), DriverError> {
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            Mode::Results { .. } => {
                let query_fails = match (&self.site.fail_search_for, &*self.query.lock().unwrap())
                {
                    (Some(bad), Some(query)) => bad == query,
                    _ => false,
                };
                if self.site.search_fails || query_fails {
                    Err(DriverError::WaitTimeout {
                        selector: selector.to_string(),
                    })
                } else {
                    Ok(())
                }
            }
            Mode::Detail { ref link } => {
                let failing = self
                    .site
                    .details
                    .get(link)
                    .map(|d| d.failure == Failure::Marker)
                    .unwrap_or(true);
                if failing {
                    Err(DriverError::WaitTimeout {
                        selector: selector.to_string(),
                    })
                } else {
                    Ok(())
                }
            }
            Mode::Unbound => Err(DriverError::WaitTimeout {
                selector: selector.to_string(),
            }),
        }
    }

    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, DriverError> {
        let mode = self.mode.lock().unwrap().clone();
        match mode {
            Mode::Results { page } => {
                let Some(result_page) = self.site.pages.get(page) else {
                    return Ok(vec![]);
                };
                match selector {
                    LISTING_SELECTOR => Ok(result_page
                        .listings
                        .iter()
                        .map(|(name, link)| {
                            element(Some(name.clone()), Some(link.clone()))
                        })
                        .collect()),
                    NEXT_SELECTOR => match &result_page.next_href {
                        Some(href) => Ok(vec![element(Some("Next".to_string()), href.clone())]),
                        None => Ok(vec![]),
                    },
                    _ => Ok(vec![]),
                }
            }
            Mode::Detail { .. } => {
                let Some(detail) = self.detail() else {
                    return Ok(vec![]);
                };
                let texts = |value: &Option<String>| -> Vec<Box<dyn PageElement>> {
                    value
                        .iter()
                        .map(|text| element(Some(text.clone()), None))
                        .collect()
                };
                match selector {
                    ADDRESS_SELECTOR => Ok(texts(&detail.address)),
                    CITY_SELECTOR => Ok(texts(&detail.city)),
                    STATE_SELECTOR => Ok(texts(&detail.state)),
                    PHONE_SELECTOR => Ok(detail
                        .phones
                        .iter()
                        .map(|text| element(Some(text.clone()), None))
                        .collect()),
                    WEBSITE_SELECTOR => Ok(texts(&detail.website)),
                    EMAIL_SELECTOR => Ok(detail
                        .email
                        .iter()
                        .map(|addr| {
                            element(Some(addr.clone()), Some(format!("mailto:{}", addr)))
                        })
                        .collect()),
                    _ => Ok(vec![]),
                }
            }
            Mode::Unbound => Ok(vec![]),
        }
    }

    async fn fill(&self, _selector: &str, text: &str) -> Result<(), DriverError> {
        *self.query.lock().unwrap() = Some(text.to_string());
        Ok(())
    }

    async fn click(&self, _selector: &str) -> Result<(), DriverError> {
        Ok(())
    }

    async fn wait_settled(&self) -> Result<(), DriverError> {
        let mut mode = self.mode.lock().unwrap();
        if let Mode::Results { page } = &*mode {
            *mode = Mode::Results { page: page + 1 };
        }
        Ok(())
    }

    async fn current_url(&self) -> Result<String, DriverError> {
        let mode = self.mode.lock().unwrap();
        match &*mode {
            Mode::Detail { link } => Ok(format!(
                "{}{}",
                ROOT_URL.trim_end_matches('/'),
                link
            )),
            _ => Ok(ROOT_URL.to_string()),
        }
    }

    async fn close(&self) -> Result<(), DriverError> {
        self.site.sessions_closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Builds a fake element with fixed text and href
fn element(text: Option<String>, href: Option<String>) -> Box<dyn PageElement> {
    Box::new(FakeElement { text, href })
}

struct FakeElement {
    text: Option<String>,
    href: Option<String>,
}

#[async_trait]
impl PageElement for FakeElement {
    async fn text(&self) -> Result<Option<String>, DriverError> {
        Ok(self.text.clone())
    }

    async fn attr(&self, name: &str) -> Result<Option<String>, DriverError> {
        if name == "href" {
            Ok(self.href.clone())
        } else {
            Ok(None)
        }
    }

    async fn click(&self) -> Result<(), DriverError> {
        Ok(())
    }
}

// ===== Fixtures =====

/// Two result pages: three listings, then two, then no next control.
/// One listing on the first page fails its detail fetch.
fn scripted_site() -> Arc<FakeSite> {
    let pages = vec![
        FakeResultPage {
            listings: vec![
                ("Acme Oil".to_string(), "/companies/acme-oil".to_string()),
                ("Broken Rigs".to_string(), "/companies/broken-rigs".to_string()),
                ("Delta Gas".to_string(), "/companies/delta-gas".to_string()),
            ],
            next_href: Some(Some("/search?page=2".to_string())),
        },
        FakeResultPage {
            listings: vec![
                ("Echo Petrol".to_string(), "/companies/echo-petrol".to_string()),
                ("Foxtrot Energy".to_string(), "/companies/foxtrot".to_string()),
            ],
            next_href: None,
        },
    ];

    let mut details = HashMap::new();
    details.insert("/companies/acme-oil".to_string(), FakeDetail::ok());
    details.insert(
        "/companies/broken-rigs".to_string(),
        FakeDetail::failing(Failure::Marker),
    );
    details.insert(
        "/companies/delta-gas".to_string(),
        FakeDetail {
            // Two phone entries with internal whitespace; no mail link.
            phones: vec!["123 456 ".to_string(), " 789".to_string()],
            email: None,
            ..FakeDetail::ok()
        },
    );
    details.insert("/companies/echo-petrol".to_string(), FakeDetail::ok());
    details.insert("/companies/foxtrot".to_string(), FakeDetail::ok());

    Arc::new(FakeSite {
        pages,
        details,
        search_fails: false,
        fail_search_for: None,
        sessions_opened: AtomicUsize::new(0),
        sessions_closed: AtomicUsize::new(0),
    })
}

fn crawler_for(site: &Arc<FakeSite>, config: Config) -> CategoryCrawler {
    let driver = Arc::new(FakeDriver {
        site: Arc::clone(site),
    });
    CategoryCrawler::new(driver, config).expect("failed to build crawler")
}

fn read_rows(csv_path: &str) -> Vec<csv::StringRecord> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_path(csv_path)
        .expect("failed to open results CSV");
    reader.records().map(|r| r.unwrap()).collect()
}

fn column(rows: &[csv::StringRecord], name_value: &str, index: usize) -> String {
    rows.iter()
        .find(|row| row.get(1) == Some(name_value))
        .and_then(|row| row.get(index))
        .map(|s| s.to_string())
        .unwrap_or_else(|| panic!("no row for {}", name_value))
}

// ===== Tests =====

#[tokio::test]
async fn test_full_category_crawl() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("results.csv");
    let csv_path = csv_path.to_str().unwrap();

    let site = scripted_site();
    let config = create_test_config(csv_path, vec!["oil and gas".to_string()]);
    let crawler = crawler_for(&site, config);

    let outcome = crawler.run("oil and gas").await.expect("crawl failed");
    assert_eq!(
        outcome,
        CategoryOutcome::Completed {
            pages: 2,
            appended: 5
        }
    );

    let rows = read_rows(csv_path);
    assert_eq!(rows.len(), 5);

    // Partial failure isolation: the failing listing is present with an
    // error and no structured fields; its siblings are intact.
    let error = column(&rows, "Broken Rigs", 10);
    assert!(!error.is_empty());
    assert_eq!(column(&rows, "Broken Rigs", 3), ""); // address
    assert_eq!(column(&rows, "Broken Rigs", 8), ""); // email
    assert_eq!(column(&rows, "Acme Oil", 10), "");
    assert_eq!(column(&rows, "Acme Oil", 3), "1 Main St");

    // Every record carries a timestamp.
    for row in &rows {
        assert!(!row.get(9).unwrap().is_empty());
    }

    // Every opened session was closed: 1 shared + 5 details.
    assert_eq!(site.sessions_opened.load(Ordering::SeqCst), 6);
    assert_eq!(
        site.sessions_closed.load(Ordering::SeqCst),
        site.sessions_opened.load(Ordering::SeqCst)
    );
}

#[tokio::test]
async fn test_phone_join_and_email_sentinel() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("results.csv");
    let csv_path = csv_path.to_str().unwrap();

    let site = scripted_site();
    let config = create_test_config(csv_path, vec!["oil and gas".to_string()]);
    let crawler = crawler_for(&site, config);

    crawler.run("oil and gas").await.expect("crawl failed");
    let rows = read_rows(csv_path);

    // Multiple phones: whitespace stripped, joined with ", ".
    assert_eq!(column(&rows, "Delta Gas", 6), "123456, 789");
    // Single phone: verbatim-stripped.
    assert_eq!(column(&rows, "Acme Oil", 6), "555000");

    // No mail link yields the sentinel; a fetch-level failure yields an
    // empty field.
    assert_eq!(column(&rows, "Delta Gas", 8), EMAIL_MISSING_SENTINEL);
    assert_eq!(column(&rows, "Broken Rigs", 8), "");
    assert_eq!(column(&rows, "Acme Oil", 8), "info@acme.example");
}

#[tokio::test]
async fn test_rerun_is_skipped_by_resume_gate() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("results.csv");
    let csv_path = csv_path.to_str().unwrap();

    let site = scripted_site();
    let config = create_test_config(csv_path, vec!["oil and gas".to_string()]);
    let crawler = crawler_for(&site, config);

    crawler.run("oil and gas").await.expect("first run failed");
    let first = std::fs::read_to_string(csv_path).unwrap();
    let opened_after_first = site.sessions_opened.load(Ordering::SeqCst);

    // Second run, different case: skipped without opening any session.
    let outcome = crawler.run("OIL AND GAS").await.expect("second run failed");
    assert_eq!(outcome, CategoryOutcome::Skipped);
    assert_eq!(std::fs::read_to_string(csv_path).unwrap(), first);
    assert_eq!(site.sessions_opened.load(Ordering::SeqCst), opened_after_first);
}

#[tokio::test]
async fn test_dedup_across_categories() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("results.csv");
    let csv_path = csv_path.to_str().unwrap();

    // Pre-seed the store with "Acme Oil" under another category; the dedup
    // key is the company name alone, so the second occurrence is dropped.
    let store = CsvStore::new(csv_path);
    let seeded = directory_scout::record::CompanyRecord::failed(
        "energy",
        "Acme Oil",
        "https://directory.example.com/companies/acme-oil".to_string(),
        "seeded".to_string(),
    );
    store.append(&[seeded]).unwrap();

    let site = scripted_site();
    let config = create_test_config(csv_path, vec!["oil and gas".to_string()]);
    let crawler = crawler_for(&site, config);

    let outcome = crawler.run("oil and gas").await.expect("crawl failed");
    assert_eq!(
        outcome,
        CategoryOutcome::Completed {
            pages: 2,
            appended: 4
        }
    );

    let rows = read_rows(csv_path);
    let acme_rows: Vec<_> = rows
        .iter()
        .filter(|row| row.get(1) == Some("Acme Oil"))
        .collect();
    assert_eq!(acme_rows.len(), 1);
    assert_eq!(acme_rows[0].get(0), Some("energy"));
}

#[tokio::test]
async fn test_category_fault_appends_nothing() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("results.csv");
    let csv_path = csv_path.to_str().unwrap();

    let site = Arc::new(FakeSite {
        pages: vec![],
        details: HashMap::new(),
        search_fails: true,
        fail_search_for: None,
        sessions_opened: AtomicUsize::new(0),
        sessions_closed: AtomicUsize::new(0),
    });
    let config = create_test_config(csv_path, vec!["oil and gas".to_string()]);
    let crawler = crawler_for(&site, config);

    let result = crawler.run("oil and gas").await;
    assert!(result.is_err());

    // No rows were appended, so the category is not marked done and a later
    // run will retry it.
    assert!(!std::path::Path::new(csv_path).exists());
    let store = CsvStore::new(csv_path);
    assert!(!store.category_already_done("oil and gas").unwrap());

    // The shared session was still closed on the failure path.
    assert_eq!(site.sessions_opened.load(Ordering::SeqCst), 1);
    assert_eq!(site.sessions_closed.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_pagination_visits_each_page_once() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("results.csv");
    let csv_path = csv_path.to_str().unwrap();

    // Three pages, one listing each, last page has a placeholder next href.
    let mut details = HashMap::new();
    for name in ["a", "b", "c"] {
        details.insert(format!("/companies/{}", name), FakeDetail::ok());
    }
    let site = Arc::new(FakeSite {
        pages: vec![
            FakeResultPage {
                listings: vec![("A Co".to_string(), "/companies/a".to_string())],
                next_href: Some(Some("/search?page=2".to_string())),
            },
            FakeResultPage {
                listings: vec![("B Co".to_string(), "/companies/b".to_string())],
                next_href: Some(Some("/search?page=3".to_string())),
            },
            FakeResultPage {
                listings: vec![("C Co".to_string(), "/companies/c".to_string())],
                next_href: Some(Some("#".to_string())),
            },
        ],
        details,
        search_fails: false,
        fail_search_for: None,
        sessions_opened: AtomicUsize::new(0),
        sessions_closed: AtomicUsize::new(0),
    });

    let config = create_test_config(csv_path, vec!["oil and gas".to_string()]);
    let crawler = crawler_for(&site, config);

    let outcome = crawler.run("oil and gas").await.expect("crawl failed");
    assert_eq!(
        outcome,
        CategoryOutcome::Completed {
            pages: 3,
            appended: 3
        }
    );

    let rows = read_rows(csv_path);
    assert_eq!(rows.len(), 3);
}

#[tokio::test]
async fn test_faulted_category_does_not_stop_siblings() {
    let dir = TempDir::new().unwrap();
    let csv_path = dir.path().join("results.csv");
    let csv_path = csv_path.to_str().unwrap();

    // The first category's search never shows a result container; the
    // second crawls normally.
    let mut site = scripted_site();
    Arc::get_mut(&mut site).unwrap().fail_search_for = Some("shipping".to_string());

    let config = create_test_config(
        csv_path,
        vec!["shipping".to_string(), "oil and gas".to_string()],
    );
    let driver = Arc::new(FakeDriver {
        site: Arc::clone(&site),
    });

    let summary = run_categories(driver, config).await.expect("run failed");
    assert_eq!(summary.faulted, 1);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.skipped, 0);
    assert_eq!(summary.appended, 5);

    // Only the second category's rows were persisted, so the faulted one
    // is retried by a later invocation.
    let rows = read_rows(csv_path);
    assert_eq!(rows.len(), 5);
    assert!(rows.iter().all(|row| row.get(0) == Some("oil and gas")));

    let store = CsvStore::new(csv_path);
    assert!(!store.category_already_done("shipping").unwrap());
}
