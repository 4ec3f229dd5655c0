//! Page automation driver abstraction
//!
//! The crawl core never talks to a browser directly; it depends only on the
//! capability surface defined here. Sessions are opened per fetch (isolated
//! cookie/storage partition) or per category (the shared search session),
//! and every session must be explicitly closed by its owner.

mod chromium;

pub use chromium::ChromiumDriver;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors surfaced by a page automation driver
#[derive(Debug, Error)]
pub enum DriverError {
    #[error("Failed to launch browser: {0}")]
    Launch(String),

    #[error("Failed to open session: {0}")]
    SessionOpen(String),

    #[error("Navigation to {url} failed: {message}")]
    Navigation { url: String, message: String },

    #[error("Navigation to {url} timed out")]
    NavigationTimeout { url: String },

    #[error("Timed out waiting for '{selector}'")]
    WaitTimeout { selector: String },

    #[error("Element operation failed: {0}")]
    Element(String),

    #[error("Driver protocol error: {0}")]
    Protocol(String),
}

/// Factory for browsing sessions
///
/// One driver instance wraps one browser process; each opened session is an
/// isolated partition within it.
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// Opens a fresh browsing session with its own cookie/storage partition
    async fn open_session(&self) -> Result<Box<dyn PageSession>, DriverError>;
}

/// One open browsing session
#[async_trait]
pub trait PageSession: Send + Sync {
    /// Navigates to an absolute URL, bounded by `timeout`
    async fn navigate(&self, url: &str, timeout: Duration) -> Result<(), DriverError>;

    /// Waits until `selector` matches an element, bounded by `timeout`
    async fn wait_for_marker(&self, selector: &str, timeout: Duration)
        -> Result<(), DriverError>;

    /// Returns handles for every element currently matching `selector`
    async fn query_all(&self, selector: &str) -> Result<Vec<Box<dyn PageElement>>, DriverError>;

    /// Types `text` into the element matching `selector`
    async fn fill(&self, selector: &str, text: &str) -> Result<(), DriverError>;

    /// Clicks the element matching `selector`
    async fn click(&self, selector: &str) -> Result<(), DriverError>;

    /// Waits for the session to reach a stable loaded state after an action
    async fn wait_settled(&self) -> Result<(), DriverError>;

    /// The session's current URL, after any redirects
    async fn current_url(&self) -> Result<String, DriverError>;

    /// Tears down the session and its partition
    async fn close(&self) -> Result<(), DriverError>;
}

/// A handle to one element within a session
#[async_trait]
pub trait PageElement: Send + Sync {
    /// The element's visible text, if any
    async fn text(&self) -> Result<Option<String>, DriverError>;

    /// The value of attribute `name`, if present
    async fn attr(&self, name: &str) -> Result<Option<String>, DriverError>;

    /// Clicks the element
    async fn click(&self) -> Result<(), DriverError>;
}
