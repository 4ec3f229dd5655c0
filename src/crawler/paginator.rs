//! Pagination state machine over the shared search session
//!
//! The paginator is the only component that mutates the shared session once
//! a search has been submitted. It never retries: a "next" control that is
//! absent, points nowhere, or fails to activate ends the category crawl
//! gracefully instead of aborting the run.

use crate::driver::{DriverError, PageSession};
use crate::extract::ListExtractor;
use crate::record::ListingRef;

/// Where the paginator currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// A result page is loaded in the session
    OnPage,

    /// No further result pages exist
    Exhausted,
}

/// Drives the shared session from one result page to the next
pub struct Paginator<'a> {
    session: &'a dyn PageSession,
    next_selector: String,
    cursor: Cursor,
}

impl<'a> Paginator<'a> {
    /// Creates a paginator positioned on the first result page
    ///
    /// The caller must have submitted the search and confirmed the result
    /// container is visible before constructing this.
    pub fn new(session: &'a dyn PageSession, next_selector: &str) -> Self {
        Self {
            session,
            next_selector: next_selector.to_string(),
            cursor: Cursor::OnPage,
        }
    }

    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    /// The listings visible on the current result page
    pub async fn current_listings(&self, lists: &ListExtractor) -> Vec<ListingRef> {
        lists.listings(self.session).await
    }

    /// Attempts to move to the next result page
    ///
    /// Returns true when a further page was loaded. Termination rule, checked
    /// in order: no next control exists; the control's href is missing,
    /// empty, or the "#" placeholder; or any driver failure while resolving
    /// or activating it. All three cases yield `Exhausted`, never an error.
    pub async fn advance(&mut self) -> bool {
        if self.cursor == Cursor::Exhausted {
            return false;
        }

        match self.try_advance().await {
            Ok(true) => true,
            Ok(false) => {
                tracing::debug!("No further result pages");
                self.cursor = Cursor::Exhausted;
                false
            }
            Err(e) => {
                tracing::warn!("Pagination advance failed, treating as exhausted: {}", e);
                self.cursor = Cursor::Exhausted;
                false
            }
        }
    }

    async fn try_advance(&self) -> Result<bool, DriverError> {
        let controls = self.session.query_all(&self.next_selector).await?;
        let Some(control) = controls.first() else {
            return Ok(false);
        };

        let target = control.attr("href").await?;
        let target = match target {
            Some(href) => href,
            None => return Ok(false),
        };
        if target.trim().is_empty() || target.trim() == "#" {
            return Ok(false);
        }

        control.click().await?;
        self.session.wait_settled().await?;
        Ok(true)
    }
}
