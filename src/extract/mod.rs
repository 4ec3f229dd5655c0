//! Selector-driven extraction from result and detail pages
//!
//! Both extractors are best-effort collaborators of the crawl core: the
//! list extractor drops listings it cannot read, and the field extractor
//! reads each contact field independently so one unreadable field never
//! spoils the rest of the record.

use crate::config::FieldSelectors;
use crate::driver::{PageElement, PageSession};
use crate::record::{ContactFields, EmailRead, ListingRef};

/// Reads the ordered (name, link) pairs from a loaded result page
pub struct ListExtractor {
    listing_selector: String,
}

impl ListExtractor {
    pub fn new(listing_selector: &str) -> Self {
        Self {
            listing_selector: listing_selector.to_string(),
        }
    }

    /// Returns the listings visible on the session's current page
    ///
    /// A listing whose name or link cannot be read is dropped here, before
    /// any fetch is attempted. A page with no matching elements yields an
    /// empty list, not an error.
    pub async fn listings(&self, session: &dyn PageSession) -> Vec<ListingRef> {
        let elements = match session.query_all(&self.listing_selector).await {
            Ok(elements) => elements,
            Err(e) => {
                tracing::debug!("Listing query failed: {}", e);
                return Vec::new();
            }
        };

        let mut listings = Vec::with_capacity(elements.len());
        for element in &elements {
            match read_listing(element.as_ref()).await {
                Some(listing) => listings.push(listing),
                None => tracing::debug!("Dropping listing with unreadable name or link"),
            }
        }
        listings
    }
}

/// Reads one listing's display name and relative link
async fn read_listing(element: &dyn PageElement) -> Option<ListingRef> {
    let name = element.text().await.ok()??;
    let link = element.attr("href").await.ok()??;

    let name = name.trim().to_string();
    if name.is_empty() || link.is_empty() {
        return None;
    }

    Some(ListingRef { name, link })
}

/// Reads the structured contact fields from a loaded detail page
pub struct FieldExtractor {
    selectors: FieldSelectors,
}

impl FieldExtractor {
    pub fn new(selectors: FieldSelectors) -> Self {
        Self { selectors }
    }

    /// Best-effort read of every contact field
    ///
    /// Each field is read independently; a failed read leaves that field
    /// absent and never fails the whole extraction.
    pub async fn extract(&self, session: &dyn PageSession) -> ContactFields {
        ContactFields {
            address: first_text(session, &self.selectors.address).await,
            city: first_text(session, &self.selectors.city).await,
            state: first_text(session, &self.selectors.state).await,
            phones: all_texts(session, &self.selectors.phone).await,
            website: first_text(session, &self.selectors.website).await,
            email: Some(read_email(session, &self.selectors.email_link).await),
        }
    }
}

/// Trimmed text of the first element matching `selector`, if readable
async fn first_text(session: &dyn PageSession, selector: &str) -> Option<String> {
    let elements = session.query_all(selector).await.ok()?;
    let text = elements.first()?.text().await.ok()??;
    let text = text.trim().to_string();
    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

/// Texts of every element matching `selector`; unreadable entries skipped
async fn all_texts(session: &dyn PageSession, selector: &str) -> Vec<String> {
    let elements = match session.query_all(selector).await {
        Ok(elements) => elements,
        Err(_) => return Vec::new(),
    };

    let mut texts = Vec::with_capacity(elements.len());
    for element in &elements {
        if let Ok(Some(text)) = element.text().await {
            if !text.trim().is_empty() {
                texts.push(text);
            }
        }
    }
    texts
}

/// Reads the email field, distinguishing an absent mail link from a failed read
async fn read_email(session: &dyn PageSession, selector: &str) -> EmailRead {
    let elements = match session.query_all(selector).await {
        Ok(elements) => elements,
        Err(_) => return EmailRead::Unreadable,
    };

    let Some(element) = elements.first() else {
        return EmailRead::NoMailLink;
    };

    // Prefer the mailto target; fall back to the link's text.
    match element.attr("href").await {
        Ok(Some(href)) => {
            let address = href.strip_prefix("mailto:").unwrap_or(&href).to_string();
            EmailRead::Address(address)
        }
        Ok(None) => match element.text().await {
            Ok(Some(text)) => EmailRead::Address(text.trim().to_string()),
            _ => EmailRead::Unreadable,
        },
        Err(_) => EmailRead::Unreadable,
    }
}
