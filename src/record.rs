//! Record types for listings and persisted company rows
//!
//! `ListingRef` lives only for the duration of one result page's processing;
//! `CompanyRecord` is the unit of persistence and becomes immutable once
//! appended to the store.

use serde::Serialize;

/// Sentinel written to the email field when the detail page has no mail link
///
/// Distinct from a failed email read, which leaves the field absent.
pub const EMAIL_MISSING_SENTINEL: &str = "NIL";

/// One entry of a paginated search-result list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingRef {
    /// Display name of the listed entity
    pub name: String,

    /// Site-relative path to the entity's detail page
    pub link: String,
}

/// Outcome of reading the email field from a detail page
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmailRead {
    /// A mail-link element was present and readable
    Address(String),

    /// No mail-link element exists on the page
    NoMailLink,

    /// The read itself failed
    Unreadable,
}

impl EmailRead {
    /// Maps the read outcome to the persisted field value
    pub fn into_field(self) -> Option<String> {
        match self {
            Self::Address(addr) => Some(addr),
            Self::NoMailLink => Some(EMAIL_MISSING_SENTINEL.to_string()),
            Self::Unreadable => None,
        }
    }
}

/// Best-effort contact fields read from one detail page
///
/// Every field is independently optional; a missing or unreadable field
/// never fails the record.
#[derive(Debug, Clone, Default)]
pub struct ContactFields {
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phones: Vec<String>,
    pub website: Option<String>,
    pub email: Option<EmailRead>,
}

/// One persisted company row
#[derive(Debug, Clone, Serialize)]
pub struct CompanyRecord {
    pub category: String,
    pub company_name: String,
    pub source_url: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub phone: Option<String>,
    pub website: Option<String>,
    pub email: Option<String>,

    /// ISO-8601 UTC timestamp, stamped when the record is finalized
    pub last_checked: String,

    /// Present only when the detail fetch failed
    pub error: Option<String>,
}

impl CompanyRecord {
    /// Builds a successful record from extracted contact fields
    ///
    /// `last_checked` is left empty here; the fan-out coordinator stamps it
    /// when the record is finalized.
    pub fn from_fields(
        category: &str,
        company_name: &str,
        source_url: String,
        fields: ContactFields,
    ) -> Self {
        Self {
            category: category.to_string(),
            company_name: company_name.to_string(),
            source_url,
            address: fields.address,
            city: fields.city,
            state: fields.state,
            phone: join_phones(&fields.phones),
            website: fields.website,
            email: fields.email.map(EmailRead::into_field).unwrap_or(None),
            last_checked: String::new(),
            error: None,
        }
    }

    /// Builds an error-annotated record for a failed detail fetch
    ///
    /// All structured fields are absent; `source_url` is reconstructed from
    /// the original relative link since navigation may not have completed.
    pub fn failed(category: &str, company_name: &str, source_url: String, error: String) -> Self {
        Self {
            category: category.to_string(),
            company_name: company_name.to_string(),
            source_url,
            address: None,
            city: None,
            state: None,
            phone: None,
            website: None,
            email: None,
            last_checked: String::new(),
            error: Some(error),
        }
    }

    /// The dedup identity key: the trimmed company name
    ///
    /// Deliberately does not include the category; a company listed under
    /// two categories persists only once, under whichever was crawled first.
    pub fn identity_key(&self) -> String {
        self.company_name.trim().to_string()
    }
}

/// Joins raw phone texts into the persisted phone field
///
/// Internal whitespace is stripped from each entry; multiple entries are
/// joined with `", "`; no entries yields `None`.
pub fn join_phones(phones: &[String]) -> Option<String> {
    if phones.is_empty() {
        return None;
    }

    let stripped: Vec<String> = phones
        .iter()
        .map(|p| p.chars().filter(|c| !c.is_whitespace()).collect())
        .collect();

    Some(stripped.join(", "))
}
