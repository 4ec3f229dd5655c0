//! Deduplicating append-only CSV store
//!
//! The persisted file is the system's only durable state: one quoted row per
//! company record under a fixed eleven-column schema. The header is written
//! exactly once at file creation and never rewritten; optional fields that
//! are absent serialize as empty strings so later batches can never drift
//! from the original column set. Legacy files without a header row are still
//! readable through a fixed-position fallback.

use crate::record::CompanyRecord;
use csv::{QuoteStyle, ReaderBuilder, WriterBuilder};
use std::collections::HashSet;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// The fixed column schema, in persisted order
///
/// `error` is always part of the header even when no record needs it; the
/// schema is independent of any single batch's content.
pub const SCHEMA: [&str; 11] = [
    "category",
    "company_name",
    "source_url",
    "address",
    "city",
    "state",
    "phone",
    "website",
    "email",
    "last_checked",
    "error",
];

/// Fallback column positions for legacy headerless files
const LEGACY_CATEGORY_COLUMN: usize = 0;
const LEGACY_COMPANY_NAME_COLUMN: usize = 1;

/// Errors that can occur during store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// CSV-backed deduplicating store
///
/// `append` is the only mutating operation; the file is opened in append
/// mode and never truncated or rewritten.
pub struct CsvStore {
    path: PathBuf,
}

impl CsvStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the identity keys of every persisted record
    ///
    /// Handles both a headered file (column located by name) and a legacy
    /// headerless file (fixed column position). A missing file yields an
    /// empty set.
    pub fn load_existing_keys(&self) -> StoreResult<HashSet<String>> {
        let mut keys = HashSet::new();

        let Some(rows) = self.read_rows()? else {
            return Ok(keys);
        };

        let name_column = rows
            .header_position("company_name")
            .unwrap_or(LEGACY_COMPANY_NAME_COLUMN);

        for row in rows.data_rows() {
            if let Some(name) = row.get(name_column) {
                let name = name.trim();
                if !name.is_empty() {
                    keys.insert(name.to_string());
                }
            }
        }

        Ok(keys)
    }

    /// Filters a batch down to records not yet persisted
    ///
    /// A record is dropped when its identity key already exists in the store
    /// or appeared earlier within the same batch; the first occurrence wins.
    pub fn filter_new(&self, batch: Vec<CompanyRecord>) -> StoreResult<Vec<CompanyRecord>> {
        let mut seen = self.load_existing_keys()?;

        let mut fresh = Vec::with_capacity(batch.len());
        for record in batch {
            let key = record.identity_key();
            if seen.insert(key) {
                fresh.push(record);
            }
        }

        Ok(fresh)
    }

    /// Appends a batch of records, creating the file with its header first
    /// if it does not exist yet
    ///
    /// An empty batch is a logged no-op; the file is not created or touched.
    pub fn append(&self, batch: &[CompanyRecord]) -> StoreResult<()> {
        if batch.is_empty() {
            tracing::info!("No new records to append, store untouched");
            return Ok(());
        }

        let file_exists = self.path.exists();
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        let mut writer = WriterBuilder::new()
            .quote_style(QuoteStyle::Always)
            .has_headers(false)
            .from_writer(file);

        if !file_exists {
            writer.write_record(SCHEMA)?;
        }

        for record in batch {
            writer.write_record(&[
                record.category.as_str(),
                record.company_name.as_str(),
                record.source_url.as_str(),
                opt_field(&record.address),
                opt_field(&record.city),
                opt_field(&record.state),
                opt_field(&record.phone),
                opt_field(&record.website),
                opt_field(&record.email),
                record.last_checked.as_str(),
                opt_field(&record.error),
            ])?;
        }

        writer.flush()?;
        tracing::info!("Appended {} records to {}", batch.len(), self.path.display());
        Ok(())
    }

    /// Resume gate: true iff any persisted row belongs to `category`
    ///
    /// The comparison is case-insensitive after trimming. Presence of any
    /// row counts; a category is all-or-nothing across runs.
    pub fn category_already_done(&self, category: &str) -> StoreResult<bool> {
        let Some(rows) = self.read_rows()? else {
            return Ok(false);
        };

        let category_column = rows
            .header_position("category")
            .unwrap_or(LEGACY_CATEGORY_COLUMN);

        let wanted = category.trim().to_lowercase();
        for row in rows.data_rows() {
            if let Some(value) = row.get(category_column) {
                if value.trim().to_lowercase() == wanted {
                    return Ok(true);
                }
            }
        }

        Ok(false)
    }

    /// Reads all rows of the file, or None when the file does not exist
    fn read_rows(&self) -> StoreResult<Option<StoreRows>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_path(&self.path)?;

        let mut rows = Vec::new();
        for result in reader.records() {
            rows.push(result?);
        }

        Ok(Some(StoreRows { rows }))
    }
}

/// All rows of the persisted file, header included when present
struct StoreRows {
    rows: Vec<csv::StringRecord>,
}

impl StoreRows {
    /// True when the first row is the schema header
    fn has_header(&self) -> bool {
        self.rows
            .first()
            .and_then(|row| row.get(0))
            .map(|first| first.trim() == SCHEMA[0])
            .unwrap_or(false)
    }

    /// Position of `column` in the header row, if a header exists
    fn header_position(&self, column: &str) -> Option<usize> {
        if !self.has_header() {
            return None;
        }
        self.rows
            .first()?
            .iter()
            .position(|field| field.trim() == column)
    }

    /// The data rows, skipping the header when present
    fn data_rows(&self) -> &[csv::StringRecord] {
        if self.has_header() {
            &self.rows[1..]
        } else {
            &self.rows
        }
    }
}

fn opt_field(value: &Option<String>) -> &str {
    value.as_deref().unwrap_or("")
}
