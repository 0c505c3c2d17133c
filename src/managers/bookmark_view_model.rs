//! Bookmark View-Model for Linkshelf.
//!
//! Holds the ordered bookmark list. A refresh is one read-all select ordered
//! by `created_at` descending whose result replaces the whole list; a failed
//! or undecodable fetch leaves an empty list.

use serde_json::Value;

use crate::services::data_store::{DataStoreTrait, Order};
use crate::types::bookmark::Bookmark;
use crate::types::errors::StoreError;

/// Column the list is ordered by.
pub const ORDER_COLUMN: &str = "created_at";

#[derive(Debug, Default)]
pub struct BookmarkViewModel {
    bookmarks: Vec<Bookmark>,
    refresh_count: u64,
}

impl BookmarkViewModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        &self.bookmarks
    }

    /// Number of fetch results applied so far.
    pub fn refresh_count(&self) -> u64 {
        self.refresh_count
    }

    /// Runs the read-all query against `table`.
    pub async fn fetch(store: &dyn DataStoreTrait, table: &str) -> Result<Vec<Bookmark>, StoreError> {
        let rows = store.select(table, &[], Some(&Order::desc(ORDER_COLUMN))).await?;
        decode_rows(rows)
    }

    /// Replaces the list with a fetch result. Failures yield an empty list
    /// and are handed back for reporting.
    pub fn apply_fetch(&mut self, result: Result<Vec<Bookmark>, StoreError>) -> Option<StoreError> {
        self.refresh_count += 1;
        match result {
            Ok(bookmarks) => {
                self.bookmarks = bookmarks;
                None
            }
            Err(e) => {
                tracing::warn!(error = %e, "bookmark fetch failed, showing empty list");
                self.bookmarks.clear();
                Some(e)
            }
        }
    }

    /// Fetches and applies in one step.
    pub async fn refresh(&mut self, store: &dyn DataStoreTrait, table: &str) -> Option<StoreError> {
        let result = Self::fetch(store, table).await;
        self.apply_fetch(result)
    }

    /// Drops the list, e.g. when the session ends.
    pub fn clear(&mut self) {
        self.bookmarks.clear();
    }
}

/// Decodes store rows into bookmarks. One bad row fails the whole batch.
pub fn decode_rows(rows: Vec<Value>) -> Result<Vec<Bookmark>, StoreError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(|e| StoreError::DecodeError(e.to_string())))
        .collect()
}
