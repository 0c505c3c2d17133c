//! Data store collaborator interface.
//!
//! Rows travel as JSON objects; decoding into domain types happens in the
//! view-model so a bad row never reaches the store adapter's callers typed.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;

use crate::types::errors::StoreError;

/// Column filter. Only equality is needed by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Filter {
    Eq { column: String, value: String },
}

impl Filter {
    pub fn eq(column: &str, value: &str) -> Self {
        Filter::Eq {
            column: column.to_string(),
            value: value.to_string(),
        }
    }

    /// Returns true if `row` satisfies the filter.
    pub fn matches(&self, row: &Value) -> bool {
        match self {
            Filter::Eq { column, value } => match row.get(column) {
                Some(Value::String(s)) => s == value,
                Some(Value::Null) | None => false,
                Some(other) => other.to_string() == *value,
            },
        }
    }
}

/// Result ordering for `select`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub ascending: bool,
}

impl Order {
    pub fn desc(column: &str) -> Self {
        Self {
            column: column.to_string(),
            ascending: false,
        }
    }
}

impl fmt::Display for Order {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dir = if self.ascending { "asc" } else { "desc" };
        write!(f, "{}.{}", self.column, dir)
    }
}

/// Table operations the client needs from the data store.
///
/// Row visibility is the store's concern: `select` returns only what the
/// caller's session may see.
#[async_trait]
pub trait DataStoreTrait: Send + Sync {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> Result<Vec<Value>, StoreError>;

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<(), StoreError>;

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), StoreError>;
}
