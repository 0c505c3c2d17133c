use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Kind of row change carried by the realtime feed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "UPPERCASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// Which change kinds a subscription wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKindFilter {
    /// Wildcard: inserts, updates and deletes.
    All,
    Only(ChangeKind),
}

impl EventKindFilter {
    pub fn accepts(&self, kind: ChangeKind) -> bool {
        match self {
            EventKindFilter::All => true,
            EventKindFilter::Only(k) => *k == kind,
        }
    }
}

/// Table-scoped subscription filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventFilter {
    pub schema: String,
    pub table: String,
    pub event: EventKindFilter,
}

impl EventFilter {
    /// Wildcard filter for every change on `schema.table`.
    pub fn all(schema: &str, table: &str) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            event: EventKindFilter::All,
        }
    }

    pub fn matches(&self, change: &ChangeEvent) -> bool {
        self.schema == change.schema && self.table == change.table && self.event.accepts(change.kind)
    }
}

/// A decoded row-change notification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChangeEvent {
    pub schema: String,
    pub table: String,
    #[serde(rename = "eventType")]
    pub kind: ChangeKind,
    #[serde(default, rename = "new")]
    pub record: Option<Value>,
    #[serde(default, rename = "old")]
    pub old_record: Option<Value>,
}

impl ChangeEvent {
    pub fn new(schema: &str, table: &str, kind: ChangeKind) -> Self {
        Self {
            schema: schema.to_string(),
            table: table.to_string(),
            kind,
            record: None,
            old_record: None,
        }
    }
}

/// Handle for a realtime channel opened through the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChannelId(pub Uuid);

impl ChannelId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ChannelId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Handle for an auth-state listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub Uuid);

impl SubscriptionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
