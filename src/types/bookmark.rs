use serde::{Deserialize, Serialize};

/// A bookmark row as returned by the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bookmark {
    pub id: String,
    pub title: String,
    pub url: String,
    /// RFC 3339 timestamp assigned by the store.
    pub created_at: String,
    /// Owning user. Set by the store on insert; some projections omit it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
}

/// Insert payload for a new bookmark.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewBookmark {
    pub title: String,
    pub url: String,
    pub user_id: String,
}
