use serde::{Deserialize, Serialize};

use super::session::OAuthProvider;

/// Top-level client settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct ClientSettings {
    pub backend: BackendSettings,
    pub auth: AuthSettings,
    pub bookmarks: BookmarkSettings,
}

/// Where the hosted backend lives.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackendSettings {
    /// Project URL, e.g. `https://abcd.supabase.co`.
    pub url: String,
    /// Public anon key sent as `apikey` on every request.
    pub anon_key: String,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            url: String::new(),
            anon_key: String::new(),
            timeout_secs: 15,
        }
    }
}

/// Sign-in behaviour.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthSettings {
    pub provider: OAuthProvider,
    /// Where the OAuth provider sends the browser back to.
    pub redirect_to: Option<String>,
    /// Keep the session across restarts in the local session vault.
    pub persist_session: bool,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            provider: OAuthProvider::Google,
            redirect_to: None,
            persist_session: true,
        }
    }
}

/// Where bookmark rows are read from and written to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BookmarkSettings {
    pub schema: String,
    pub table: String,
}

impl Default for BookmarkSettings {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            table: "bookmarks".to_string(),
        }
    }
}
