use std::fmt;

use serde::Serialize;

/// Rendered output of the bookmark page.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum View {
    /// No session: only the sign-in control.
    SignedOut {
        sign_in_label: String,
        /// Authorization URL the host should open, once sign-in has started.
        redirect_url: Option<String>,
        status: Option<StatusMessage>,
    },
    SignedIn {
        heading: String,
        user_email: Option<String>,
        form: FormView,
        rows: Vec<BookmarkRow>,
        status: Option<StatusMessage>,
    },
}

impl View {
    pub fn is_signed_in(&self) -> bool {
        matches!(self, View::SignedIn { .. })
    }

    /// Bookmark rows, empty when signed out.
    pub fn rows(&self) -> &[BookmarkRow] {
        match self {
            View::SignedIn { rows, .. } => rows,
            View::SignedOut { .. } => &[],
        }
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        match self {
            View::SignedOut { status, .. } | View::SignedIn { status, .. } => status.as_ref(),
        }
    }
}

/// Current contents of the add-bookmark form.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct FormView {
    pub title: String,
    pub url: String,
    pub can_submit: bool,
}

/// One rendered bookmark entry with its delete action target.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookmarkRow {
    pub id: String,
    pub title: String,
    pub url: String,
    pub created_at: String,
}

/// Non-blocking notice shown above the list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusMessage {
    pub level: StatusLevel,
    pub text: String,
}

impl StatusMessage {
    pub fn error(text: impl Into<String>) -> Self {
        Self { level: StatusLevel::Error, text: text.into() }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusLevel {
    Error,
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            View::SignedOut { sign_in_label, redirect_url, status } => {
                if let Some(s) = status {
                    writeln!(f, "! {}", s.text)?;
                }
                write!(f, "[ {} ]", sign_in_label)?;
                if let Some(url) = redirect_url {
                    write!(f, "\n-> {}", url)?;
                }
                Ok(())
            }
            View::SignedIn { heading, user_email, form, rows, status } => {
                write!(f, "{}", heading)?;
                if let Some(email) = user_email {
                    write!(f, " ({})", email)?;
                }
                writeln!(f, "  [ Logout ]")?;
                if let Some(s) = status {
                    writeln!(f, "! {}", s.text)?;
                }
                writeln!(f, "Title: [{}]  URL: [{}]  [ Add ]", form.title, form.url)?;
                for row in rows {
                    writeln!(f, "- {} <{}>  [ Delete ]", row.title, row.url)?;
                }
                Ok(())
            }
        }
    }
}
