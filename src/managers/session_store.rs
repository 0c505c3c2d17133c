//! Session Store for Linkshelf.
//!
//! Holds the current auth session. Every value received from the auth
//! service replaces the stored one wholesale; `replace` reports which
//! lifecycle transition that replacement amounts to.

use crate::types::session::Session;

/// What a session replacement means for the rest of the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTransition {
    /// Nothing observable changed.
    Unchanged,
    /// Absent to present.
    SignedIn,
    /// Present to absent.
    SignedOut,
    /// Same user, new tokens.
    Refreshed,
    /// Present to present for a different user.
    UserSwitched,
}

impl SessionTransition {
    /// True when the realtime feed must be closed.
    pub fn leaves_authenticated(&self) -> bool {
        matches!(self, SessionTransition::SignedOut | SessionTransition::UserSwitched)
    }

    /// True when the initial fetch and realtime feed must be started.
    pub fn enters_authenticated(&self) -> bool {
        matches!(self, SessionTransition::SignedIn | SessionTransition::UserSwitched)
    }
}

#[derive(Debug, Default)]
pub struct SessionStore {
    current: Option<Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<&Session> {
        self.current.as_ref()
    }

    pub fn user_id(&self) -> Option<&str> {
        self.current.as_ref().map(|s| s.user_id())
    }

    pub fn is_signed_in(&self) -> bool {
        self.current.is_some()
    }

    /// Replaces the stored session with `next`.
    pub fn replace(&mut self, next: Option<Session>) -> SessionTransition {
        let transition = match (&self.current, &next) {
            (None, None) => SessionTransition::Unchanged,
            (None, Some(_)) => SessionTransition::SignedIn,
            (Some(_), None) => SessionTransition::SignedOut,
            (Some(old), Some(new)) if old.user_id() != new.user_id() => {
                SessionTransition::UserSwitched
            }
            (Some(old), Some(new)) if old == new => SessionTransition::Unchanged,
            (Some(_), Some(_)) => SessionTransition::Refreshed,
        };
        self.current = next;
        transition
    }
}
