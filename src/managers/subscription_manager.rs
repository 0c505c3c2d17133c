//! Subscription Manager for Linkshelf.
//!
//! Owns the two standing subscriptions: the auth-state listener and the
//! realtime channel on the bookmarks table. At most one of each is open at a
//! time; opening a new one first releases the old. Whatever is still held
//! when the manager is dropped is released then.

use std::sync::Arc;

use crate::services::auth_service::{AuthCallback, AuthServiceTrait};
use crate::services::realtime_feed::{ChangeCallback, RealtimeFeedTrait};
use crate::types::errors::{AuthError, RealtimeError};
use crate::types::realtime::{ChannelId, EventFilter, SubscriptionId};

/// Open/close tallies, for diagnostics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SubscriptionStats {
    pub auth_opened: u64,
    pub auth_closed: u64,
    pub realtime_opened: u64,
    pub realtime_closed: u64,
}

impl SubscriptionStats {
    pub fn active_realtime(&self) -> u64 {
        self.realtime_opened - self.realtime_closed
    }

    pub fn active_auth(&self) -> u64 {
        self.auth_opened - self.auth_closed
    }
}

pub struct SubscriptionManager {
    auth: Arc<dyn AuthServiceTrait>,
    realtime: Arc<dyn RealtimeFeedTrait>,
    auth_listener: Option<SubscriptionId>,
    channel: Option<ChannelId>,
    stats: SubscriptionStats,
}

impl SubscriptionManager {
    pub fn new(auth: Arc<dyn AuthServiceTrait>, realtime: Arc<dyn RealtimeFeedTrait>) -> Self {
        Self {
            auth,
            realtime,
            auth_listener: None,
            channel: None,
            stats: SubscriptionStats::default(),
        }
    }

    /// Installs the auth-state listener, replacing any previous one.
    pub fn open_auth(&mut self, callback: AuthCallback) -> Result<SubscriptionId, AuthError> {
        self.close_auth();
        let id = self.auth.on_auth_state_change(callback)?;
        self.auth_listener = Some(id);
        self.stats.auth_opened += 1;
        tracing::debug!(listener = %id, "auth listener installed");
        Ok(id)
    }

    pub fn close_auth(&mut self) {
        if let Some(id) = self.auth_listener.take() {
            self.auth.remove_auth_listener(id);
            self.stats.auth_closed += 1;
            tracing::debug!(listener = %id, "auth listener removed");
        }
    }

    /// Opens the realtime channel, closing any open one first.
    pub fn open_realtime(
        &mut self,
        filter: EventFilter,
        callback: ChangeCallback,
    ) -> Result<ChannelId, RealtimeError> {
        self.close_realtime();
        let id = self.realtime.subscribe(filter, callback)?;
        self.channel = Some(id);
        self.stats.realtime_opened += 1;
        Ok(id)
    }

    pub fn close_realtime(&mut self) {
        if let Some(id) = self.channel.take() {
            // The handle is dropped even when the feed no longer knows it.
            if let Err(e) = self.realtime.unsubscribe(id) {
                tracing::warn!(channel = %id, error = %e, "realtime unsubscribe failed");
            }
            self.stats.realtime_closed += 1;
        }
    }

    /// Releases both subscriptions.
    pub fn release_all(&mut self) {
        self.close_realtime();
        self.close_auth();
    }

    pub fn has_auth_listener(&self) -> bool {
        self.auth_listener.is_some()
    }

    pub fn has_realtime(&self) -> bool {
        self.channel.is_some()
    }

    pub fn channel(&self) -> Option<ChannelId> {
        self.channel
    }

    pub fn stats(&self) -> SubscriptionStats {
        self.stats
    }
}

impl Drop for SubscriptionManager {
    fn drop(&mut self) {
        self.release_all();
    }
}
