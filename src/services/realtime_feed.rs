//! Realtime feed collaborator interface and the in-process channel hub.
//!
//! The hub is the client half of the feed: it keeps the open channels and
//! hands each decoded change to every channel whose filter matches. Whatever
//! transport receives changes from the backend calls [`RealtimeHub::dispatch`].

use std::sync::Arc;

use crate::services::listener_registry::ListenerRegistry;
use crate::types::errors::RealtimeError;
use crate::types::realtime::{ChangeEvent, ChannelId, EventFilter};

/// Callback invoked for every matching change.
pub type ChangeCallback = Arc<dyn Fn(&ChangeEvent) + Send + Sync>;

/// Operations the client needs from the realtime feed.
pub trait RealtimeFeedTrait: Send + Sync {
    fn subscribe(
        &self,
        filter: EventFilter,
        callback: ChangeCallback,
    ) -> Result<ChannelId, RealtimeError>;

    fn unsubscribe(&self, channel: ChannelId) -> Result<(), RealtimeError>;
}

/// Channel registry and fan-out for realtime changes.
#[derive(Default)]
pub struct RealtimeHub {
    channels: ListenerRegistry<ChannelId, EventFilter, dyn Fn(&ChangeEvent) + Send + Sync>,
}

impl RealtimeHub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delivers `change` to every matching channel. Returns how many received it.
    pub fn dispatch(&self, change: &ChangeEvent) -> usize {
        let targets = self.channels.matching(|filter| filter.matches(change));
        for callback in &targets {
            callback(change);
        }
        tracing::trace!(
            table = %change.table,
            kind = ?change.kind,
            delivered = targets.len(),
            "realtime change dispatched"
        );
        targets.len()
    }

    /// Number of open channels.
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn is_open(&self, channel: ChannelId) -> bool {
        self.channels.contains(channel)
    }
}

impl RealtimeFeedTrait for RealtimeHub {
    fn subscribe(
        &self,
        filter: EventFilter,
        callback: ChangeCallback,
    ) -> Result<ChannelId, RealtimeError> {
        if filter.table.is_empty() {
            return Err(RealtimeError::SubscribeFailed(
                "table must not be empty".to_string(),
            ));
        }
        let id = ChannelId::new();
        tracing::debug!(channel = %id, schema = %filter.schema, table = %filter.table, "realtime channel opened");
        self.channels.insert(id, filter, callback);
        Ok(id)
    }

    fn unsubscribe(&self, channel: ChannelId) -> Result<(), RealtimeError> {
        if self.channels.remove(channel) {
            tracing::debug!(channel = %channel, "realtime channel closed");
            Ok(())
        } else {
            Err(RealtimeError::ChannelNotFound(channel.to_string()))
        }
    }
}
