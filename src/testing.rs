//! In-memory backend for exercising the controller without a network.
//!
//! `FakeBackend` plays all three collaborator roles. It records every call,
//! scopes rows to the signed-in user the way row-level security would, and
//! lets tests push auth and realtime notifications or make requests fail.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use uuid::Uuid;

use crate::services::auth_service::{AuthCallback, AuthServiceTrait};
use crate::services::data_store::{DataStoreTrait, Filter, Order};
use crate::services::listener_registry::ListenerRegistry;
use crate::services::realtime_feed::{ChangeCallback, RealtimeFeedTrait, RealtimeHub};
use crate::types::errors::{AuthError, RealtimeError, StoreError};
use crate::types::realtime::{ChangeEvent, ChangeKind, ChannelId, EventFilter, SubscriptionId};
use crate::types::session::{AuthChange, AuthEvent, OAuthProvider, Session, SessionUser};

/// Builds a session for `user_id` with a throwaway token.
pub fn sample_session(user_id: &str) -> Session {
    Session {
        access_token: format!("token-{}", user_id),
        refresh_token: Some(format!("refresh-{}", user_id)),
        expires_at: None,
        token_type: "bearer".to_string(),
        user: SessionUser {
            id: user_id.to_string(),
            email: Some(format!("{}@example.com", user_id)),
        },
    }
}

/// Everything the backend was asked to do.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallLog {
    pub get_session: usize,
    pub selects: Vec<String>,
    pub inserts: Vec<(String, Vec<Value>)>,
    pub deletes: Vec<(String, Vec<Filter>)>,
    pub sign_ins: Vec<OAuthProvider>,
    pub sign_outs: usize,
    pub auth_opened: usize,
    pub auth_closed: usize,
    pub realtime_opened: usize,
    pub realtime_closed: usize,
}

/// Per-operation failure switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Failures {
    pub get_session: bool,
    pub select: bool,
    pub insert: bool,
    pub delete: bool,
    pub sign_in: bool,
    pub sign_out: bool,
    pub subscribe: bool,
}

pub struct FakeBackend {
    schema: String,
    session: Mutex<Option<Session>>,
    rows: Mutex<Vec<Value>>,
    listeners: ListenerRegistry<SubscriptionId, (), dyn Fn(AuthChange) + Send + Sync>,
    hub: RealtimeHub,
    calls: Mutex<CallLog>,
    failures: Mutex<Failures>,
    select_gate: Mutex<Option<Arc<Semaphore>>>,
    notify_on_write: Mutex<bool>,
    seq: AtomicU64,
}

impl Default for FakeBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            schema: "public".to_string(),
            session: Mutex::new(None),
            rows: Mutex::new(Vec::new()),
            listeners: ListenerRegistry::new(),
            hub: RealtimeHub::new(),
            calls: Mutex::new(CallLog::default()),
            failures: Mutex::new(Failures::default()),
            select_gate: Mutex::new(None),
            notify_on_write: Mutex::new(false),
            seq: AtomicU64::new(0),
        }
    }

    /// A backend that already holds a session for `user_id`.
    pub fn signed_in(user_id: &str) -> Self {
        let backend = Self::new();
        backend.set_session(Some(sample_session(user_id)));
        backend
    }

    /// Replaces the held session without notifying listeners.
    pub fn set_session(&self, session: Option<Session>) {
        if let Ok(mut current) = self.session.lock() {
            *current = session;
        }
    }

    pub fn current_session(&self) -> Option<Session> {
        self.session.lock().ok().and_then(|s| s.clone())
    }

    /// Replaces the held session and notifies every auth listener.
    pub fn emit_auth(&self, event: AuthEvent, session: Option<Session>) -> usize {
        self.set_session(session.clone());
        self.notify_auth(AuthChange::new(event, session))
    }

    /// Notifies auth listeners without touching the held session.
    pub fn notify_auth(&self, change: AuthChange) -> usize {
        let targets = self.listeners.matching(|_| true);
        for callback in &targets {
            callback(change.clone());
        }
        targets.len()
    }

    /// Pushes a change on `table` through the realtime hub.
    pub fn emit_change(&self, table: &str, kind: ChangeKind) -> usize {
        self.hub.dispatch(&ChangeEvent::new(&self.schema, table, kind))
    }

    /// When enabled, inserts and deletes also emit a realtime change.
    pub fn set_notify_on_write(&self, enabled: bool) {
        if let Ok(mut flag) = self.notify_on_write.lock() {
            *flag = enabled;
        }
    }

    pub fn set_failures(&self, failures: Failures) {
        if let Ok(mut current) = self.failures.lock() {
            *current = failures;
        }
    }

    /// Holds every subsequent select until permits are added to the returned
    /// semaphore. Rows are read before the select waits.
    pub fn gate_selects(&self) -> Arc<Semaphore> {
        let gate = Arc::new(Semaphore::new(0));
        if let Ok(mut current) = self.select_gate.lock() {
            *current = Some(Arc::clone(&gate));
        }
        gate
    }

    /// Stores a row owned by `user_id` and returns its id.
    pub fn seed_bookmark(&self, user_id: &str, title: &str, url: &str) -> String {
        let id = Uuid::new_v4().to_string();
        let row = json!({
            "id": id,
            "title": title,
            "url": url,
            "user_id": user_id,
            "created_at": self.next_timestamp(),
        });
        if let Ok(mut rows) = self.rows.lock() {
            rows.push(row);
        }
        id
    }

    /// All stored rows, regardless of owner.
    pub fn rows(&self) -> Vec<Value> {
        self.rows.lock().map(|r| r.clone()).unwrap_or_default()
    }

    pub fn calls(&self) -> CallLog {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    pub fn open_channels(&self) -> usize {
        self.hub.channel_count()
    }

    pub fn auth_listener_count(&self) -> usize {
        self.listeners.len()
    }

    fn record(&self, f: impl FnOnce(&mut CallLog)) {
        if let Ok(mut calls) = self.calls.lock() {
            f(&mut calls);
        }
    }

    fn failures(&self) -> Failures {
        self.failures.lock().map(|f| *f).unwrap_or_default()
    }

    fn current_user(&self) -> Option<String> {
        self.current_session().map(|s| s.user.id)
    }

    fn next_timestamp(&self) -> String {
        let n = self.seq.fetch_add(1, Ordering::SeqCst);
        format!("2025-01-01T{:02}:{:02}:{:02}+00:00", n / 3600, (n / 60) % 60, n % 60)
    }

    fn notify_write(&self, table: &str, kind: ChangeKind) {
        let enabled = self.notify_on_write.lock().map(|f| *f).unwrap_or(false);
        if enabled {
            self.emit_change(table, kind);
        }
    }

    fn visible_rows(&self, filters: &[Filter], order: Option<&Order>) -> Vec<Value> {
        let Some(user) = self.current_user() else {
            return Vec::new();
        };
        let mut rows: Vec<Value> = self
            .rows()
            .into_iter()
            .filter(|row| row.get("user_id").and_then(Value::as_str) == Some(user.as_str()))
            .filter(|row| filters.iter().all(|f| f.matches(row)))
            .collect();
        if let Some(order) = order {
            rows.sort_by(|a, b| {
                let a = a.get(&order.column).and_then(Value::as_str).unwrap_or_default();
                let b = b.get(&order.column).and_then(Value::as_str).unwrap_or_default();
                if order.ascending {
                    a.cmp(b)
                } else {
                    b.cmp(a)
                }
            });
        }
        rows
    }
}

#[async_trait]
impl AuthServiceTrait for FakeBackend {
    async fn get_current_session(&self) -> Result<Option<Session>, AuthError> {
        self.record(|c| c.get_session += 1);
        if self.failures().get_session {
            return Err(AuthError::NetworkError("session lookup failed".to_string()));
        }
        Ok(self.current_session())
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> Result<SubscriptionId, AuthError> {
        let id = SubscriptionId::new();
        self.listeners.insert(id, (), callback);
        self.record(|c| c.auth_opened += 1);
        Ok(id)
    }

    fn remove_auth_listener(&self, id: SubscriptionId) {
        if self.listeners.remove(id) {
            self.record(|c| c.auth_closed += 1);
        }
    }

    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<String, AuthError> {
        self.record(|c| c.sign_ins.push(provider));
        if self.failures().sign_in {
            return Err(AuthError::Rejected("provider disabled".to_string()));
        }
        Ok(format!("https://auth.example.test/authorize?provider={}", provider.as_str()))
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        self.record(|c| c.sign_outs += 1);
        if self.failures().sign_out {
            return Err(AuthError::NetworkError("logout unreachable".to_string()));
        }
        self.emit_auth(AuthEvent::SignedOut, None);
        Ok(())
    }
}

#[async_trait]
impl DataStoreTrait for FakeBackend {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> Result<Vec<Value>, StoreError> {
        self.record(|c| c.selects.push(table.to_string()));
        let fail = self.failures().select;
        let rows = self.visible_rows(filters, order);

        let gate = self.select_gate.lock().ok().and_then(|g| g.clone());
        if let Some(gate) = gate {
            if let Ok(permit) = gate.acquire().await {
                permit.forget();
            }
        }

        if fail {
            return Err(StoreError::RequestFailed {
                status: 503,
                message: "store unavailable".to_string(),
            });
        }
        Ok(rows)
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<(), StoreError> {
        self.record(|c| c.inserts.push((table.to_string(), rows.clone())));
        if self.failures().insert {
            return Err(StoreError::RequestFailed {
                status: 403,
                message: "insert rejected".to_string(),
            });
        }
        let stored: Vec<Value> = rows
            .into_iter()
            .map(|mut row| {
                if let Value::Object(ref mut fields) = row {
                    fields.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
                    fields.insert("created_at".to_string(), Value::String(self.next_timestamp()));
                }
                row
            })
            .collect();
        if let Ok(mut current) = self.rows.lock() {
            current.extend(stored);
        }
        self.notify_write(table, ChangeKind::Insert);
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), StoreError> {
        self.record(|c| c.deletes.push((table.to_string(), filters.to_vec())));
        if self.failures().delete {
            return Err(StoreError::NetworkError("connection reset".to_string()));
        }
        let user = self.current_user();
        if let Ok(mut current) = self.rows.lock() {
            current.retain(|row| {
                let owned = row.get("user_id").and_then(Value::as_str) == user.as_deref();
                !(owned && filters.iter().all(|f| f.matches(row)))
            });
        }
        self.notify_write(table, ChangeKind::Delete);
        Ok(())
    }
}

impl RealtimeFeedTrait for FakeBackend {
    fn subscribe(
        &self,
        filter: EventFilter,
        callback: ChangeCallback,
    ) -> Result<ChannelId, RealtimeError> {
        if self.failures().subscribe {
            return Err(RealtimeError::SubscribeFailed("channel refused".to_string()));
        }
        let id = self.hub.subscribe(filter, callback)?;
        self.record(|c| c.realtime_opened += 1);
        Ok(id)
    }

    fn unsubscribe(&self, channel: ChannelId) -> Result<(), RealtimeError> {
        self.hub.unsubscribe(channel)?;
        self.record(|c| c.realtime_closed += 1);
        Ok(())
    }
}
