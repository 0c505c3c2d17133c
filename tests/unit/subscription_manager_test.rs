//! Unit tests for the SubscriptionManager: one auth listener and one realtime
//! channel at most, released on replacement and on drop.

use std::sync::Arc;

use linkshelf::managers::subscription_manager::SubscriptionManager;
use linkshelf::services::auth_service::AuthCallback;
use linkshelf::services::realtime_feed::ChangeCallback;
use linkshelf::testing::{FakeBackend, Failures};
use linkshelf::types::realtime::{ChangeEvent, EventFilter};
use linkshelf::types::session::AuthChange;

fn manager(backend: &Arc<FakeBackend>) -> SubscriptionManager {
    SubscriptionManager::new(backend.clone(), backend.clone())
}

fn noop_auth() -> AuthCallback {
    Arc::new(|_: AuthChange| {})
}

fn noop_change() -> ChangeCallback {
    Arc::new(|_: &ChangeEvent| {})
}

fn filter() -> EventFilter {
    EventFilter::all("public", "bookmarks")
}

#[test]
fn test_open_realtime_twice_keeps_one_channel() {
    let backend = Arc::new(FakeBackend::new());
    let mut subs = manager(&backend);

    let first = subs.open_realtime(filter(), noop_change()).unwrap();
    let second = subs.open_realtime(filter(), noop_change()).unwrap();

    assert_ne!(first, second);
    assert_eq!(subs.channel(), Some(second));
    assert_eq!(backend.open_channels(), 1);
    let stats = subs.stats();
    assert_eq!((stats.realtime_opened, stats.realtime_closed), (2, 1));
    assert_eq!(stats.active_realtime(), 1);
}

#[test]
fn test_close_realtime_is_idempotent() {
    let backend = Arc::new(FakeBackend::new());
    let mut subs = manager(&backend);
    subs.open_realtime(filter(), noop_change()).unwrap();

    subs.close_realtime();
    subs.close_realtime();

    assert!(!subs.has_realtime());
    assert_eq!(backend.calls().realtime_closed, 1);
    assert_eq!(subs.stats().active_realtime(), 0);
}

#[test]
fn test_open_auth_replaces_listener() {
    let backend = Arc::new(FakeBackend::new());
    let mut subs = manager(&backend);

    subs.open_auth(noop_auth()).unwrap();
    subs.open_auth(noop_auth()).unwrap();

    assert_eq!(backend.auth_listener_count(), 1);
    assert_eq!(subs.stats().active_auth(), 1);
}

#[test]
fn test_failed_subscribe_leaves_no_channel() {
    let backend = Arc::new(FakeBackend::new());
    backend.set_failures(Failures { subscribe: true, ..Failures::default() });
    let mut subs = manager(&backend);

    assert!(subs.open_realtime(filter(), noop_change()).is_err());
    assert!(!subs.has_realtime());
    assert_eq!(subs.stats().realtime_opened, 0);
}

#[test]
fn test_release_all_closes_both() {
    let backend = Arc::new(FakeBackend::new());
    let mut subs = manager(&backend);
    subs.open_auth(noop_auth()).unwrap();
    subs.open_realtime(filter(), noop_change()).unwrap();

    subs.release_all();

    assert!(!subs.has_auth_listener());
    assert!(!subs.has_realtime());
    assert_eq!(backend.open_channels(), 0);
    assert_eq!(backend.auth_listener_count(), 0);
}

#[test]
fn test_drop_releases_subscriptions() {
    let backend = Arc::new(FakeBackend::new());
    {
        let mut subs = manager(&backend);
        subs.open_auth(noop_auth()).unwrap();
        subs.open_realtime(filter(), noop_change()).unwrap();
        assert_eq!(backend.open_channels(), 1);
    }

    assert_eq!(backend.open_channels(), 0);
    assert_eq!(backend.auth_listener_count(), 0);
    let calls = backend.calls();
    assert_eq!((calls.realtime_opened, calls.realtime_closed), (1, 1));
    assert_eq!((calls.auth_opened, calls.auth_closed), (1, 1));
}
