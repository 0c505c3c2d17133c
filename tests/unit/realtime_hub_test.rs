//! Unit tests for the RealtimeHub channel registry and change fan-out.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use linkshelf::services::realtime_feed::{ChangeCallback, RealtimeFeedTrait, RealtimeHub};
use linkshelf::types::errors::RealtimeError;
use linkshelf::types::realtime::{ChangeEvent, ChangeKind, ChannelId, EventFilter, EventKindFilter};
use rstest::rstest;

fn counter() -> (Arc<AtomicUsize>, ChangeCallback) {
    let hits = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&hits);
    let callback: ChangeCallback = Arc::new(move |_: &ChangeEvent| {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    (hits, callback)
}

#[test]
fn test_dispatch_reaches_matching_channel() {
    let hub = RealtimeHub::new();
    let (hits, callback) = counter();
    hub.subscribe(EventFilter::all("public", "bookmarks"), callback).unwrap();

    let delivered = hub.dispatch(&ChangeEvent::new("public", "bookmarks", ChangeKind::Insert));

    assert_eq!(delivered, 1);
    assert_eq!(hits.load(Ordering::SeqCst), 1);
}

#[rstest]
#[case("public", "notes", ChangeKind::Insert)]
#[case("private", "bookmarks", ChangeKind::Delete)]
fn test_dispatch_skips_other_tables(
    #[case] schema: &str,
    #[case] table: &str,
    #[case] kind: ChangeKind,
) {
    let hub = RealtimeHub::new();
    let (hits, callback) = counter();
    hub.subscribe(EventFilter::all("public", "bookmarks"), callback).unwrap();

    assert_eq!(hub.dispatch(&ChangeEvent::new(schema, table, kind)), 0);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[rstest]
#[case(ChangeKind::Insert, true)]
#[case(ChangeKind::Update, false)]
#[case(ChangeKind::Delete, false)]
fn test_kind_filter(#[case] kind: ChangeKind, #[case] expected: bool) {
    let hub = RealtimeHub::new();
    let (hits, callback) = counter();
    let filter = EventFilter {
        event: EventKindFilter::Only(ChangeKind::Insert),
        ..EventFilter::all("public", "bookmarks")
    };
    hub.subscribe(filter, callback).unwrap();

    hub.dispatch(&ChangeEvent::new("public", "bookmarks", kind));
    assert_eq!(hits.load(Ordering::SeqCst) == 1, expected);
}

#[test]
fn test_unsubscribe_stops_delivery() {
    let hub = RealtimeHub::new();
    let (hits, callback) = counter();
    let id = hub.subscribe(EventFilter::all("public", "bookmarks"), callback).unwrap();
    assert!(hub.is_open(id));

    hub.unsubscribe(id).unwrap();
    hub.dispatch(&ChangeEvent::new("public", "bookmarks", ChangeKind::Update));

    assert!(!hub.is_open(id));
    assert_eq!(hub.channel_count(), 0);
    assert_eq!(hits.load(Ordering::SeqCst), 0);
}

#[test]
fn test_unsubscribe_unknown_channel_fails() {
    let hub = RealtimeHub::new();
    assert!(matches!(
        hub.unsubscribe(ChannelId::new()),
        Err(RealtimeError::ChannelNotFound(_))
    ));
}

#[test]
fn test_subscribe_rejects_empty_table() {
    let hub = RealtimeHub::new();
    let (_, callback) = counter();
    assert!(matches!(
        hub.subscribe(EventFilter::all("public", ""), callback),
        Err(RealtimeError::SubscribeFailed(_))
    ));
}

/// A callback may close its own channel while being dispatched.
#[test]
fn test_callback_may_unsubscribe_reentrantly() {
    let hub = Arc::new(RealtimeHub::new());
    let slot: Arc<std::sync::Mutex<Option<ChannelId>>> = Arc::new(std::sync::Mutex::new(None));

    let hub_ref = Arc::clone(&hub);
    let slot_ref = Arc::clone(&slot);
    let callback: ChangeCallback = Arc::new(move |_: &ChangeEvent| {
        if let Some(id) = slot_ref.lock().unwrap().take() {
            hub_ref.unsubscribe(id).unwrap();
        }
    });
    let id = hub.subscribe(EventFilter::all("public", "bookmarks"), callback).unwrap();
    *slot.lock().unwrap() = Some(id);

    assert_eq!(hub.dispatch(&ChangeEvent::new("public", "bookmarks", ChangeKind::Delete)), 1);
    assert_eq!(hub.channel_count(), 0);
}

#[test]
fn test_change_event_decodes_wire_payload() {
    let payload = serde_json::json!({
        "schema": "public",
        "table": "bookmarks",
        "eventType": "DELETE",
        "new": {},
        "old": {"id": "b1"}
    });
    let change: ChangeEvent = serde_json::from_value(payload).unwrap();
    assert_eq!(change.kind, ChangeKind::Delete);
    assert_eq!(change.old_record.unwrap()["id"], "b1");
}
