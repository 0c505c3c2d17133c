//! Unit tests for the BookmarkViewModel: read-all fetch, ordering and
//! failure handling against the in-memory backend.

use linkshelf::managers::bookmark_view_model::BookmarkViewModel;
use linkshelf::services::data_store::{DataStoreTrait, Order};
use linkshelf::testing::{FakeBackend, Failures};
use linkshelf::types::errors::StoreError;
use serde_json::json;

const TABLE: &str = "bookmarks";

#[tokio::test]
async fn test_refresh_orders_newest_first() {
    let backend = FakeBackend::signed_in("u1");
    backend.seed_bookmark("u1", "First", "https://one.example");
    backend.seed_bookmark("u1", "Second", "https://two.example");
    backend.seed_bookmark("u1", "Third", "https://three.example");

    let mut vm = BookmarkViewModel::new();
    assert!(vm.refresh(&backend, TABLE).await.is_none());

    let titles: Vec<&str> = vm.bookmarks().iter().map(|b| b.title.as_str()).collect();
    assert_eq!(titles, vec!["Third", "Second", "First"]);
    assert!(vm
        .bookmarks()
        .windows(2)
        .all(|w| w[0].created_at >= w[1].created_at));
}

#[tokio::test]
async fn test_refresh_issues_one_ordered_select() {
    let backend = FakeBackend::signed_in("u1");
    let mut vm = BookmarkViewModel::new();
    vm.refresh(&backend, TABLE).await;

    assert_eq!(backend.calls().selects, vec![TABLE.to_string()]);
    assert_eq!(Order::desc("created_at").to_string(), "created_at.desc");
}

#[tokio::test]
async fn test_refresh_only_sees_own_rows() {
    let backend = FakeBackend::signed_in("u1");
    backend.seed_bookmark("u1", "Mine", "https://mine.example");
    backend.seed_bookmark("u2", "Theirs", "https://theirs.example");

    let mut vm = BookmarkViewModel::new();
    vm.refresh(&backend, TABLE).await;

    assert_eq!(vm.bookmarks().len(), 1);
    assert_eq!(vm.bookmarks()[0].title, "Mine");
}

#[tokio::test]
async fn test_refresh_is_idempotent() {
    let backend = FakeBackend::signed_in("u1");
    backend.seed_bookmark("u1", "Only", "https://only.example");

    let mut vm = BookmarkViewModel::new();
    vm.refresh(&backend, TABLE).await;
    let first = vm.bookmarks().to_vec();
    vm.refresh(&backend, TABLE).await;

    assert_eq!(vm.bookmarks(), first.as_slice());
    assert_eq!(vm.refresh_count(), 2);
}

#[tokio::test]
async fn test_failed_fetch_leaves_empty_list() {
    let backend = FakeBackend::signed_in("u1");
    backend.seed_bookmark("u1", "Hidden", "https://hidden.example");

    let mut vm = BookmarkViewModel::new();
    vm.refresh(&backend, TABLE).await;
    assert_eq!(vm.bookmarks().len(), 1);

    backend.set_failures(Failures { select: true, ..Failures::default() });
    let err = vm.refresh(&backend, TABLE).await;

    assert!(matches!(err, Some(StoreError::RequestFailed { status: 503, .. })));
    assert!(vm.bookmarks().is_empty());
}

#[tokio::test]
async fn test_undecodable_rows_leave_empty_list() {
    let backend = FakeBackend::signed_in("u1");
    // Missing `url`: the row is stored but cannot be decoded.
    backend
        .insert(TABLE, vec![json!({"title": "broken", "user_id": "u1"})])
        .await
        .unwrap();

    let mut vm = BookmarkViewModel::new();
    let err = vm.refresh(&backend, TABLE).await;

    assert!(matches!(err, Some(StoreError::DecodeError(_))));
    assert!(vm.bookmarks().is_empty());
}

#[tokio::test]
async fn test_signed_out_fetch_is_empty() {
    let backend = FakeBackend::new();
    backend.seed_bookmark("u1", "Private", "https://private.example");

    let mut vm = BookmarkViewModel::new();
    assert!(vm.refresh(&backend, TABLE).await.is_none());
    assert!(vm.bookmarks().is_empty());
}
