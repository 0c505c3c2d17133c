//! Property-based tests for realtime-driven refreshes.
//!
//! For any interleaving of backend writes, change notifications and settle
//! points while signed in, the list after settling equals one full fetch.

use std::sync::Arc;

use linkshelf::app::{AppOptions, BookmarkApp, Collaborators};
use linkshelf::managers::bookmark_view_model::BookmarkViewModel;
use linkshelf::services::data_store::{DataStoreTrait, Filter};
use linkshelf::testing::FakeBackend;
use linkshelf::types::bookmark::Bookmark;
use linkshelf::types::realtime::ChangeKind;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Step {
    Seed(String),
    RemoveOldest,
    Change(ChangeKind),
    Settle,
}

fn arb_kind() -> impl Strategy<Value = ChangeKind> {
    prop_oneof![
        Just(ChangeKind::Insert),
        Just(ChangeKind::Update),
        Just(ChangeKind::Delete),
    ]
}

fn arb_step() -> impl Strategy<Value = Step> {
    prop_oneof![
        "[a-zA-Z ]{1,12}".prop_map(Step::Seed),
        Just(Step::RemoveOldest),
        arb_kind().prop_map(Step::Change),
        Just(Step::Settle),
    ]
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("Failed to build runtime")
}

/// Runs `steps` and returns (list after settling, fresh fetch).
fn run_steps(steps: Vec<Step>) -> (Vec<Bookmark>, Vec<Bookmark>) {
    runtime().block_on(async move {
        let backend = Arc::new(FakeBackend::signed_in("u1"));
        let mut app = BookmarkApp::new(Collaborators::from_backend(backend.clone()), AppOptions::default());
        app.start().await;

        for step in steps {
            match step {
                Step::Seed(title) => {
                    backend.seed_bookmark("u1", &title, "https://example.com");
                }
                Step::RemoveOldest => {
                    let oldest = backend
                        .rows()
                        .first()
                        .and_then(|row| row["id"].as_str().map(str::to_string));
                    if let Some(id) = oldest {
                        backend
                            .delete("bookmarks", &[Filter::eq("id", &id)])
                            .await
                            .expect("fake delete succeeds");
                    }
                }
                Step::Change(kind) => {
                    backend.emit_change("bookmarks", kind);
                }
                Step::Settle => app.settle().await,
            }
        }
        backend.emit_change("bookmarks", ChangeKind::Update);
        app.settle().await;

        let expected = BookmarkViewModel::fetch(backend.as_ref(), "bookmarks")
            .await
            .expect("fake select succeeds");
        (app.bookmarks().to_vec(), expected)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(20))]

    #[test]
    fn settled_list_equals_full_refresh(steps in prop::collection::vec(arb_step(), 0..24)) {
        let (settled, expected) = run_steps(steps);
        prop_assert_eq!(settled, expected, "List after settling must equal one full fetch");
    }
}
