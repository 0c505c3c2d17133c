//! Linkshelf: a personal bookmark manager client over a hosted Supabase backend.
//!
//! The controller (`app::BookmarkApp`) keeps the signed-in user's bookmark list
//! in sync through an auth listener and a realtime change feed. Hosts render
//! the published `types::view::View` and post user actions back.

pub mod app;
pub mod database;
pub mod managers;
pub mod platform;
pub mod services;
#[cfg(any(test, feature = "testing"))]
pub mod testing;
pub mod types;
