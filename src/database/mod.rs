//! Local SQLite storage for the persisted auth session.
//!
//! ```no_run
//! use linkshelf::database::Database;
//!
//! let db = Database::open_in_memory().expect("failed to open in-memory database");
//! let conn = db.connection();
//! # let _ = conn;
//! ```

pub mod connection;
pub mod migrations;

pub use connection::Database;
