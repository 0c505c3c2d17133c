// Linkshelf shared type definitions
// Each submodule defines types used across the client.

pub mod bookmark;
pub mod errors;
pub mod realtime;
pub mod sealed;
pub mod session;
pub mod settings;
pub mod view;
