// Linkshelf state managers
// Managers hold client-side state: the session, the bookmark list, and the standing subscriptions.

pub mod bookmark_view_model;
pub mod session_store;
pub mod subscription_manager;
