// Linkshelf services
// Services provide the collaborator interfaces and their adapters, plus crypto, session persistence and settings.

pub mod auth_service;
pub mod crypto_service;
pub mod data_store;
pub mod listener_registry;
pub mod realtime_feed;
pub mod session_vault;
pub mod settings_engine;
pub mod supabase_client;
