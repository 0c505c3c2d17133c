//! Auth collaborator interface.

use std::sync::Arc;

use async_trait::async_trait;

use crate::types::errors::AuthError;
use crate::types::realtime::SubscriptionId;
use crate::types::session::{AuthChange, OAuthProvider, Session};

/// Listener invoked for every auth-state change.
pub type AuthCallback = Arc<dyn Fn(AuthChange) + Send + Sync>;

/// Operations the client needs from the authentication service.
#[async_trait]
pub trait AuthServiceTrait: Send + Sync {
    /// Returns the session the service currently holds, if any.
    async fn get_current_session(&self) -> Result<Option<Session>, AuthError>;

    /// Registers a standing auth-state listener.
    fn on_auth_state_change(&self, callback: AuthCallback) -> Result<SubscriptionId, AuthError>;

    /// Removes a listener registered with `on_auth_state_change`.
    fn remove_auth_listener(&self, id: SubscriptionId);

    /// Starts an OAuth sign-in and returns the authorization URL to open.
    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<String, AuthError>;

    async fn sign_out(&self) -> Result<(), AuthError>;
}
