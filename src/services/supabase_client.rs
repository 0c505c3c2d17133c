//! Supabase adapter for Linkshelf.
//!
//! One client plays all three collaborator roles:
//! - data store over PostgREST (`/rest/v1/{table}`)
//! - auth over GoTrue (`/auth/v1/...`), implicit OAuth flow
//! - realtime through an embedded [`RealtimeHub`] fed by the host's transport
//!
//! Every request carries the project's `apikey`; the bearer token is the
//! session's access token when signed in and the anon key otherwise. A session
//! within [`REFRESH_MARGIN_SECS`] of expiry is refreshed before the request.

use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use reqwest::{Client, RequestBuilder, Response, Url};
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::sync::Mutex as AsyncMutex;

use crate::services::auth_service::{AuthCallback, AuthServiceTrait};
use crate::services::data_store::{DataStoreTrait, Filter, Order};
use crate::services::listener_registry::ListenerRegistry;
use crate::services::realtime_feed::{ChangeCallback, RealtimeFeedTrait, RealtimeHub};
use crate::services::session_vault::SessionVaultTrait;
use crate::types::errors::{AuthError, RealtimeError, StoreError};
use crate::types::realtime::{ChangeEvent, ChannelId, EventFilter, SubscriptionId};
use crate::types::session::{AuthChange, AuthEvent, OAuthProvider, Session, SessionUser};
use crate::types::settings::ClientSettings;

/// Tokens carried in the fragment of an implicit-flow OAuth callback.
#[derive(Debug, Clone, PartialEq)]
pub struct CallbackTokens {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_in: Option<i64>,
    pub token_type: String,
}

/// Claims read from an access token without verifying it.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenClaims {
    #[serde(default)]
    pub sub: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub exp: Option<i64>,
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    expires_at: Option<i64>,
    #[serde(default)]
    token_type: Option<String>,
    user: SessionUser,
}

/// Seconds before expiry at which the access token is refreshed.
pub const REFRESH_MARGIN_SECS: i64 = 30;

type SharedVault = Arc<dyn SessionVaultTrait + Send + Sync>;

pub struct SupabaseClient {
    http: Client,
    base_url: String,
    anon_key: String,
    redirect_to: Option<String>,
    session: Mutex<Option<Session>>,
    refresh_lock: AsyncMutex<()>,
    vault: Option<SharedVault>,
    listeners: ListenerRegistry<SubscriptionId, (), dyn Fn(AuthChange) + Send + Sync>,
    hub: RealtimeHub,
}

impl SupabaseClient {
    pub fn new(
        base_url: &str,
        anon_key: &str,
        redirect_to: Option<String>,
        timeout: Duration,
    ) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
            redirect_to,
            session: Mutex::new(None),
            refresh_lock: AsyncMutex::new(()),
            vault: None,
            listeners: ListenerRegistry::new(),
            hub: RealtimeHub::new(),
        })
    }

    pub fn from_settings(settings: &ClientSettings) -> Result<Self, AuthError> {
        Self::new(
            &settings.backend.url,
            &settings.backend.anon_key,
            settings.auth.redirect_to.clone(),
            Duration::from_secs(settings.backend.timeout_secs),
        )
    }

    /// Builds the client from settings and attaches `vault` when
    /// `auth.persist_session` is on.
    pub fn from_settings_with_vault(
        settings: &ClientSettings,
        vault: SharedVault,
    ) -> Result<Self, AuthError> {
        let client = Self::from_settings(settings)?;
        if settings.auth.persist_session {
            Ok(client.with_vault(vault))
        } else {
            tracing::debug!("session persistence disabled");
            Ok(client)
        }
    }

    /// Persists the session through `vault` and restores whatever it holds.
    pub fn with_vault(mut self, vault: SharedVault) -> Self {
        match vault.load() {
            Ok(Some(session)) => {
                tracing::info!(user_id = %session.user_id(), "restored persisted session");
                self.set_local_session(Some(session));
            }
            Ok(None) => {}
            Err(e) => tracing::warn!(error = %e, "could not restore persisted session"),
        }
        self.vault = Some(vault);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Finishes an implicit-flow sign-in from the URL the provider redirected
    /// to. Loads the user, stores the session and announces `SignedIn`.
    pub async fn complete_oauth(&self, callback_url: &str) -> Result<Session, AuthError> {
        let tokens = parse_callback(callback_url)?;

        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(&tokens.access_token)
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;
        let user: SessionUser = auth_ok(response)
            .await?
            .json()
            .await
            .map_err(|e| AuthError::Rejected(e.to_string()))?;

        let expires_at = match tokens.expires_in {
            Some(secs) => Some(now_secs() + secs),
            None => decode_claims(&tokens.access_token).and_then(|c| c.exp),
        };
        let session = Session {
            access_token: tokens.access_token,
            refresh_token: tokens.refresh_token,
            expires_at,
            token_type: tokens.token_type,
            user,
        };

        self.store_session(Some(session.clone()));
        self.announce(AuthEvent::SignedIn, Some(session.clone()));
        Ok(session)
    }

    /// Exchanges the refresh token for a new session and announces
    /// `TokenRefreshed`. A rejected refresh ends the session.
    pub async fn refresh_session(&self) -> Result<Session, AuthError> {
        let refresh_token = self
            .local_session()
            .and_then(|s| s.refresh_token)
            .ok_or(AuthError::SessionExpired)?;

        let response = self
            .http
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        let response = match auth_ok(response).await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(error = %e, "token refresh rejected, ending session");
                self.store_session(None);
                self.announce(AuthEvent::SignedOut, None);
                return Err(e);
            }
        };
        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::Rejected(e.to_string()))?;

        let session = Session {
            expires_at: body
                .expires_at
                .or_else(|| body.expires_in.map(|secs| now_secs() + secs)),
            access_token: body.access_token,
            refresh_token: body.refresh_token.or(Some(refresh_token)),
            token_type: body.token_type.unwrap_or_else(|| "bearer".to_string()),
            user: body.user,
        };
        self.store_session(Some(session.clone()));
        self.announce(AuthEvent::TokenRefreshed, Some(session.clone()));
        Ok(session)
    }

    /// Feeds one decoded change from the realtime transport to the open channels.
    pub fn dispatch_change(&self, change: &ChangeEvent) -> usize {
        self.hub.dispatch(change)
    }

    /// Authorization URL for `provider`.
    pub fn authorize_url(&self, provider: OAuthProvider) -> Result<String, AuthError> {
        authorize_url(&self.base_url, provider, self.redirect_to.as_deref())
    }

    fn local_session(&self) -> Option<Session> {
        self.session.lock().ok().and_then(|s| s.clone())
    }

    fn set_local_session(&self, session: Option<Session>) {
        if let Ok(mut current) = self.session.lock() {
            *current = session;
        }
    }

    fn store_session(&self, session: Option<Session>) {
        if let Some(vault) = &self.vault {
            let persisted = match &session {
                Some(s) => vault.save(s),
                None => vault.clear(),
            };
            if let Err(e) = persisted {
                tracing::warn!(error = %e, "session persistence failed");
            }
        }
        self.set_local_session(session);
    }

    fn announce(&self, event: AuthEvent, session: Option<Session>) {
        let change = AuthChange::new(event, session);
        let listeners = self.listeners.matching(|_| true);
        tracing::debug!(event = ?change.event, listeners = listeners.len(), "auth state announced");
        for callback in listeners {
            callback(change.clone());
        }
    }

    /// The current session, refreshed first if it is about to expire.
    async fn fresh_session(&self) -> Result<Option<Session>, AuthError> {
        let stale = |s: &Session| s.is_expired_at(now_secs() + REFRESH_MARGIN_SECS);
        match self.local_session() {
            Some(session) if stale(&session) => {}
            other => return Ok(other),
        }

        let _guard = self.refresh_lock.lock().await;
        // A concurrent request may have refreshed while this one waited.
        match self.local_session() {
            Some(session) if stale(&session) => {
                tracing::debug!(user_id = %session.user_id(), "session near expiry, refreshing");
                self.refresh_session().await.map(Some)
            }
            other => Ok(other),
        }
    }

    async fn rest(&self, builder: RequestBuilder) -> Result<RequestBuilder, StoreError> {
        let bearer = match self.fresh_session().await {
            Ok(Some(session)) => session.access_token,
            Ok(None) => self.anon_key.clone(),
            Err(e) => return Err(StoreError::Unauthorized(e.to_string())),
        };
        Ok(builder.header("apikey", &self.anon_key).bearer_auth(bearer))
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }
}

#[async_trait]
impl AuthServiceTrait for SupabaseClient {
    async fn get_current_session(&self) -> Result<Option<Session>, AuthError> {
        self.fresh_session().await
    }

    fn on_auth_state_change(&self, callback: AuthCallback) -> Result<SubscriptionId, AuthError> {
        let id = SubscriptionId::new();
        self.listeners.insert(id, (), callback);
        Ok(id)
    }

    fn remove_auth_listener(&self, id: SubscriptionId) {
        self.listeners.remove(id);
    }

    async fn sign_in_with_oauth(&self, provider: OAuthProvider) -> Result<String, AuthError> {
        let url = self.authorize_url(provider)?;
        tracing::info!(provider = provider.as_str(), "oauth sign-in started");
        Ok(url)
    }

    /// Revokes the session server-side when possible; the local session is
    /// cleared and `SignedOut` announced regardless.
    async fn sign_out(&self) -> Result<(), AuthError> {
        if let Some(session) = self.local_session() {
            let result = self
                .http
                .post(format!("{}/auth/v1/logout", self.base_url))
                .header("apikey", &self.anon_key)
                .bearer_auth(&session.access_token)
                .send()
                .await;
            match result {
                Ok(r) if !r.status().is_success() => {
                    tracing::warn!(status = r.status().as_u16(), "logout request rejected")
                }
                Err(e) => tracing::warn!(error = %e, "logout request failed"),
                Ok(_) => {}
            }
        }
        self.store_session(None);
        self.announce(AuthEvent::SignedOut, None);
        Ok(())
    }
}

#[async_trait]
impl DataStoreTrait for SupabaseClient {
    async fn select(
        &self,
        table: &str,
        filters: &[Filter],
        order: Option<&Order>,
    ) -> Result<Vec<Value>, StoreError> {
        let response = self
            .rest(self.http.get(self.table_url(table)))
            .await?
            .query(&select_query(filters, order))
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;
        store_ok(response)
            .await?
            .json()
            .await
            .map_err(|e| StoreError::DecodeError(e.to_string()))
    }

    async fn insert(&self, table: &str, rows: Vec<Value>) -> Result<(), StoreError> {
        let response = self
            .rest(self.http.post(self.table_url(table)))
            .await?
            .header("Prefer", "return=minimal")
            .json(&rows)
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;
        store_ok(response).await?;
        Ok(())
    }

    async fn delete(&self, table: &str, filters: &[Filter]) -> Result<(), StoreError> {
        let response = self
            .rest(self.http.delete(self.table_url(table)))
            .await?
            .query(&filter_query(filters))
            .send()
            .await
            .map_err(|e| StoreError::NetworkError(e.to_string()))?;
        store_ok(response).await?;
        Ok(())
    }
}

impl RealtimeFeedTrait for SupabaseClient {
    fn subscribe(
        &self,
        filter: EventFilter,
        callback: ChangeCallback,
    ) -> Result<ChannelId, RealtimeError> {
        self.hub.subscribe(filter, callback)
    }

    fn unsubscribe(&self, channel: ChannelId) -> Result<(), RealtimeError> {
        self.hub.unsubscribe(channel)
    }
}

async fn store_ok(response: Response) -> Result<Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let message = response.text().await.unwrap_or_default();
    Err(StoreError::RequestFailed {
        status: status.as_u16(),
        message,
    })
}

async fn auth_ok(response: Response) -> Result<Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(AuthError::Rejected(format!("{}: {}", status.as_u16(), body)))
}

fn now_secs() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}

/// PostgREST query pairs for equality filters: `column=eq.value`.
pub fn filter_query(filters: &[Filter]) -> Vec<(String, String)> {
    filters
        .iter()
        .map(|f| match f {
            Filter::Eq { column, value } => (column.clone(), format!("eq.{}", value)),
        })
        .collect()
}

/// Query pairs for a select: `select=*`, the filters, then the order.
pub fn select_query(filters: &[Filter], order: Option<&Order>) -> Vec<(String, String)> {
    let mut query = vec![("select".to_string(), "*".to_string())];
    query.extend(filter_query(filters));
    if let Some(order) = order {
        query.push(("order".to_string(), order.to_string()));
    }
    query
}

/// Builds the GoTrue authorize URL for `provider`.
pub fn authorize_url(
    base_url: &str,
    provider: OAuthProvider,
    redirect_to: Option<&str>,
) -> Result<String, AuthError> {
    let mut params = vec![("provider", provider.as_str())];
    if let Some(redirect) = redirect_to {
        params.push(("redirect_to", redirect));
    }
    let endpoint = format!("{}/auth/v1/authorize", base_url.trim_end_matches('/'));
    Url::parse_with_params(&endpoint, &params)
        .map(String::from)
        .map_err(|e| AuthError::InvalidCallback(e.to_string()))
}

/// Reads the token fragment of an OAuth callback URL.
pub fn parse_callback(callback_url: &str) -> Result<CallbackTokens, AuthError> {
    let url = Url::parse(callback_url).map_err(|e| AuthError::InvalidCallback(e.to_string()))?;
    let fragment = url
        .fragment()
        .ok_or_else(|| AuthError::InvalidCallback("missing fragment".to_string()))?;

    // Reuse the query parser for the fragment's form encoding.
    let mut holder = Url::parse("http://localhost/").map_err(|e| AuthError::InvalidCallback(e.to_string()))?;
    holder.set_query(Some(fragment));

    let mut access_token = None;
    let mut refresh_token = None;
    let mut expires_in = None;
    let mut token_type = None;
    let mut error = None;
    for (key, value) in holder.query_pairs() {
        match key.as_ref() {
            "access_token" => access_token = Some(value.into_owned()),
            "refresh_token" => refresh_token = Some(value.into_owned()),
            "expires_in" => expires_in = value.parse::<i64>().ok(),
            "token_type" => token_type = Some(value.into_owned()),
            "error_description" => error = Some(value.into_owned()),
            "error" if error.is_none() => error = Some(value.into_owned()),
            _ => {}
        }
    }

    if let Some(error) = error {
        return Err(AuthError::Rejected(error));
    }
    let access_token = access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| AuthError::InvalidCallback("missing access_token".to_string()))?;

    Ok(CallbackTokens {
        access_token,
        refresh_token,
        expires_in,
        token_type: token_type.unwrap_or_else(|| "bearer".to_string()),
    })
}

/// Decodes the payload segment of a JWT. The signature is not checked.
pub fn decode_claims(token: &str) -> Option<TokenClaims> {
    let payload = token.split('.').nth(1)?;
    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    serde_json::from_slice(&bytes).ok()
}
