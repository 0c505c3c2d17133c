//! View Controller for Linkshelf.
//!
//! `BookmarkApp` owns all presentation state (session, bookmark list, form,
//! status line) and is the only thing that mutates it. Work happens in
//! response to events drained from one queue:
//!
//! - user actions, directly or through an [`AppHandle`]
//! - auth-state and realtime callbacks, which only post events
//! - completions of network requests, which run as spawned tasks and post
//!   exactly one event each
//!
//! Fetch completions carry the session epoch they were started in; the epoch
//! moves on every sign-in, sign-out, user switch and teardown, so late
//! results are dropped.
//! After every handled event the view is re-derived and published on a
//! `watch` channel.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::{mpsc, watch};

use crate::managers::bookmark_view_model::BookmarkViewModel;
use crate::managers::session_store::{SessionStore, SessionTransition};
use crate::managers::subscription_manager::{SubscriptionManager, SubscriptionStats};
use crate::services::auth_service::{AuthCallback, AuthServiceTrait};
use crate::services::data_store::{DataStoreTrait, Filter};
use crate::services::realtime_feed::{ChangeCallback, RealtimeFeedTrait};
use crate::types::bookmark::{Bookmark, NewBookmark};
use crate::types::errors::{AuthError, StoreError};
use crate::types::realtime::{ChangeEvent, ChangeKind, EventFilter};
use crate::types::session::{AuthChange, OAuthProvider, Session};
use crate::types::settings::ClientSettings;
use crate::types::view::{BookmarkRow, FormView, StatusMessage, View};

/// The three backend collaborators.
#[derive(Clone)]
pub struct Collaborators {
    pub auth: Arc<dyn AuthServiceTrait>,
    pub store: Arc<dyn DataStoreTrait>,
    pub realtime: Arc<dyn RealtimeFeedTrait>,
}

impl Collaborators {
    /// Uses one backend object for all three roles.
    pub fn from_backend<B>(backend: Arc<B>) -> Self
    where
        B: AuthServiceTrait + DataStoreTrait + RealtimeFeedTrait + 'static,
    {
        Self {
            auth: backend.clone(),
            store: backend.clone(),
            realtime: backend,
        }
    }
}

/// Controller options derived from `ClientSettings`.
#[derive(Debug, Clone, PartialEq)]
pub struct AppOptions {
    pub schema: String,
    pub table: String,
    pub provider: OAuthProvider,
    pub heading: String,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            schema: "public".to_string(),
            table: "bookmarks".to_string(),
            provider: OAuthProvider::Google,
            heading: "My Bookmarks".to_string(),
        }
    }
}

impl AppOptions {
    pub fn from_settings(settings: &ClientSettings) -> Self {
        Self {
            schema: settings.bookmarks.schema.clone(),
            table: settings.bookmarks.table.clone(),
            provider: settings.auth.provider,
            ..Self::default()
        }
    }
}

/// Add-bookmark form fields.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookmarkForm {
    pub title: String,
    pub url: String,
}

impl BookmarkForm {
    pub fn clear(&mut self) {
        self.title.clear();
        self.url.clear();
    }
}

/// User actions a host can post through an [`AppHandle`].
#[derive(Debug, Clone, PartialEq)]
pub enum UserAction {
    SignIn,
    SignOut,
    SetTitle(String),
    SetUrl(String),
    AddBookmark { title: String, url: String },
    SubmitForm,
    DeleteBookmark(String),
    Refresh,
    Shutdown,
}

enum AppEvent {
    Action(UserAction),
    AuthChanged(AuthChange),
    TableChanged(ChangeKind),
    Fetched {
        epoch: u64,
        result: Result<Vec<Bookmark>, StoreError>,
    },
    Inserted(Result<(), StoreError>),
    Deleted {
        id: String,
        result: Result<(), StoreError>,
    },
    SignInStarted(Result<String, AuthError>),
    SignOutFinished(Result<(), AuthError>),
}

impl AppEvent {
    /// True for events posted by spawned request tasks.
    fn is_completion(&self) -> bool {
        matches!(
            self,
            AppEvent::Fetched { .. }
                | AppEvent::Inserted(_)
                | AppEvent::Deleted { .. }
                | AppEvent::SignInStarted(_)
                | AppEvent::SignOutFinished(_)
        )
    }
}

/// Cloneable sender of user actions into a running controller.
#[derive(Clone)]
pub struct AppHandle {
    tx: mpsc::UnboundedSender<AppEvent>,
}

impl AppHandle {
    /// Queues `action`. Returns false once the controller is gone.
    pub fn send(&self, action: UserAction) -> bool {
        self.tx.send(AppEvent::Action(action)).is_ok()
    }
}

pub struct BookmarkApp {
    collaborators: Collaborators,
    options: AppOptions,
    session: SessionStore,
    bookmarks: BookmarkViewModel,
    subscriptions: SubscriptionManager,
    form: BookmarkForm,
    status: Option<StatusMessage>,
    redirect_url: Option<String>,
    epoch: u64,
    in_flight: usize,
    torn_down: bool,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    events_rx: mpsc::UnboundedReceiver<AppEvent>,
    view_tx: watch::Sender<View>,
}

impl BookmarkApp {
    pub fn new(collaborators: Collaborators, options: AppOptions) -> Self {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let subscriptions = SubscriptionManager::new(
            Arc::clone(&collaborators.auth),
            Arc::clone(&collaborators.realtime),
        );
        let initial = View::SignedOut {
            sign_in_label: sign_in_label(options.provider),
            redirect_url: None,
            status: None,
        };
        let (view_tx, _) = watch::channel(initial);

        Self {
            collaborators,
            options,
            session: SessionStore::new(),
            bookmarks: BookmarkViewModel::new(),
            subscriptions,
            form: BookmarkForm::default(),
            status: None,
            redirect_url: None,
            epoch: 0,
            in_flight: 0,
            torn_down: false,
            events_tx,
            events_rx,
            view_tx,
        }
    }

    /// Reads the current session once, then installs the standing auth
    /// listener and applies what was read.
    pub async fn start(&mut self) {
        if self.torn_down {
            return;
        }

        let initial = match self.collaborators.auth.get_current_session().await {
            Ok(session) => session,
            Err(e) => {
                tracing::warn!(error = %e, "could not read current session");
                self.status = Some(StatusMessage::error(format!("Sign-in state unavailable: {}", e)));
                None
            }
        };

        let tx = self.events_tx.clone();
        let callback: AuthCallback = Arc::new(move |change: AuthChange| {
            let _ = tx.send(AppEvent::AuthChanged(change));
        });
        if let Err(e) = self.subscriptions.open_auth(callback) {
            tracing::warn!(error = %e, "auth listener could not be installed");
            self.status = Some(StatusMessage::error(format!("Sign-in updates unavailable: {}", e)));
        }

        self.apply_session(initial);
        self.publish();
    }

    // ─── User actions ───

    /// Starts the OAuth flow. The session arrives later through the auth listener.
    pub fn sign_in(&mut self) {
        if self.torn_down {
            return;
        }
        let auth = Arc::clone(&self.collaborators.auth);
        let provider = self.options.provider;
        self.spawn(async move { AppEvent::SignInStarted(auth.sign_in_with_oauth(provider).await) });
    }

    pub fn sign_out(&mut self) {
        if self.torn_down {
            return;
        }
        let auth = Arc::clone(&self.collaborators.auth);
        self.spawn(async move { AppEvent::SignOutFinished(auth.sign_out().await) });
    }

    pub fn set_title(&mut self, title: &str) {
        self.form.title = title.to_string();
        self.publish();
    }

    pub fn set_url(&mut self, url: &str) {
        self.form.url = url.to_string();
        self.publish();
    }

    /// Issues one insert for `{title, url, user_id}`. Returns false, doing
    /// nothing, when either field is empty or nobody is signed in. The form
    /// is cleared when the insert completes, whatever its outcome.
    pub fn add_bookmark(&mut self, title: &str, url: &str) -> bool {
        if self.torn_down || title.is_empty() || url.is_empty() {
            return false;
        }
        let Some(user_id) = self.session.user_id().map(str::to_string) else {
            return false;
        };

        let row = NewBookmark {
            title: title.to_string(),
            url: url.to_string(),
            user_id,
        };
        let value = match serde_json::to_value(&row) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, "could not encode bookmark");
                return false;
            }
        };

        let store = Arc::clone(&self.collaborators.store);
        let table = self.options.table.clone();
        self.spawn(async move { AppEvent::Inserted(store.insert(&table, vec![value]).await) });
        true
    }

    /// `add_bookmark` with the current form contents.
    pub fn submit_form(&mut self) -> bool {
        let BookmarkForm { title, url } = self.form.clone();
        self.add_bookmark(&title, &url)
    }

    /// Issues one delete filtered to `id`. The list is left alone until the
    /// next refresh.
    pub fn delete_bookmark(&mut self, id: &str) {
        if self.torn_down {
            return;
        }
        let store = Arc::clone(&self.collaborators.store);
        let table = self.options.table.clone();
        let id = id.to_string();
        self.spawn(async move {
            let result = store.delete(&table, &[Filter::eq("id", &id)]).await;
            AppEvent::Deleted { id, result }
        });
    }

    /// Schedules a full re-fetch. Does nothing while signed out.
    pub fn refresh(&mut self) {
        if self.torn_down || !self.session.is_signed_in() {
            return;
        }
        let store = Arc::clone(&self.collaborators.store);
        let table = self.options.table.clone();
        let epoch = self.epoch;
        self.spawn(async move {
            let result = BookmarkViewModel::fetch(store.as_ref(), &table).await;
            AppEvent::Fetched { epoch, result }
        });
    }

    /// Tears the view down: both subscriptions are released and every later
    /// result is ignored.
    pub fn shutdown(&mut self) {
        if self.torn_down {
            return;
        }
        self.torn_down = true;
        self.epoch += 1;
        self.subscriptions.release_all();
        tracing::info!(in_flight = self.in_flight, "bookmark view torn down");
    }

    pub fn dispatch(&mut self, action: UserAction) {
        match action {
            UserAction::SignIn => self.sign_in(),
            UserAction::SignOut => self.sign_out(),
            UserAction::SetTitle(title) => self.set_title(&title),
            UserAction::SetUrl(url) => self.set_url(&url),
            UserAction::AddBookmark { title, url } => {
                self.add_bookmark(&title, &url);
            }
            UserAction::SubmitForm => {
                self.submit_form();
            }
            UserAction::DeleteBookmark(id) => self.delete_bookmark(&id),
            UserAction::Refresh => self.refresh(),
            UserAction::Shutdown => self.shutdown(),
        }
    }

    // ─── Event loop ───

    /// Handles events until no request is in flight and the queue is empty.
    pub async fn settle(&mut self) {
        loop {
            while let Ok(event) = self.events_rx.try_recv() {
                self.handle_event(event);
            }
            if self.in_flight == 0 {
                break;
            }
            match self.events_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }

    /// Handles events until the view is torn down.
    pub async fn run(&mut self) {
        while !self.torn_down {
            match self.events_rx.recv().await {
                Some(event) => self.handle_event(event),
                None => break,
            }
        }
    }

    fn handle_event(&mut self, event: AppEvent) {
        if event.is_completion() {
            self.in_flight = self.in_flight.saturating_sub(1);
        }
        if self.torn_down {
            tracing::debug!("event after teardown ignored");
            return;
        }

        match event {
            AppEvent::Action(action) => self.dispatch(action),
            AppEvent::AuthChanged(change) => {
                tracing::debug!(event = ?change.event, "auth state changed");
                self.apply_session(change.session);
            }
            AppEvent::TableChanged(kind) => {
                tracing::debug!(?kind, "bookmarks table changed");
                if self.subscriptions.has_realtime() {
                    self.refresh();
                }
            }
            AppEvent::Fetched { epoch, result } => {
                if epoch != self.epoch || !self.session.is_signed_in() {
                    tracing::debug!(epoch, current = self.epoch, "stale fetch result dropped");
                } else {
                    match self.bookmarks.apply_fetch(result) {
                        Some(e) => {
                            self.status = Some(StatusMessage::error(format!("Could not load bookmarks: {}", e)))
                        }
                        None => self.status = None,
                    }
                }
            }
            AppEvent::Inserted(result) => {
                self.form.clear();
                match result {
                    Ok(()) => self.status = None,
                    Err(e) => {
                        tracing::warn!(error = %e, "bookmark insert failed");
                        self.status = Some(StatusMessage::error(format!("Could not add bookmark: {}", e)));
                    }
                }
            }
            AppEvent::Deleted { id, result } => match result {
                Ok(()) => self.status = None,
                Err(e) => {
                    tracing::warn!(id = %id, error = %e, "bookmark delete failed");
                    self.status = Some(StatusMessage::error(format!("Could not delete bookmark: {}", e)));
                }
            },
            AppEvent::SignInStarted(result) => match result {
                Ok(url) => {
                    if !self.session.is_signed_in() {
                        self.redirect_url = Some(url);
                    }
                }
                Err(e) => {
                    tracing::warn!(error = %e, "sign-in could not start");
                    self.status = Some(StatusMessage::error(format!("Sign-in failed: {}", e)));
                }
            },
            AppEvent::SignOutFinished(result) => {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "sign-out failed");
                    self.status = Some(StatusMessage::error(format!("Sign-out failed: {}", e)));
                }
            }
        }

        self.publish();
    }

    fn apply_session(&mut self, next: Option<Session>) {
        let transition = self.session.replace(next);
        if transition != SessionTransition::Unchanged {
            tracing::info!(?transition, user_id = self.session.user_id(), "session replaced");
        }

        if transition.leaves_authenticated() {
            self.subscriptions.close_realtime();
            self.bookmarks.clear();
            self.epoch += 1;
        }
        if transition.enters_authenticated() {
            self.epoch += 1;
            self.redirect_url = None;
            self.status = None;
            self.refresh();
            self.open_realtime();
        }
    }

    fn open_realtime(&mut self) {
        let tx = self.events_tx.clone();
        let callback: ChangeCallback = Arc::new(move |change: &ChangeEvent| {
            let _ = tx.send(AppEvent::TableChanged(change.kind));
        });
        let filter = EventFilter::all(&self.options.schema, &self.options.table);
        if let Err(e) = self.subscriptions.open_realtime(filter, callback) {
            tracing::warn!(error = %e, "realtime subscription failed");
            self.status = Some(StatusMessage::error(format!("Live updates unavailable: {}", e)));
        }
    }

    fn spawn<F>(&mut self, task: F)
    where
        F: Future<Output = AppEvent> + Send + 'static,
    {
        let tx = self.events_tx.clone();
        self.in_flight += 1;
        tokio::spawn(async move {
            let event = task.await;
            let _ = tx.send(event);
        });
    }

    fn publish(&self) {
        self.view_tx.send_replace(self.render());
    }

    // ─── Rendering and accessors ───

    /// Derives the view from the current state.
    pub fn render(&self) -> View {
        match self.session.current() {
            None => View::SignedOut {
                sign_in_label: sign_in_label(self.options.provider),
                redirect_url: self.redirect_url.clone(),
                status: self.status.clone(),
            },
            Some(session) => View::SignedIn {
                heading: self.options.heading.clone(),
                user_email: session.user.email.clone(),
                form: FormView {
                    title: self.form.title.clone(),
                    url: self.form.url.clone(),
                    can_submit: !self.form.title.is_empty() && !self.form.url.is_empty(),
                },
                rows: self
                    .bookmarks
                    .bookmarks()
                    .iter()
                    .map(|b| BookmarkRow {
                        id: b.id.clone(),
                        title: b.title.clone(),
                        url: b.url.clone(),
                        created_at: b.created_at.clone(),
                    })
                    .collect(),
                status: self.status.clone(),
            },
        }
    }

    /// Receiver notified after every state change.
    pub fn subscribe_view(&self) -> watch::Receiver<View> {
        self.view_tx.subscribe()
    }

    pub fn handle(&self) -> AppHandle {
        AppHandle {
            tx: self.events_tx.clone(),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.current()
    }

    pub fn bookmarks(&self) -> &[Bookmark] {
        self.bookmarks.bookmarks()
    }

    pub fn form(&self) -> &BookmarkForm {
        &self.form
    }

    pub fn status(&self) -> Option<&StatusMessage> {
        self.status.as_ref()
    }

    pub fn subscription_stats(&self) -> SubscriptionStats {
        self.subscriptions.stats()
    }

    pub fn has_realtime(&self) -> bool {
        self.subscriptions.has_realtime()
    }

    pub fn has_auth_listener(&self) -> bool {
        self.subscriptions.has_auth_listener()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down
    }
}

fn sign_in_label(provider: OAuthProvider) -> String {
    format!("Sign in with {}", provider.display_name())
}
