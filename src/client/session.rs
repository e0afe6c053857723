//! The client session: who is logged in, and how many favorites they have.
//!
//! A `Session` is a cheap handle around shared state. Clones observe and
//! mutate the same session, so one can be handed to every view controller.
//! The active credential lives here and is passed to `ApiClient` on each call.
//!
//! Every mutation bumps a generation counter. Work that spans network calls
//! (startup restore, the favorites fetch after login) records the generation
//! when it starts and drops its results if the session changed meanwhile, so
//! a logout can never be undone by a response that arrives after it.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use super::api::ApiClient;
use super::credentials::{
    Credential, CredentialStore, FileCredentialStore, MemoryCredentialStore,
};
use super::{ClientConfig, ClientError};
use crate::models::{AuthPayload, LoginRequest, RegisterRequest, User};

/// A consistent copy of the observable session fields.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSnapshot {
    pub user: Option<User>,
    pub loading: bool,
    pub favorite_count: u64,
}

impl SessionSnapshot {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }
}

struct SessionState {
    user: Option<User>,
    loading: bool,
    favorite_count: u64,
    credential: Option<Credential>,
    generation: u64,
}

struct Inner {
    api: ApiClient,
    credentials: Arc<dyn CredentialStore>,
    state: Mutex<SessionState>,
    restore_started: AtomicBool,
}

#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// A fresh session: loading, anonymous, no favorites.
    pub fn new(api: ApiClient, credentials: Arc<dyn CredentialStore>) -> Self {
        Session {
            inner: Arc::new(Inner {
                api,
                credentials,
                state: Mutex::new(SessionState {
                    user: None,
                    loading: true,
                    favorite_count: 0,
                    credential: None,
                    generation: 0,
                }),
                restore_started: AtomicBool::new(false),
            }),
        }
    }

    /// Builds the API client and credential store described by `config`.
    pub fn from_config(config: &ClientConfig) -> Self {
        let credentials: Arc<dyn CredentialStore> = match &config.credential_path {
            Some(path) => Arc::new(FileCredentialStore::new(path)),
            None => Arc::new(MemoryCredentialStore::new()),
        };
        Session::new(ApiClient::new(&config.base_url), credentials)
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn generation(&self) -> u64 {
        self.state().generation
    }

    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    pub fn user(&self) -> Option<User> {
        self.state().user.clone()
    }

    pub fn loading(&self) -> bool {
        self.state().loading
    }

    pub fn favorite_count(&self) -> u64 {
        self.state().favorite_count
    }

    /// The credential outgoing authenticated calls should carry.
    pub fn credential(&self) -> Option<Credential> {
        self.state().credential.clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state().user.is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.state().user.as_ref().is_some_and(User::is_admin)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let state = self.state();
        SessionSnapshot {
            user: state.user.clone(),
            loading: state.loading,
            favorite_count: state.favorite_count,
        }
    }

    /// Startup: bring back the user of a persisted credential, if any.
    ///
    /// Only the first call does anything. Every failure except the favorites
    /// fetch leaves the session anonymous and erases the stored credential.
    /// `loading` is cleared last in all cases.
    pub async fn restore(&self) {
        if self.inner.restore_started.swap(true, Ordering::SeqCst) {
            debug!("Session restore already ran");
            return;
        }
        let generation = self.generation();
        self.restore_user(generation).await;
        self.state().loading = false;
    }

    async fn restore_user(&self, generation: u64) {
        let stored = match self.inner.credentials.load().await {
            Ok(stored) => stored,
            Err(e) => {
                warn!(
                    event_name = "session.restore.storage_failed",
                    event_domain = "session",
                    error = %e,
                    "could not read the stored credential"
                );
                None
            }
        };
        let Some(credential) = stored else {
            debug!("No stored credential, starting anonymous");
            return;
        };

        {
            let mut state = self.state();
            if state.generation != generation {
                return;
            }
            state.credential = Some(credential.clone());
        }

        let user = match self.inner.api.profile(&credential).await {
            Ok(user) => user,
            Err(e) => {
                info!(
                    event_name = "session.restore.rejected",
                    event_domain = "session",
                    error = %e,
                    "stored credential no longer valid, continuing anonymous"
                );
                self.discard_credential(generation).await;
                return;
            }
        };

        {
            let mut state = self.state();
            if state.generation != generation {
                debug!("Session changed during restore, dropping profile");
                return;
            }
            state.user = Some(user);
        }
        self.refresh_favorite_count(&credential, generation).await;
    }

    /// Forget a credential the server rejected, unless the session moved on.
    async fn discard_credential(&self, generation: u64) {
        {
            let mut state = self.state();
            if state.generation != generation {
                return;
            }
            state.credential = None;
        }
        if let Err(e) = self.inner.credentials.clear().await {
            warn!("Failed to erase rejected credential: {}", e);
        }
    }

    /// Sets `favorite_count` from the server. Failures are logged only.
    async fn refresh_favorite_count(&self, credential: &Credential, generation: u64) {
        match self.inner.api.favorites(credential).await {
            Ok(favorites) => {
                let mut state = self.state();
                if state.generation == generation {
                    state.favorite_count = favorites.len() as u64;
                }
            }
            Err(e) => warn!(
                event_name = "session.favorites.failed",
                event_domain = "session",
                error = %e,
                "could not load favorites"
            ),
        }
    }

    /// Persist and activate a freshly issued credential for `user`.
    /// Returns the generation the new state belongs to.
    async fn establish(&self, payload: &AuthPayload) -> Result<u64, ClientError> {
        let credential = Credential::new(payload.token.clone());
        self.inner.credentials.save(&credential).await?;

        let mut state = self.state();
        state.generation += 1;
        state.credential = Some(credential);
        state.user = Some(payload.user.clone());
        state.favorite_count = 0;
        Ok(state.generation)
    }

    /// Log in with email and password. The favorites count is loaded after the
    /// user is set; failing to load it does not fail the login.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthPayload, ClientError> {
        let request = LoginRequest {
            email: email.to_string(),
            password: password.to_string(),
        };
        let payload = self.inner.api.login(&request).await?;
        let generation = self.establish(&payload).await?;
        info!(
            event_name = "session.login",
            event_domain = "session",
            user_id = payload.user.id.as_str(),
            "logged in"
        );

        let credential = Credential::new(payload.token.clone());
        self.refresh_favorite_count(&credential, generation).await;
        Ok(payload)
    }

    /// Create an account and log in as it. A new account has no favorites,
    /// so none are fetched.
    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthPayload, ClientError> {
        let payload = self.inner.api.register(request).await?;
        self.establish(&payload).await?;
        info!(
            event_name = "session.register",
            event_domain = "session",
            user_id = payload.user.id.as_str(),
            "registered and logged in"
        );
        Ok(payload)
    }

    /// Forget the user and credential. Never fails; storage errors are logged.
    pub async fn logout(&self) {
        {
            let mut state = self.state();
            state.generation += 1;
            state.credential = None;
            state.user = None;
            state.favorite_count = 0;
        }
        if let Err(e) = self.inner.credentials.clear().await {
            warn!(
                event_name = "session.logout.storage_failed",
                event_domain = "session",
                error = %e,
                "could not erase the stored credential"
            );
        }
        info!(event_name = "session.logout", event_domain = "session", "logged out");
    }

    /// Overwrite the favorites count, e.g. after the user toggled a favorite.
    pub fn update_favorites(&self, count: u64) {
        self.state().favorite_count = count;
    }
}
