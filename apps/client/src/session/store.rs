//! Session store — the single owner of authentication state.
//!
//! Only login, register, logout and refresh_token (plus the restore mutators
//! `set_user` / `set_token`) write the session. Each write is followed by an
//! explicit commit of the persisted subset to the `SnapshotStore`.
//!
//! The lock is never held across an `.await`: every mutation is complete
//! before the task can suspend, so other tasks never see a half-applied change.
//! Storage writes are serialized separately: a commit snapshots and saves under
//! `storage_lock`, and logout clears under the same lock, so an older snapshot
//! can never land on disk after the erase.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{debug, info, warn};

use crate::auth_api::AuthApi;
use crate::errors::ClientError;
use crate::models::auth::AuthPayload;
use crate::models::user::User;
use crate::session::persistence::{SessionSnapshot, SnapshotStore};

const LOGIN_FALLBACK: &str = "Login failed";
const REGISTER_FALLBACK: &str = "Registration failed";

/// Current authentication state as seen by route guards and callers.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Session {
    pub user: Option<User>,
    pub token: Option<String>,
    pub is_authenticated: bool,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl Session {
    fn persisted(&self) -> SessionSnapshot {
        SessionSnapshot {
            user: self.user.clone(),
            token: self.token.clone(),
            is_authenticated: self.is_authenticated,
        }
    }

    fn from_snapshot(snapshot: SessionSnapshot) -> Self {
        // An authenticated flag without a token cannot be honoured.
        if snapshot.is_authenticated && snapshot.token.is_none() {
            return Session::default();
        }
        Session {
            user: snapshot.user,
            token: snapshot.token,
            is_authenticated: snapshot.is_authenticated,
            is_loading: false,
            last_error: None,
        }
    }
}

#[derive(Debug, Default)]
struct State {
    session: Session,
    /// Bumped whenever `session.token` changes.
    generation: u64,
}

impl State {
    fn replace_token(&mut self, token: Option<String>) {
        if self.session.token != token {
            self.session.token = token;
            self.generation += 1;
        }
    }
}

pub struct SessionStore {
    state: RwLock<State>,
    api: Arc<dyn AuthApi>,
    storage: Arc<dyn SnapshotStore>,
    storage_lock: Mutex<()>,
}

impl SessionStore {
    /// A logged-out store. Nothing is read from `storage`.
    pub fn new(api: Arc<dyn AuthApi>, storage: Arc<dyn SnapshotStore>) -> Self {
        Self {
            state: RwLock::new(State::default()),
            api,
            storage,
            storage_lock: Mutex::new(()),
        }
    }

    /// Restores the last committed snapshot without a network round trip.
    /// An unreadable snapshot starts the process logged out.
    pub fn open(api: Arc<dyn AuthApi>, storage: Arc<dyn SnapshotStore>) -> Self {
        let store = Self::new(api, storage);
        store.restore();
        store
    }

    fn restore(&self) {
        let session = match self.storage.load() {
            Ok(Some(snapshot)) => Session::from_snapshot(snapshot),
            Ok(None) => Session::default(),
            Err(e) => {
                warn!("Ignoring unreadable session snapshot: {e}");
                Session::default()
            }
        };
        info!(
            authenticated = session.is_authenticated,
            "Session restored from snapshot"
        );
        self.write(|state| {
            state.replace_token(session.token.clone());
            state.session = session;
        });
    }

    /// A copy of the current session.
    pub fn snapshot(&self) -> Session {
        self.read(|state| state.session.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.read(|state| state.session.token.clone())
    }

    pub fn user(&self) -> Option<User> {
        self.read(|state| state.session.user.clone())
    }

    pub fn is_authenticated(&self) -> bool {
        self.read(|state| state.session.is_authenticated)
    }

    /// Counter that changes every time the held token changes.
    pub fn token_generation(&self) -> u64 {
        self.read(|state| state.generation)
    }

    /// The token together with the generation it belongs to, read atomically.
    pub fn token_with_generation(&self) -> (Option<String>, u64) {
        self.read(|state| (state.session.token.clone(), state.generation))
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        self.begin();
        let outcome = self.api.login(email, password).await;
        self.finish_authentication(outcome, LOGIN_FALLBACK)
    }

    pub async fn register(
        &self,
        email: &str,
        password: &str,
        name: Option<&str>,
    ) -> Result<User, ClientError> {
        self.begin();
        let outcome = self.api.register(email, password, name).await;
        self.finish_authentication(outcome, REGISTER_FALLBACK)
    }

    /// Clears the session and erases the snapshot. Purely local.
    pub fn logout(&self) -> Result<(), ClientError> {
        let _storage = self.lock_storage();
        self.write(|state| {
            state.replace_token(None);
            state.session = Session::default();
        });
        info!("Session cleared");
        self.storage.clear()
    }

    /// Tells the backend about the logout, then clears the session locally.
    /// The server call is best-effort; only a storage failure is returned.
    pub async fn sign_out(&self) -> Result<(), ClientError> {
        if let Some(token) = self.token() {
            if let Err(e) = self.api.logout(&token).await {
                warn!("Server-side logout failed, clearing local session anyway: {e}");
            }
        }
        self.logout()
    }

    /// Replaces the token using the refresh endpoint.
    ///
    /// No-op when no token is held. On failure the session is logged out and
    /// the cause is returned wrapped in `ClientError::RefreshFailed`.
    pub async fn refresh_token(&self) -> Result<(), ClientError> {
        let Some(token) = self.token() else {
            debug!("No token held, skipping refresh");
            return Ok(());
        };

        match self.api.refresh(&token).await {
            Ok(payload) => {
                let applied = self.write(|state| {
                    // Logged out while the refresh was in flight.
                    if state.session.token.is_none() {
                        return false;
                    }
                    state.replace_token(Some(payload.access_token));
                    true
                });
                if !applied {
                    warn!("Discarding refreshed token: session was logged out during refresh");
                    return Ok(());
                }
                debug!("Access token refreshed");
                self.commit()
            }
            Err(err) => {
                warn!("Token refresh failed, logging out: {err}");
                if let Err(e) = self.logout() {
                    warn!("Failed to erase session snapshot after refresh failure: {e}");
                }
                Err(ClientError::RefreshFailed(Box::new(err)))
            }
        }
    }

    pub fn set_user(&self, user: User) -> Result<(), ClientError> {
        self.write(|state| state.session.user = Some(user));
        self.commit()
    }

    /// Stores `token` and marks the session authenticated. The token is
    /// trusted as-is; its freshness is only discovered on the next request.
    pub fn set_token(&self, token: impl Into<String>) -> Result<(), ClientError> {
        let token = token.into();
        self.write(|state| {
            state.replace_token(Some(token));
            state.session.is_authenticated = true;
        });
        self.commit()
    }

    fn begin(&self) {
        self.write(|state| {
            state.session.is_loading = true;
            state.session.last_error = None;
        });
    }

    fn finish_authentication(
        &self,
        outcome: Result<AuthPayload, ClientError>,
        fallback: &str,
    ) -> Result<User, ClientError> {
        match outcome {
            Ok(payload) => {
                let user = payload.user;
                self.write(|state| {
                    state.replace_token(Some(payload.access_token));
                    state.session.user = Some(user.clone());
                    state.session.is_authenticated = true;
                    state.session.is_loading = false;
                });
                info!(user_id = %user.id, "Session authenticated");
                self.commit()?;
                Ok(user)
            }
            Err(err) => {
                let (message, err) = match err {
                    ClientError::Api { message, .. } => {
                        let message = if message.is_empty() {
                            fallback.to_string()
                        } else {
                            message
                        };
                        (message.clone(), ClientError::Credential(message))
                    }
                    other => (fallback.to_string(), other),
                };
                self.write(|state| {
                    state.replace_token(None);
                    state.session.user = None;
                    state.session.is_authenticated = false;
                    state.session.is_loading = false;
                    state.session.last_error = Some(message);
                });
                warn!("Authentication failed: {err}");
                if let Err(e) = self.commit() {
                    warn!("Failed to commit logged-out session: {e}");
                }
                Err(err)
            }
        }
    }

    /// Writes the persisted subset of the current session.
    fn commit(&self) -> Result<(), ClientError> {
        let _storage = self.lock_storage();
        let snapshot = self.read(|state| state.session.persisted());
        self.storage.save(&snapshot)
    }

    fn lock_storage(&self) -> MutexGuard<'_, ()> {
        self.storage_lock.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<R>(&self, f: impl FnOnce(&State) -> R) -> R {
        let guard = self.state.read().unwrap_or_else(PoisonError::into_inner);
        f(&guard)
    }

    fn write<R>(&self, f: impl FnOnce(&mut State) -> R) -> R {
        let mut guard = self.state.write().unwrap_or_else(PoisonError::into_inner);
        f(&mut guard)
    }
}
