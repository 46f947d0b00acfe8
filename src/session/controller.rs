use super::{
    client::AuthClient,
    heartbeat::{HeartbeatHandle, Tick},
    store::{AuthState, SessionStore},
    types::LoginData,
};
use crate::{
    config::ClientConfig,
    error::Error,
    fingerprint::{FingerprintHash, FingerprintRecord},
    router::{Navigator, Route},
};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, Mutex, PoisonError,
    },
};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// Error shown when the server ends the session without giving a reason.
pub const FORCED_LOGOUT_MESSAGE: &str = "Your account access has been restricted";
/// Confirmation used when the server accepts a password change silently.
pub const PASSWORD_CHANGED_MESSAGE: &str = "Password changed, please log in again";
pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthPhase {
    Unauthenticated,
    Authenticating,
    Authenticated,
    Terminating,
}

impl fmt::Display for AuthPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unauthenticated => "unauthenticated",
            Self::Authenticating => "authenticating",
            Self::Authenticated => "authenticated",
            Self::Terminating => "terminating",
        })
    }
}

/// Session lifecycle: login, logout, heartbeat and restoration.
///
/// Cheap to clone; every clone drives the same state. At most one heartbeat
/// task exists per controller, and starting one always cancels the previous.
#[derive(Clone)]
pub struct AuthController {
    inner: Arc<Inner>,
}

struct Inner {
    client: AuthClient,
    store: Arc<SessionStore>,
    navigator: Arc<dyn Navigator>,
    heartbeat: Mutex<Option<HeartbeatHandle>>,
    generation: AtomicU64,
    phase: watch::Sender<AuthPhase>,
}

impl AuthController {
    /// Starts unauthenticated. An identity already loaded into `store` is taken
    /// over, heartbeat included, by the next [`AuthController::check_auth`].
    #[must_use]
    pub fn new(
        client: AuthClient,
        store: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        let (phase, _) = watch::channel(AuthPhase::Unauthenticated);

        Self {
            inner: Arc::new(Inner {
                client,
                store,
                navigator,
                heartbeat: Mutex::new(None),
                generation: AtomicU64::new(0),
                phase,
            }),
        }
    }

    /// Builds the HTTP client from `config` and wires a controller around it.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(
        config: ClientConfig,
        store: Arc<SessionStore>,
        navigator: Arc<dyn Navigator>,
    ) -> Result<Self, Error> {
        Ok(Self::new(AuthClient::new(config)?, store, navigator))
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        self.inner.client.config()
    }

    #[must_use]
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.inner.store
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.store.get()
    }

    #[must_use]
    pub fn phase(&self) -> AuthPhase {
        *self.inner.phase.borrow()
    }

    /// Subscribes to phase transitions.
    #[must_use]
    pub fn watch_phase(&self) -> watch::Receiver<AuthPhase> {
        self.inner.phase.subscribe()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.inner.store.is_authenticated()
    }

    /// Whether a heartbeat loop is currently running.
    #[must_use]
    pub fn heartbeat_active(&self) -> bool {
        self.inner
            .heartbeat
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(HeartbeatHandle::is_running)
    }

    /// Logs in with both fingerprint forms and starts the heartbeat.
    ///
    /// On failure the message lands in [`AuthState::last_error`] and the
    /// controller returns to [`AuthPhase::Unauthenticated`].
    ///
    /// # Errors
    /// `InvalidTransition` unless unauthenticated, otherwise whatever the
    /// login request failed with.
    #[instrument(skip(self, password, record, hash))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        record: &FingerprintRecord,
        hash: &FingerprintHash,
    ) -> Result<LoginData, Error> {
        let mut current = AuthPhase::Unauthenticated;
        let acquired = self.inner.phase.send_if_modified(|phase| {
            current = *phase;
            if *phase == AuthPhase::Unauthenticated {
                *phase = AuthPhase::Authenticating;
                true
            } else {
                false
            }
        });
        if !acquired {
            return Err(Error::InvalidTransition {
                operation: "log in",
                phase: current,
            });
        }

        let store = &self.inner.store;
        store.set_loading(true);
        store.set_error(None);

        let result = self
            .inner
            .client
            .login(username, password, record, hash)
            .await;

        match result {
            Ok(data) => {
                store.set(data.user.clone(), data.session.clone());
                if let Err(err) = store.persist() {
                    warn!("Failed to persist session: {}", err);
                }
                self.set_phase(AuthPhase::Authenticated);
                store.set_loading(false);
                self.start_heartbeat();

                info!(
                    user = %data.user.username,
                    session_id = %data.session.id,
                    "Login succeeded"
                );
                Ok(data)
            }
            Err(err) => {
                store.set_error(Some(err.to_string()));
                store.set_loading(false);
                self.set_phase(AuthPhase::Unauthenticated);

                warn!("Login failed: {}", err);
                Err(err)
            }
        }
    }

    /// Ends the session locally and, when possible, on the server.
    ///
    /// The heartbeat is stopped before anything else. Notifying the server is
    /// best effort; local state is always cleared and the login route shown.
    pub async fn logout(&self) {
        self.teardown(None).await;
    }

    /// Server-initiated logout: the full [`AuthController::logout`] path, with
    /// the reason surfaced as the last error.
    ///
    /// The reason is recorded before the phase returns to
    /// [`AuthPhase::Unauthenticated`], so phase watchers always see it.
    pub async fn force_logout(&self, message: Option<String>) {
        let message = message.unwrap_or_else(|| FORCED_LOGOUT_MESSAGE.to_string());
        warn!(reason = %message, "Session terminated by server");
        self.teardown(Some(message)).await;
    }

    async fn teardown(&self, reason: Option<String>) {
        self.stop_heartbeat();

        let store = &self.inner.store;
        let has_identity = store.is_authenticated() || store.session_id().is_some();
        let tearing_down = self.inner.phase.send_if_modified(|phase| {
            if *phase == AuthPhase::Unauthenticated && !has_identity {
                false
            } else {
                *phase = AuthPhase::Terminating;
                true
            }
        });

        if tearing_down {
            store.set_loading(true);
            store.set_error(None);

            if let Some(session_id) = store.session_id() {
                if let Err(err) = self.inner.client.logout(&session_id).await {
                    warn!(session_id = %session_id, "Failed to notify logout: {}", err);
                }
            }

            store.clear();
            if let Err(err) = store.forget() {
                warn!("Failed to clear stored session: {}", err);
            }
            store.set_loading(false);
            store.set_error(reason);
            self.set_phase(AuthPhase::Unauthenticated);
            info!("Logged out");
        } else if reason.is_some() {
            store.set_error(reason);
        }

        self.inner.navigator.navigate(&Route::LOGIN);
    }

    /// Starts the heartbeat, cancelling any running one first.
    pub fn start_heartbeat(&self) {
        let mut slot = self
            .inner
            .heartbeat
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = slot.take() {
            previous.cancel();
        }

        let generation = self.inner.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let period = self.inner.client.config().heartbeat_interval();
        let weak = Arc::downgrade(&self.inner);

        *slot = HeartbeatHandle::spawn(generation, period, move |token| {
            let weak = weak.clone();
            async move {
                match weak.upgrade() {
                    Some(inner) => AuthController { inner }.heartbeat_tick(generation, token).await,
                    None => Tick::Stop,
                }
            }
        });

        if slot.is_some() {
            debug!(generation, period_secs = period.as_secs_f64(), "Heartbeat started");
        }
    }

    pub fn stop_heartbeat(&self) {
        let handle = self
            .inner
            .heartbeat
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = handle {
            handle.cancel();
        }
    }

    /// Loads the durable session; on success resumes the heartbeat.
    pub fn restore_session(&self) -> bool {
        if !self.inner.store.restore() {
            return false;
        }

        self.set_phase(AuthPhase::Authenticated);
        self.start_heartbeat();
        info!(session_id = ?self.inner.store.session_id(), "Session restored");
        true
    }

    /// Authentication status, restoring the durable session first if needed.
    pub fn check_auth(&self) -> bool {
        if self.is_authenticated() {
            self.adopt_session();
        } else {
            self.restore_session();
        }
        self.is_authenticated()
    }

    /// Takes over an identity put into the store behind the controller's back.
    fn adopt_session(&self) {
        let adopted = self.inner.phase.send_if_modified(|phase| {
            if *phase == AuthPhase::Unauthenticated {
                *phase = AuthPhase::Authenticated;
                true
            } else {
                false
            }
        });
        if adopted {
            self.start_heartbeat();
            info!(session_id = ?self.inner.store.session_id(), "Session adopted");
        }
    }

    /// Changes the password of the logged-in user. The server invalidates the
    /// session on success, so this logs out and returns the confirmation.
    ///
    /// # Errors
    /// `InvalidTransition` without a user, `Validation` for a weak or unchanged
    /// password, otherwise whatever the request failed with.
    #[instrument(skip_all)]
    pub async fn change_password(
        &self,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<String, Error> {
        let store = &self.inner.store;
        let Some(user) = store.get().user else {
            return Err(Error::InvalidTransition {
                operation: "change password",
                phase: self.phase(),
            });
        };

        if let Err(err) = validate_new_password(old_password, new_password) {
            store.set_error(Some(err.to_string()));
            return Err(err);
        }

        store.set_loading(true);
        store.set_error(None);
        let result = self
            .inner
            .client
            .change_password(&user.username, old_password, new_password)
            .await;
        store.set_loading(false);

        match result {
            Ok(message) => {
                info!(user = %user.username, "Password changed");
                self.logout().await;
                Ok(message.unwrap_or_else(|| PASSWORD_CHANGED_MESSAGE.to_string()))
            }
            Err(err) => {
                warn!("Password change failed: {}", err);
                store.set_error(Some(err.to_string()));
                Err(err)
            }
        }
    }

    async fn heartbeat_tick(&self, generation: u64, token: CancellationToken) -> Tick {
        let Some(session_id) = self.inner.store.session_id() else {
            debug!(generation, "No session id, heartbeat stopping");
            self.release_heartbeat(generation);
            return Tick::Stop;
        };

        let response = tokio::select! {
            () = token.cancelled() => return Tick::Stop,
            response = self.inner.client.heartbeat(&session_id) => response,
        };
        if token.is_cancelled() {
            return Tick::Stop;
        }

        match response {
            Ok(verdict) if verdict.force_logout => {
                self.force_logout(verdict.message).await;
                Tick::Stop
            }
            Ok(_) => Tick::Continue,
            Err(err) => {
                warn!(session_id = %session_id, "Heartbeat failed: {}", err);
                Tick::Continue
            }
        }
    }

    /// Drops the heartbeat slot if it still belongs to `generation`.
    fn release_heartbeat(&self, generation: u64) {
        let mut slot = self
            .inner
            .heartbeat
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if slot
            .as_ref()
            .is_some_and(|handle| handle.generation() == generation)
        {
            if let Some(handle) = slot.take() {
                handle.cancel();
            }
        }
    }

    fn set_phase(&self, phase: AuthPhase) {
        self.inner.phase.send_replace(phase);
    }
}

impl fmt::Debug for AuthController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthController")
            .field("phase", &self.phase())
            .field("heartbeat_active", &self.heartbeat_active())
            .finish_non_exhaustive()
    }
}

fn validate_new_password(old: &SecretString, new: &SecretString) -> Result<(), Error> {
    let new = new.expose_secret();
    if new.chars().count() < MIN_PASSWORD_LEN {
        return Err(Error::Validation(format!(
            "New password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    if new == old.expose_secret() {
        return Err(Error::Validation(
            "New password must differ from the current one".to_string(),
        ));
    }
    Ok(())
}
