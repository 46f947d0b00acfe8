//! Holder of the single [`AuthState`] and its durable copy.
//!
//! Every mutation takes the write lock for the whole update, so readers never
//! observe a user without its session or the other way around.

use super::{
    storage::{DurableStorage, StorageError},
    types::{Session, SessionId, User},
};
use serde::Serialize;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, warn};

/// Durable key holding the serialized [`User`].
pub const USER_KEY: &str = "auth_user";
/// Durable key holding the serialized [`Session`].
pub const SESSION_KEY: &str = "auth_session";

/// Process-wide authentication state.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AuthState {
    pub user: Option<User>,
    pub session: Option<Session>,
    pub loading: bool,
    pub last_error: Option<String>,
}

impl AuthState {
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    #[must_use]
    pub fn session_id(&self) -> Option<&SessionId> {
        self.session.as_ref().map(|session| &session.id)
    }
}

pub struct SessionStore {
    state: RwLock<AuthState>,
    storage: Arc<dyn DurableStorage>,
}

impl SessionStore {
    #[must_use]
    pub fn new(storage: Arc<dyn DurableStorage>) -> Self {
        Self {
            state: RwLock::new(AuthState::default()),
            storage,
        }
    }

    /// Snapshot of the current state.
    #[must_use]
    pub fn get(&self) -> AuthState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_authenticated()
    }

    #[must_use]
    pub fn session_id(&self) -> Option<SessionId> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .session_id()
            .cloned()
    }

    /// Replaces user and session together.
    pub fn set(&self, user: User, session: Session) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.user = Some(user);
        state.session = Some(session);
    }

    /// Empties user and session together.
    pub fn clear(&self) {
        let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
        state.user = None;
        state.session = None;
    }

    pub fn set_loading(&self, loading: bool) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .loading = loading;
    }

    pub fn set_error(&self, message: Option<String>) {
        self.state
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .last_error = message;
    }

    /// Writes the current user and session to durable storage.
    ///
    /// With nothing to persist, the durable entries are removed instead.
    ///
    /// # Errors
    /// Returns an error if serialization or the storage backend fails.
    pub fn persist(&self) -> Result<(), StorageError> {
        let (user, session) = {
            let state = self.state.read().unwrap_or_else(PoisonError::into_inner);
            (state.user.clone(), state.session.clone())
        };

        let (Some(user), Some(session)) = (user, session) else {
            return self.forget();
        };

        self.storage.set(USER_KEY, &encode(USER_KEY, &user)?)?;
        self.storage.set(SESSION_KEY, &encode(SESSION_KEY, &session)?)?;

        debug!(session_id = %session.id, "session persisted");
        Ok(())
    }

    /// Loads user and session from durable storage into the live state.
    ///
    /// Succeeds only if both entries exist and parse. Anything else removes
    /// whatever entries remain and leaves the live state untouched.
    pub fn restore(&self) -> bool {
        match self.read_durable() {
            Ok(Some((user, session))) => {
                debug!(session_id = %session.id, "session restored");
                self.set(user, session);
                true
            }
            Ok(None) => false,
            Err(reason) => {
                warn!(reason = %reason, "discarding stored session");
                if let Err(err) = self.forget() {
                    warn!("Failed to clear stored session: {}", err);
                }
                false
            }
        }
    }

    /// Removes both durable entries.
    ///
    /// # Errors
    /// Returns an error if the storage backend fails.
    pub fn forget(&self) -> Result<(), StorageError> {
        let user = self.storage.remove(USER_KEY);
        let session = self.storage.remove(SESSION_KEY);
        user.and(session)
    }

    fn read_durable(&self) -> Result<Option<(User, Session)>, String> {
        let user = self.storage.get(USER_KEY).map_err(|err| err.to_string())?;
        let session = self
            .storage
            .get(SESSION_KEY)
            .map_err(|err| err.to_string())?;

        match (user, session) {
            (None, None) => Ok(None),
            (Some(user), Some(session)) => {
                let user: User = serde_json::from_str(&user)
                    .map_err(|err| format!("invalid {USER_KEY}: {err}"))?;
                let session: Session = serde_json::from_str(&session)
                    .map_err(|err| format!("invalid {SESSION_KEY}: {err}"))?;
                Ok(Some((user, session)))
            }
            (Some(_), None) => Err(format!("{SESSION_KEY} missing")),
            (None, Some(_)) => Err(format!("{USER_KEY} missing")),
        }
    }
}

fn encode<T: Serialize>(key: &str, value: &T) -> Result<String, StorageError> {
    serde_json::to_string(value).map_err(|source| StorageError::Encode {
        key: key.to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{storage::MemoryStorage, types::AccountStatus};
    use serde_json::{json, Map};

    fn user() -> User {
        let mut metadata = Map::new();
        metadata.insert("email".to_string(), json!("alice@example.com"));
        User {
            id: "u-1".to_string(),
            username: "alice".to_string(),
            account_status: AccountStatus::Active,
            risk_score: 15,
            metadata,
        }
    }

    fn session() -> Session {
        let mut metadata = Map::new();
        metadata.insert("expires_at".to_string(), json!("2024-05-02T10:00:00Z"));
        Session {
            id: SessionId::from("sess-1".to_string()),
            created_at: Some("2024-05-01T10:00:00Z".to_string()),
            metadata,
        }
    }

    fn store() -> (Arc<MemoryStorage>, SessionStore) {
        let storage = Arc::new(MemoryStorage::new());
        let store = SessionStore::new(storage.clone());
        (storage, store)
    }

    #[test]
    fn starts_empty() {
        let (_, store) = store();
        assert_eq!(store.get(), AuthState::default());
        assert!(!store.is_authenticated());
        assert_eq!(store.session_id(), None);
    }

    #[test]
    fn set_and_clear_are_paired() {
        let (_, store) = store();
        store.set(user(), session());

        let state = store.get();
        assert_eq!(state.user, Some(user()));
        assert_eq!(state.session, Some(session()));
        assert_eq!(store.session_id(), Some(SessionId::from("sess-1".to_string())));

        store.clear();
        let state = store.get();
        assert_eq!(state.user, None);
        assert_eq!(state.session, None);
    }

    #[test]
    fn persist_then_restore_reproduces_identity() {
        let (storage, first) = store();
        first.set(user(), session());
        first.persist().unwrap();
        assert_eq!(storage.len(), 2);

        let second = SessionStore::new(storage.clone());
        assert!(second.restore());
        assert_eq!(second.get().user, Some(user()));
        assert_eq!(second.get().session, Some(session()));
    }

    #[test]
    fn restore_with_single_key_fails_and_leaves_nothing() {
        let (storage, store) = store();
        storage
            .set(USER_KEY, &serde_json::to_string(&user()).unwrap())
            .unwrap();

        assert!(!store.restore());
        assert!(!store.is_authenticated());
        assert!(storage.is_empty());
    }

    #[test]
    fn restore_with_corrupt_entry_fails_and_leaves_nothing() {
        let (storage, store) = store();
        storage
            .set(USER_KEY, &serde_json::to_string(&user()).unwrap())
            .unwrap();
        storage.set(SESSION_KEY, "{not json").unwrap();

        assert!(!store.restore());
        assert_eq!(store.get().user, None);
        assert_eq!(store.get().session, None);
        assert!(storage.is_empty());
    }

    #[test]
    fn restore_without_entries_is_a_quiet_miss() {
        let (storage, store) = store();
        assert!(!store.restore());
        assert!(storage.is_empty());
    }

    #[test]
    fn persist_without_identity_forgets() {
        let (storage, store) = store();
        storage.set(USER_KEY, "{}").unwrap();
        storage.set(SESSION_KEY, "{}").unwrap();

        store.persist().unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn loading_and_error_do_not_touch_identity() {
        let (_, store) = store();
        store.set(user(), session());
        store.set_loading(true);
        store.set_error(Some("boom".to_string()));

        let state = store.get();
        assert!(state.loading);
        assert_eq!(state.last_error.as_deref(), Some("boom"));
        assert!(state.is_authenticated());
    }
}
