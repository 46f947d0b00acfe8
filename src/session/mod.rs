//! Authenticated session: wire types, durable storage, the in-process store,
//! the HTTP client and the controller driving login, logout and heartbeats.

pub mod client;
mod controller;
mod heartbeat;
pub mod storage;
pub mod store;
pub mod types;

pub use self::client::AuthClient;
pub use self::controller::{
    AuthController, AuthPhase, FORCED_LOGOUT_MESSAGE, MIN_PASSWORD_LEN, PASSWORD_CHANGED_MESSAGE,
};
pub use self::storage::{DurableStorage, FileStorage, MemoryStorage, StorageError};
pub use self::store::{AuthState, SessionStore, SESSION_KEY, USER_KEY};
pub use self::types::{AccountStatus, HeartbeatVerdict, LoginData, Session, SessionId, User};
