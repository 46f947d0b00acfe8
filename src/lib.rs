//! # sessionwarden (client session lifecycle & device fingerprinting)
//!
//! `sessionwarden` authenticates a user against the posts service, keeps the
//! session alive with periodic heartbeats, and tears it down when the server
//! decides the account must be signed out (account sharing, bans).
//!
//! ## Flow Overview
//!
//! 1. [`fingerprint::collect`] reads device signals into a [`FingerprintRecord`];
//!    [`fingerprint::hash`] reduces it to a [`FingerprintHash`].
//! 2. [`AuthController::login`] sends credentials plus both fingerprint forms,
//!    stores the returned user/session in the [`SessionStore`], persists them and
//!    starts the heartbeat.
//! 3. Every heartbeat tick posts the session id; a `force_logout` verdict runs the
//!    same teardown as a voluntary [`AuthController::logout`] and surfaces the
//!    server reason in [`AuthState::last_error`].
//! 4. [`RouteGuard`] asks the controller on every navigation and decides whether
//!    to redirect to the login or home surface.
//!
//! There is no ambient global state: the store, controller and guard are built
//! explicitly and passed around, so tests can run isolated instances side by side.

pub mod cli;
pub mod config;
pub mod error;
pub mod fingerprint;
pub mod posts;
pub mod router;
pub mod session;

pub use config::ClientConfig;
pub use error::Error;
pub use fingerprint::{FingerprintHash, FingerprintRecord};
pub use router::{GuardDecision, Navigator, Route, RouteGuard};
pub use session::{AuthController, AuthPhase, AuthState, SessionStore};

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
