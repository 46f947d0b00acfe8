//! Request and response types for the auth API. Login payloads carry the
//! password and raw fingerprint, so they must never be logged.

use crate::fingerprint::{FingerprintHash, FingerprintRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// Server-issued session identifier (opaque string).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(pub String);

impl SessionId {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountStatus {
    #[default]
    Active,
    Limited,
    Banned,
    #[serde(other)]
    Unknown,
}

/// Profile returned by the server at login. Read-only on the client; fields
/// the client does not model are kept verbatim in `metadata`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub account_status: AccountStatus,
    #[serde(default)]
    pub risk_score: i64,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// Server session. Everything besides `id` is opaque and kept verbatim.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    #[serde(flatten)]
    pub metadata: Map<String, Value>,
}

/// `data` of a successful login response.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LoginData {
    pub user: User,
    pub session: Session,
}

/// Generic `{success, data?, error?}` envelope used by every endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct Envelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub fingerprint_raw: &'a FingerprintRecord,
    pub fingerprint_hash: &'a FingerprintHash,
}

#[derive(Serialize)]
pub(crate) struct SessionRequest<'a> {
    pub session_id: &'a SessionId,
}

#[derive(Serialize)]
pub(crate) struct ChangePasswordRequest<'a> {
    pub username: &'a str,
    pub old_password: &'a str,
    pub new_password: &'a str,
}

/// What the server said about a heartbeat.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct HeartbeatVerdict {
    pub force_logout: bool,
    pub message: Option<String>,
}

impl HeartbeatVerdict {
    /// Reads the verdict from a heartbeat body. The flag may sit at the top
    /// level or inside `data`; the top level wins.
    pub(crate) fn from_body(body: &Value) -> Self {
        let nested = body.get("data").filter(|data| data.is_object());
        let field = |name: &str| {
            body.get(name)
                .filter(|value| !value.is_null())
                .or_else(|| nested.and_then(|data| data.get(name)))
        };

        Self {
            force_logout: field("force_logout")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            message: field("message")
                .and_then(Value::as_str)
                .map(str::to_string)
                .filter(|message| !message.trim().is_empty()),
        }
    }
}
