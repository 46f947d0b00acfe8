//! HTTP client for the auth endpoints with a shared timeout policy and uniform
//! response handling. Credentials pass through only for the duration of a call
//! and are never logged.

use super::types::{
    ChangePasswordRequest, Envelope, HeartbeatVerdict, LoginData, LoginRequest, SessionId,
    SessionRequest,
};
use crate::{
    config::ClientConfig,
    error::Error,
    fingerprint::{FingerprintHash, FingerprintRecord},
    APP_USER_AGENT,
};
use reqwest::{Client, Response};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use tracing::{debug, instrument};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const HEARTBEAT_PATH: &str = "/api/auth/heartbeat";
pub const CHANGE_PASSWORD_PATH: &str = "/api/auth/change-password";

/// Maximum number of error body characters surfaced to the user.
const MAX_ERROR_CHARS: usize = 200;

#[derive(Clone, Debug)]
pub struct AuthClient {
    http: Client,
    config: ClientConfig,
}

impl AuthClient {
    /// Zero durations in `config` fall back to their defaults.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, Error> {
        let config = config.normalize();
        let http = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(config.request_timeout())
            .build()?;

        Ok(Self { http, config })
    }

    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Exchanges credentials plus both fingerprint forms for a user/session pair.
    ///
    /// # Errors
    /// `Rejected` with the server message when the login is refused, `Transport`
    /// when the server cannot be reached, `Malformed` for unexpected payloads.
    #[instrument(skip(self, password, fingerprint_raw, fingerprint_hash))]
    pub async fn login(
        &self,
        username: &str,
        password: &SecretString,
        fingerprint_raw: &FingerprintRecord,
        fingerprint_hash: &FingerprintHash,
    ) -> Result<LoginData, Error> {
        let payload = LoginRequest {
            username,
            password: password.expose_secret(),
            fingerprint_raw,
            fingerprint_hash,
        };

        let response = self
            .http
            .post(self.config.endpoint(LOGIN_PATH))
            .json(&payload)
            .send()
            .await?;

        let data = read_envelope(response, "Login failed")
            .await?
            .ok_or_else(|| Error::Malformed("login response has no data".to_string()))?;

        serde_json::from_value(data)
            .map_err(|err| Error::Malformed(format!("invalid login payload: {err}")))
    }

    /// Tells the server the session is over.
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-success status.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn logout(&self, session_id: &SessionId) -> Result<(), Error> {
        let response = self
            .http
            .post(self.config.endpoint(LOGOUT_PATH))
            .json(&SessionRequest { session_id })
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            let body = response.text().await.unwrap_or_default();
            Err(Error::Rejected(format!(
                "logout failed ({status}): {}",
                sanitize_body(&body)
            )))
        }
    }

    /// Reports liveness and returns the server's verdict.
    ///
    /// The HTTP status is not inspected: an error body simply carries no
    /// `force_logout` flag and reads as "keep going".
    ///
    /// # Errors
    /// Returns an error on transport failure or a non-JSON body.
    #[instrument(skip(self), fields(session_id = %session_id))]
    pub async fn heartbeat(&self, session_id: &SessionId) -> Result<HeartbeatVerdict, Error> {
        let response = self
            .http
            .post(self.config.endpoint(HEARTBEAT_PATH))
            .json(&SessionRequest { session_id })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let body: Value = serde_json::from_str(&body).map_err(|_| {
            Error::Malformed(format!("heartbeat ({status}): {}", sanitize_body(&body)))
        })?;

        let verdict = HeartbeatVerdict::from_body(&body);
        debug!(%status, force_logout = verdict.force_logout, "heartbeat acknowledged");
        Ok(verdict)
    }

    /// Changes the password and returns the server's confirmation message.
    ///
    /// # Errors
    /// Same taxonomy as [`AuthClient::login`].
    #[instrument(skip(self, old_password, new_password))]
    pub async fn change_password(
        &self,
        username: &str,
        old_password: &SecretString,
        new_password: &SecretString,
    ) -> Result<Option<String>, Error> {
        let payload = ChangePasswordRequest {
            username,
            old_password: old_password.expose_secret(),
            new_password: new_password.expose_secret(),
        };

        let response = self
            .http
            .post(self.config.endpoint(CHANGE_PASSWORD_PATH))
            .json(&payload)
            .send()
            .await?;

        let data = read_envelope(response, "Password change failed").await?;

        Ok(data
            .as_ref()
            .and_then(|data| data.get("message"))
            .and_then(Value::as_str)
            .map(str::to_string))
    }
}

/// Parses a `{success, data?, error?}` body, mapping refusals to `Rejected`.
pub(crate) async fn read_envelope(
    response: Response,
    fallback: &str,
) -> Result<Option<Value>, Error> {
    let status = response.status();
    let body = response.text().await?;

    let envelope: Envelope = serde_json::from_str(&body)
        .map_err(|_| Error::Malformed(format!("{status}: {}", sanitize_body(&body))))?;

    if !status.is_success() || !envelope.success {
        let message = envelope
            .error
            .filter(|message| !message.trim().is_empty())
            .unwrap_or_else(|| fallback.to_string());
        return Err(Error::Rejected(message));
    }

    Ok(envelope.data)
}

/// Trims and truncates error bodies before they reach the user.
pub(crate) fn sanitize_body(body: &str) -> String {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        "empty response".to_string()
    } else {
        trimmed.chars().take(MAX_ERROR_CHARS).collect()
    }
}
