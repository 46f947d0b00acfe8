use crate::session::AuthPhase;

/// Failures surfaced by the remote auth/posts calls and the controller.
///
/// `Rejected` carries the server's own message and displays it verbatim, so it
/// can be shown to the user as-is. Storage failures are not part of this
/// type: the controller logs them and keeps the in-memory session.
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    #[error("{0}")]
    Rejected(String),
    #[error("Unable to reach the server: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("Unexpected response from server: {0}")]
    Malformed(String),
    #[error("cannot {operation} while {phase}")]
    InvalidTransition {
        operation: &'static str,
        phase: AuthPhase,
    },
    #[error("{0}")]
    Validation(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejected_displays_server_message_verbatim() {
        let err = Error::Rejected("bad credentials".to_string());
        assert_eq!(err.to_string(), "bad credentials");
    }

    #[test]
    fn invalid_transition_names_operation_and_phase() {
        let err = Error::InvalidTransition {
            operation: "login",
            phase: AuthPhase::Authenticated,
        };
        assert_eq!(err.to_string(), "cannot login while authenticated");
    }
}
