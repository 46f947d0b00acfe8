use crate::{
    config::ClientConfig,
    router::LogNavigator,
    session::{AuthController, FileStorage, SessionStore},
};
use anyhow::{Context, Result};
use directories::ProjectDirs;
use std::{path::PathBuf, sync::Arc, time::Duration};

/// Settings shared by every subcommand.
#[derive(Clone, Debug)]
pub struct GlobalArgs {
    pub config: ClientConfig,
    pub state_dir: PathBuf,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(config: ClientConfig, state_dir: PathBuf) -> Self {
        Self { config, state_dir }
    }

    /// Resolves raw flag values into a normalized config.
    ///
    /// # Errors
    /// Returns an error if the API URL is invalid or no state directory can be
    /// determined.
    pub fn parse(
        api_url: &str,
        state_dir: Option<PathBuf>,
        timeout_seconds: u64,
        heartbeat_seconds: u64,
    ) -> Result<Self> {
        let config = ClientConfig::parse(api_url)
            .with_context(|| format!("invalid API URL: {api_url}"))?
            .with_request_timeout_seconds(timeout_seconds)
            .with_heartbeat_interval(Duration::from_secs(heartbeat_seconds))
            .normalize();

        let state_dir = match state_dir {
            Some(dir) => dir,
            None => default_state_dir()
                .context("unable to determine a data directory, use --state-dir")?,
        };

        Ok(Self::new(config, state_dir))
    }

    #[must_use]
    pub fn session_store(&self) -> Arc<SessionStore> {
        Arc::new(SessionStore::new(Arc::new(FileStorage::new(
            self.state_dir.clone(),
        ))))
    }

    /// Controller backed by the on-disk session.
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn controller(&self) -> Result<AuthController> {
        AuthController::from_config(
            self.config.clone(),
            self.session_store(),
            Arc::new(LogNavigator),
        )
        .context("failed to build HTTP client")
    }
}

/// Platform data directory for persisted sessions.
#[must_use]
pub fn default_state_dir() -> Option<PathBuf> {
    ProjectDirs::from("dev", "permesi", env!("CARGO_PKG_NAME"))
        .map(|dirs| dirs.data_dir().to_path_buf())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_global_args() {
        let args = GlobalArgs::parse(
            "https://posts.example",
            Some(PathBuf::from("/tmp/sessionwarden")),
            0,
            30,
        )
        .unwrap();

        assert_eq!(args.config.api_base_url().as_str(), "https://posts.example/");
        assert_eq!(args.config.request_timeout(), Duration::from_secs(10));
        assert_eq!(args.config.heartbeat_interval(), Duration::from_secs(30));
        assert_eq!(args.state_dir, PathBuf::from("/tmp/sessionwarden"));
    }

    #[test]
    fn test_invalid_url() {
        let err = GlobalArgs::parse("not a url", Some(PathBuf::from("/tmp")), 10, 60).unwrap_err();
        assert!(err.to_string().contains("invalid API URL"));
    }

    #[test]
    fn test_controller_starts_from_disk_state() {
        let dir = tempfile::tempdir().unwrap();
        let args = GlobalArgs::parse(
            "http://127.0.0.1:9",
            Some(dir.path().to_path_buf()),
            10,
            60,
        )
        .unwrap();

        let controller = args.controller().unwrap();
        assert!(!controller.check_auth());
    }
}
