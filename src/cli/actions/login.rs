use crate::{
    cli::globals::GlobalArgs,
    fingerprint::{self, HostSignals},
    session::{AuthController, AuthPhase},
};
use anyhow::{bail, Context, Result};
use secrecy::SecretString;
use serde_json::json;
use tracing::{debug, info};

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub username: String,
    pub password: SecretString,
    pub watch: bool,
    pub signals: HostSignals,
}

/// Execute the login action.
/// # Errors
/// Returns an error if the login is refused, or when watching, if the server
/// terminates the session.
pub async fn execute(args: Args) -> Result<()> {
    debug!(
        api_url = %args.globals.config.api_base_url(),
        state_dir = %args.globals.state_dir.display(),
        watch = args.watch,
        "Starting login"
    );

    let controller = args.globals.controller()?;

    let record = fingerprint::collect(&args.signals);
    let hash = fingerprint::hash(&record).await;

    let data = controller
        .login(&args.username, &args.password, &record, &hash)
        .await
        .context("login failed")?;

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "user": data.user,
            "session": data.session,
        }))?
    );

    if args.watch {
        watch(&controller).await
    } else {
        controller.stop_heartbeat();
        Ok(())
    }
}

/// Keeps the heartbeat running until Ctrl-C or a server-side termination.
async fn watch(controller: &AuthController) -> Result<()> {
    let mut phase = controller.watch_phase();
    info!(
        interval_secs = controller.config().heartbeat_interval().as_secs(),
        "Watching session, press Ctrl-C to log out"
    );

    tokio::select! {
        signal = tokio::signal::ctrl_c() => {
            signal.context("failed to listen for Ctrl-C")?;
            controller.logout().await;
            println!("Logged out");
            Ok(())
        }
        changed = phase.wait_for(|phase| *phase == AuthPhase::Unauthenticated) => {
            changed.context("session controller dropped")?;
            let reason = controller
                .state()
                .last_error
                .unwrap_or_else(|| "session ended".to_string());
            bail!("session terminated by server: {reason}")
        }
    }
}
