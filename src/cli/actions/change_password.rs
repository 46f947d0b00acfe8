use crate::cli::globals::GlobalArgs;
use anyhow::{bail, Context, Result};
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
    pub old_password: SecretString,
    pub new_password: SecretString,
}

/// Execute the change-password action.
/// # Errors
/// Returns an error without a session, or if the change is refused.
pub async fn execute(args: Args) -> Result<()> {
    let controller = args.globals.controller()?;

    if !controller.check_auth() {
        bail!("login required");
    }

    let result = controller
        .change_password(&args.old_password, &args.new_password)
        .await;
    controller.stop_heartbeat();

    let message = result.context("password change failed")?;
    println!("{message}");
    Ok(())
}
