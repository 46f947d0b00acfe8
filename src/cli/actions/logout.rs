use crate::cli::globals::GlobalArgs;
use anyhow::Result;
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
}

/// Execute the logout action.
/// # Errors
/// Returns an error if the controller cannot be built.
pub async fn execute(args: Args) -> Result<()> {
    let controller = args.globals.controller()?;

    let restored = controller.restore_session();
    debug!(restored, "Loaded persisted session");

    controller.logout().await;
    println!("Logged out");
    Ok(())
}
