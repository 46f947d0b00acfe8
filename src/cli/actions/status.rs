use crate::cli::globals::GlobalArgs;
use anyhow::Result;
use serde_json::json;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
}

/// Execute the status action.
/// # Errors
/// Returns an error if the controller cannot be built or the state cannot be
/// serialized.
pub fn execute(args: Args) -> Result<()> {
    let controller = args.globals.controller()?;

    let authenticated = controller.check_auth();
    controller.stop_heartbeat();

    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "authenticated": authenticated,
            "phase": controller.phase(),
            "state": controller.state(),
        }))?
    );
    Ok(())
}
