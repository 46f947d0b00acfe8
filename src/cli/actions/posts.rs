use crate::{
    cli::globals::GlobalArgs,
    posts::PostsClient,
    router::{GuardDecision, Route, RouteGuard},
};
use anyhow::{bail, Context, Result};
use tracing::debug;

#[derive(Debug)]
pub struct Args {
    pub globals: GlobalArgs,
}

/// Execute the posts action.
/// # Errors
/// Returns an error without a session, or if the posts cannot be fetched.
pub async fn execute(args: Args) -> Result<()> {
    let controller = args.globals.controller()?;
    let guard = RouteGuard::new(controller.clone());

    let decision = guard.before_each(&Route::HOME);
    controller.stop_heartbeat();

    if let GuardDecision::Redirect(route) = decision {
        debug!(redirect = route.path, "Posts need a session");
        bail!("login required");
    }

    let posts = PostsClient::new(args.globals.config.clone())?
        .get_posts()
        .await
        .context("unable to load posts")?;

    println!("{}", serde_json::to_string_pretty(&posts)?);
    Ok(())
}
