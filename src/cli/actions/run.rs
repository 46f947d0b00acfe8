use crate::cli::actions::{
    change_password, fingerprint, login, logout, posts, status, Action,
};
use anyhow::Result;

/// Execute the provided action.
// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Login(args) => login::execute(args).await,
        Action::Logout(args) => logout::execute(args).await,
        Action::Status(args) => status::execute(args),
        Action::Fingerprint(args) => fingerprint::execute(args).await,
        Action::Posts(args) => posts::execute(args).await,
        Action::ChangePassword(args) => change_password::execute(args).await,
    }
}
