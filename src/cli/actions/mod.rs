pub mod change_password;
pub mod fingerprint;
pub mod login;
pub mod logout;
pub mod posts;
pub mod status;

// The match over `Action` lives in `run` so this module stays a plain list.
mod run;

#[derive(Debug)]
pub enum Action {
    Login(login::Args),
    Logout(logout::Args),
    Status(status::Args),
    Fingerprint(fingerprint::Args),
    Posts(posts::Args),
    ChangePassword(change_password::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
