pub mod email_hook;
pub mod server;

mod run;

#[derive(Debug)]
pub enum Action {
    Server(server::Args),
    EmailHook(email_hook::Args),
}

impl Action {
    /// Execute the action.
    /// # Errors
    /// Returns an error if the action fails.
    pub async fn execute(self) -> anyhow::Result<()> {
        run::execute(self).await
    }
}
