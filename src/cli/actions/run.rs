use crate::cli::actions::{Action, email_hook, server};
use anyhow::Result;

/// Single dispatch point for all CLI actions.
/// # Errors
/// Returns an error if the action fails.
pub async fn execute(action: Action) -> Result<()> {
    match action {
        Action::Server(args) => server::execute(args).await,
        Action::EmailHook(args) => email_hook::execute(args).await,
    }
}
