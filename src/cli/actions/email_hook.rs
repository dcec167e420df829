use crate::hook::{
    self, HookState,
    sender::{EmailSender, HttpEmailSender, LogEmailSender},
    signature::WebhookVerifier,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{info, warn};
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub backend_url: String,
    pub hook_secret: SecretString,
    pub email_api_url: String,
    pub email_api_key: Option<SecretString>,
    pub email_from: String,
}

/// Build the hook state from validated arguments.
///
/// # Errors
/// Returns an error if the secret, the backend URL or the email API URL is invalid.
pub fn state(args: Args) -> Result<Arc<HookState>> {
    let verifier =
        WebhookVerifier::new(&args.hook_secret).context("invalid PATRIMOINE_HOOK_SECRET")?;

    Url::parse(&args.backend_url).context("invalid PATRIMOINE_BACKEND_URL")?;

    let sender: Arc<dyn EmailSender> = match args.email_api_key {
        Some(key) => Arc::new(
            HttpEmailSender::new(&args.email_api_url, key, args.email_from)
                .context("invalid PATRIMOINE_EMAIL_API_URL")?,
        ),
        None => {
            warn!("No email API key configured, emails will only be logged");
            Arc::new(LogEmailSender)
        }
    };

    Ok(Arc::new(HookState::new(verifier, sender, &args.backend_url)))
}

/// Execute the email hook action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let port = args.port;
    info!(
        port,
        backend_url = %args.backend_url,
        email_api_url = %args.email_api_url,
        email_api_key_set = args.email_api_key.is_some(),
        email_from = %args.email_from,
        "Startup configuration"
    );

    let state = state(args)?;
    hook::new(port, state).await
}
