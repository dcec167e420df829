use crate::{
    api::{self, AppConfig, AppState},
    backend::HttpBackend,
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use std::sync::Arc;
use tracing::info;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub backend_url: String,
    pub backend_anon_key: SecretString,
    pub site_url: String,
    pub default_landing: String,
    pub session_max_age_seconds: i64,
    pub email_link_max_age_seconds: i64,
}

/// Build the app state from validated arguments.
///
/// # Errors
/// Returns an error if the site or backend URL is invalid.
pub fn state(args: Args) -> Result<Arc<AppState>> {
    let config = AppConfig::new(&args.site_url)
        .context("invalid PATRIMOINE_SITE_URL")?
        .with_default_landing(args.default_landing)
        .with_session_max_age_seconds(args.session_max_age_seconds)
        .with_email_link_max_age_seconds(args.email_link_max_age_seconds);

    let backend = HttpBackend::new(&args.backend_url, args.backend_anon_key)
        .context("invalid PATRIMOINE_BACKEND_URL")?;

    Ok(Arc::new(AppState::new(config, Arc::new(backend))))
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let port = args.port;
    info!(
        port,
        site_url = %args.site_url,
        backend_url = %args.backend_url,
        default_landing = %args.default_landing,
        session_max_age_seconds = args.session_max_age_seconds,
        email_link_max_age_seconds = args.email_link_max_age_seconds,
        "Startup configuration"
    );

    let state = state(args)?;
    api::new(port, state).await
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(site_url: &str, backend_url: &str, landing: &str) -> Args {
        Args {
            port: 8080,
            backend_url: backend_url.to_string(),
            backend_anon_key: SecretString::from("anon".to_string()),
            site_url: site_url.to_string(),
            default_landing: landing.to_string(),
            session_max_age_seconds: 3600,
            email_link_max_age_seconds: 7200,
        }
    }

    #[test]
    fn builds_state() -> Result<()> {
        let state = state(args(
            "https://patrimoine.app/",
            "https://project.example",
            "/budget",
        ))?;
        assert_eq!(state.config().site_url(), "https://patrimoine.app");
        assert_eq!(state.config().default_landing(), "/budget");
        assert_eq!(state.config().session_max_age_seconds(), 3600);
        assert_eq!(state.config().email_link_max_age_seconds(), 7200);
        assert!(state.config().cookie_secure());
        Ok(())
    }

    #[test]
    fn invalid_site_url_fails_fast() {
        let result = state(args("localhost", "https://project.example", "/dashboard"));
        assert!(result.is_err_and(|err| err.to_string().contains("PATRIMOINE_SITE_URL")));
    }

    #[test]
    fn invalid_backend_url_fails_fast() {
        let result = state(args("http://localhost:8080", "ftp://project", "/dashboard"));
        assert!(result.is_err_and(|err| err.to_string().contains("PATRIMOINE_BACKEND_URL")));
    }
}
