//! Shared request state and web app configuration.

use super::session::cookies::{FLOW_PARAM, VerifierFlow};
use crate::backend::Backend;
use anyhow::{Context, Result, anyhow};
use std::sync::Arc;
use url::Url;

const DEFAULT_LANDING: &str = "/dashboard";
const DEFAULT_SESSION_MAX_AGE_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_EMAIL_LINK_MAX_AGE_SECONDS: i64 = 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AppConfig {
    site_url: String,
    default_landing: String,
    session_max_age_seconds: i64,
    email_link_max_age_seconds: i64,
    cookie_secure: bool,
}

impl AppConfig {
    /// Configuration for an app served at `site_url`.
    ///
    /// # Errors
    /// Returns an error if `site_url` is not an absolute http(s) URL.
    pub fn new(site_url: &str) -> Result<Self> {
        let parsed =
            Url::parse(site_url).with_context(|| format!("Invalid site URL: {site_url}"))?;
        let cookie_secure = match parsed.scheme() {
            "https" => true,
            "http" => false,
            scheme => return Err(anyhow!("Unsupported site URL scheme: {scheme}")),
        };

        Ok(Self {
            site_url: site_url.trim_end_matches('/').to_string(),
            default_landing: DEFAULT_LANDING.to_string(),
            session_max_age_seconds: DEFAULT_SESSION_MAX_AGE_SECONDS,
            email_link_max_age_seconds: DEFAULT_EMAIL_LINK_MAX_AGE_SECONDS,
            cookie_secure,
        })
    }

    /// Landing path must be local; anything else keeps the default.
    #[must_use]
    pub fn with_default_landing(mut self, landing: String) -> Self {
        if super::session::policy::safe_return_to(Some(&landing)).is_some() {
            self.default_landing = landing;
        }
        self
    }

    #[must_use]
    pub fn with_session_max_age_seconds(mut self, seconds: i64) -> Self {
        self.session_max_age_seconds = seconds.max(0);
        self
    }

    /// Lifetime of the verifier cookie behind signup and recovery emails.
    #[must_use]
    pub fn with_email_link_max_age_seconds(mut self, seconds: i64) -> Self {
        self.email_link_max_age_seconds = seconds.max(0);
        self
    }

    #[must_use]
    pub fn site_url(&self) -> &str {
        &self.site_url
    }

    #[must_use]
    pub fn default_landing(&self) -> &str {
        &self.default_landing
    }

    #[must_use]
    pub fn session_max_age_seconds(&self) -> i64 {
        self.session_max_age_seconds
    }

    #[must_use]
    pub fn email_link_max_age_seconds(&self) -> i64 {
        self.email_link_max_age_seconds
    }

    /// Only mark cookies secure when the site is served over HTTPS.
    #[must_use]
    pub fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }

    /// Absolute URL of the auth callback for `flow`, optionally carrying a return-to path.
    #[must_use]
    pub fn callback_url(&self, flow: VerifierFlow, next: Option<&str>) -> String {
        let base = format!("{}/auth/callback", self.site_url);
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        if let Some(flow) = flow.param() {
            query.append_pair(FLOW_PARAM, flow);
        }
        if let Some(next) = next {
            query.append_pair("next", next);
        }
        let query = query.finish();
        if query.is_empty() {
            base
        } else {
            format!("{base}?{query}")
        }
    }
}

pub struct AppState {
    config: AppConfig,
    backend: Arc<dyn Backend>,
}

impl AppState {
    #[must_use]
    pub fn new(config: AppConfig, backend: Arc<dyn Backend>) -> Self {
        Self { config, backend }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn backend(&self) -> &dyn Backend {
        self.backend.as_ref()
    }
}
