//! Email delivery abstractions used by the hook.
//!
//! The default sender for local dev is `LogEmailSender`, which logs and returns
//! `Ok(())`. With an API key configured, `HttpEmailSender` posts the message to
//! a transactional email HTTP API (Resend-compatible JSON body).

use crate::APP_USER_AGENT;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};
use url::Url;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    pub to_email: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

#[derive(Debug, Error)]
pub enum SendError {
    #[error("email API request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("email API returned {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Email delivery abstraction used by the hook handler.
#[async_trait]
pub trait EmailSender: Send + Sync {
    /// Deliver a message or return an error so the hook answers 500.
    async fn send(&self, message: &EmailMessage) -> Result<(), SendError>;
}

/// Local dev sender that logs the message instead of sending real email.
#[derive(Clone, Debug)]
pub struct LogEmailSender;

#[async_trait]
impl EmailSender for LogEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), SendError> {
        info!(
            to_email = %message.to_email,
            subject = %message.subject,
            body = %message.text,
            "email send stub"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct ApiEmail<'a> {
    from: &'a str,
    to: [&'a str; 1],
    subject: &'a str,
    html: &'a str,
    text: &'a str,
}

pub struct HttpEmailSender {
    client: Client,
    api_url: Url,
    api_key: SecretString,
    from: String,
}

impl HttpEmailSender {
    /// # Errors
    /// Returns an error if the API URL is invalid or the HTTP client cannot be built.
    pub fn new(api_url: &str, api_key: SecretString, from: String) -> Result<Self> {
        let api_url =
            Url::parse(api_url).with_context(|| format!("Invalid email API URL: {api_url}"))?;
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("Failed to build email API client")?;

        Ok(Self {
            client,
            api_url,
            api_key,
            from,
        })
    }
}

#[async_trait]
impl EmailSender for HttpEmailSender {
    #[instrument(skip(self, message), fields(to_email = %message.to_email))]
    async fn send(&self, message: &EmailMessage) -> Result<(), SendError> {
        let body = ApiEmail {
            from: &self.from,
            to: [message.to_email.as_str()],
            subject: &message.subject,
            html: &message.html,
            text: &message.text,
        };

        let response = self
            .client
            .post(self.api_url.clone())
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            debug!("email accepted by API");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(SendError::Rejected {
            status: status.as_u16(),
            body,
        })
    }
}
