//! `POST /hooks/send-email`: verify, pick the template, send.

use super::{
    HookState,
    sender::EmailMessage,
    templates::{self, EmailActionType},
};
use axum::{
    Json,
    body::Bytes,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

#[derive(Deserialize, Debug)]
pub struct HookPayload {
    pub user: HookUser,
    pub email_data: EmailData,
}

#[derive(Deserialize, Debug)]
pub struct HookUser {
    pub email: String,
    #[serde(default)]
    pub new_email: Option<String>,
}

#[derive(Deserialize)]
pub struct EmailData {
    pub token: String,
    pub token_hash: String,
    pub redirect_to: String,
    pub email_action_type: String,
    pub site_url: String,
    #[serde(default)]
    pub token_new: String,
    #[serde(default)]
    pub token_hash_new: String,
}

impl std::fmt::Debug for EmailData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailData")
            .field("email_action_type", &self.email_action_type)
            .field("redirect_to", &self.redirect_to)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Error)]
pub enum HookError {
    #[error("invalid signature: {0}")]
    Signature(#[from] super::signature::SignatureError),
    #[error("invalid payload: {0}")]
    Payload(String),
    #[error("failed to send email: {0}")]
    Send(String),
}

impl HookError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Signature(_) => StatusCode::UNAUTHORIZED,
            Self::Payload(_) => StatusCode::BAD_REQUEST,
            Self::Send(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for HookError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = json!({
            "error": {
                "http_code": status.as_u16(),
                "message": self.to_string(),
            }
        });
        (status, Json(body)).into_response()
    }
}

/// Build the message for a verified payload.
///
/// `email_change` goes to the new address when the provider sends one, with
/// the matching `*_new` token pair when present.
///
/// # Errors
/// Returns [`HookError::Payload`] for unknown action types or a bad backend URL.
pub fn build_message(backend_url: &str, payload: &HookPayload) -> Result<EmailMessage, HookError> {
    let data = &payload.email_data;
    let action: EmailActionType = data
        .email_action_type
        .parse()
        .map_err(|err: templates::UnknownActionType| HookError::Payload(err.to_string()))?;

    let (to_email, token, token_hash) = match (action, payload.user.new_email.as_deref()) {
        (EmailActionType::EmailChange, Some(new_email)) if !new_email.is_empty() => {
            let token = if data.token_new.is_empty() {
                &data.token
            } else {
                &data.token_new
            };
            let token_hash = if data.token_hash_new.is_empty() {
                &data.token_hash
            } else {
                &data.token_hash_new
            };
            (new_email, token, token_hash)
        }
        _ => (
            payload.user.email.as_str(),
            &data.token,
            &data.token_hash,
        ),
    };

    let redirect_to = if data.redirect_to.is_empty() {
        &data.site_url
    } else {
        &data.redirect_to
    };

    let url = templates::confirmation_url(backend_url, token_hash, action, redirect_to)
        .map_err(|err| HookError::Payload(format!("invalid confirmation URL: {err}")))?;
    let rendered = templates::render(action, &url, token);

    Ok(EmailMessage {
        to_email: to_email.to_string(),
        subject: rendered.subject,
        html: rendered.html,
        text: rendered.text,
    })
}

// axum handler for the send email hook
#[instrument(skip(state, headers, body))]
pub async fn send_email(
    state: Extension<Arc<HookState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<serde_json::Value>, HookError> {
    state.verifier().verify(&headers, &body).map_err(|err| {
        warn!("Rejected hook call: {err}");
        HookError::from(err)
    })?;

    let payload: HookPayload = serde_json::from_slice(&body).map_err(|err| {
        warn!("Malformed hook payload: {err}");
        HookError::Payload(err.to_string())
    })?;

    let message = build_message(state.backend_url(), &payload)
        .inspect_err(|err| warn!("Unusable hook payload: {err}"))?;

    state.sender().send(&message).await.map_err(|err| {
        error!("Failed to send email: {err}");
        HookError::Send(err.to_string())
    })?;

    info!(
        action = %payload.email_data.email_action_type,
        "auth email sent"
    );

    Ok(Json(json!({})))
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use serde_json::Value;

    const BACKEND: &str = "https://project.example";

    fn payload(action: &str, new_email: Option<&str>) -> Result<HookPayload> {
        let value: Value = json!({
            "user": { "email": "marie@example.fr", "new_email": new_email },
            "email_data": {
                "token": "123456",
                "token_hash": "hash-current",
                "redirect_to": "http://localhost:8080/auth/callback",
                "email_action_type": action,
                "site_url": "http://localhost:8080",
                "token_new": "654321",
                "token_hash_new": "hash-new"
            }
        });
        Ok(serde_json::from_value(value)?)
    }

    #[test]
    fn signup_goes_to_current_address() -> Result<()> {
        let message = build_message(BACKEND, &payload("signup", None)?)?;
        assert_eq!(message.to_email, "marie@example.fr");
        assert_eq!(message.subject, "Confirmez votre inscription");
        assert!(message.text.contains("token=hash-current&type=signup"));
        assert!(message.text.contains("Code : 123456"));
        Ok(())
    }

    #[test]
    fn email_change_goes_to_new_address() -> Result<()> {
        let message = build_message(BACKEND, &payload("email_change", Some("marie@new.fr"))?)?;
        assert_eq!(message.to_email, "marie@new.fr");
        assert!(message.text.contains("token=hash-new&type=email_change"));
        assert!(message.text.contains("Code : 654321"));
        Ok(())
    }

    #[test]
    fn email_change_without_new_address_uses_current() -> Result<()> {
        let message = build_message(BACKEND, &payload("email_change", None)?)?;
        assert_eq!(message.to_email, "marie@example.fr");
        assert!(message.text.contains("token=hash-current"));
        Ok(())
    }

    #[test]
    fn unknown_action_is_payload_error() -> Result<()> {
        let result = build_message(BACKEND, &payload("reauthentication", None)?);
        assert!(matches!(result, Err(HookError::Payload(_))));
        Ok(())
    }

    #[test]
    fn error_body_follows_hook_convention() {
        let response = HookError::Send("boom".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
