//! Errors surfaced to the browser.
//!
//! Auth failures carry a French message the page shows inline; everything
//! else from the provider collapses into the generic message.

use super::password::PasswordChecklist;
use crate::backend::BackendError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use tracing::error;
use utoipa::ToSchema;

pub const INVALID_CREDENTIALS_MESSAGE: &str = "Email ou mot de passe incorrect.";
pub const EMAIL_NOT_CONFIRMED_MESSAGE: &str =
    "Veuillez confirmer votre adresse email avant de vous connecter.";
pub const GENERIC_MESSAGE: &str = "Une erreur est survenue. Veuillez réessayer.";
pub const INVALID_EMAIL_MESSAGE: &str = "Adresse email invalide.";

#[derive(ToSchema, Serialize, Debug)]
pub struct ErrorBody {
    pub error: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            error: message.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    InvalidCredentials,
    EmailNotConfirmed,
    InvalidEmail,
    /// Anything else; the status tells the client whether retrying may help.
    Generic(StatusCode),
}

impl AuthFailure {
    #[must_use]
    pub fn from_backend(err: &BackendError) -> Self {
        match err {
            BackendError::Unauthorized => Self::InvalidCredentials,
            BackendError::Api {
                status,
                code,
                message,
            } => match code.as_deref() {
                Some("invalid_credentials" | "invalid_grant")
                    if !message.to_lowercase().contains("not confirmed") =>
                {
                    Self::InvalidCredentials
                }
                Some("email_not_confirmed" | "invalid_grant") => Self::EmailNotConfirmed,
                Some("email_address_invalid" | "validation_failed") => Self::InvalidEmail,
                _ if (400..500).contains(status) => Self::Generic(StatusCode::BAD_REQUEST),
                _ => Self::Generic(StatusCode::BAD_GATEWAY),
            },
            BackendError::Transport(_) | BackendError::Decode(_) | BackendError::Url(_) => {
                Self::Generic(StatusCode::BAD_GATEWAY)
            }
        }
    }

    #[must_use]
    pub fn message(self) -> &'static str {
        match self {
            Self::InvalidCredentials => INVALID_CREDENTIALS_MESSAGE,
            Self::EmailNotConfirmed => EMAIL_NOT_CONFIRMED_MESSAGE,
            Self::InvalidEmail => INVALID_EMAIL_MESSAGE,
            Self::Generic(_) => GENERIC_MESSAGE,
        }
    }

    #[must_use]
    pub fn status(self) -> StatusCode {
        match self {
            Self::InvalidCredentials => StatusCode::UNAUTHORIZED,
            Self::EmailNotConfirmed | Self::InvalidEmail => StatusCode::BAD_REQUEST,
            Self::Generic(status) => status,
        }
    }
}

/// Error type of the JSON handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("authentication failed: {0:?}")]
    Auth(AuthFailure),
    #[error("password rules not met")]
    Checklist(PasswordChecklist),
    #[error("invalid input: {0}")]
    Validation(&'static str),
    #[error(transparent)]
    Backend(#[from] BackendError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Auth(failure) => {
                (failure.status(), Json(ErrorBody::new(failure.message()))).into_response()
            }
            Self::Checklist(checklist) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(checklist)).into_response()
            }
            Self::Validation(message) => {
                (StatusCode::UNPROCESSABLE_ENTITY, Json(ErrorBody::new(message))).into_response()
            }
            Self::Backend(err) => {
                error!("Backend request failed: {err}");
                (StatusCode::BAD_GATEWAY, Json(ErrorBody::new(GENERIC_MESSAGE))).into_response()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16, code: Option<&str>, message: &str) -> BackendError {
        BackendError::Api {
            status,
            code: code.map(str::to_string),
            message: message.to_string(),
        }
    }

    #[test]
    fn maps_wrong_password() {
        let failure =
            AuthFailure::from_backend(&api(400, Some("invalid_credentials"), "Invalid login credentials"));
        assert_eq!(failure, AuthFailure::InvalidCredentials);
        assert_eq!(failure.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(failure.message(), "Email ou mot de passe incorrect.");
    }

    #[test]
    fn maps_unconfirmed_email_in_both_shapes() {
        for err in [
            api(400, Some("email_not_confirmed"), "Email not confirmed"),
            api(400, Some("invalid_grant"), "Email not confirmed"),
        ] {
            assert_eq!(AuthFailure::from_backend(&err), AuthFailure::EmailNotConfirmed);
        }
    }

    #[test]
    fn legacy_invalid_grant_is_wrong_password() {
        let err = api(400, Some("invalid_grant"), "Invalid login credentials");
        assert_eq!(AuthFailure::from_backend(&err), AuthFailure::InvalidCredentials);
    }

    #[test]
    fn unknown_errors_are_generic() {
        let client = AuthFailure::from_backend(&api(422, Some("weak_password"), "weak"));
        assert_eq!(client.status(), StatusCode::BAD_REQUEST);
        assert_eq!(client.message(), GENERIC_MESSAGE);

        let server = AuthFailure::from_backend(&api(500, None, "boom"));
        assert_eq!(server.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            AuthFailure::from_backend(&BackendError::Decode("x".to_string())).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn checklist_errors_are_unprocessable() {
        let checklist = PasswordChecklist::evaluate("a", "b");
        let response = ApiError::Checklist(checklist).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
