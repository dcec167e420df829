//! Request and response bodies of the auth handlers.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

#[derive(ToSchema, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Path to land on after sign-in; unsafe values are ignored.
    #[serde(default)]
    pub redirect: Option<String>,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"[redacted]")
            .field("redirect", &self.redirect)
            .finish()
    }
}

#[derive(ToSchema, Deserialize)]
pub struct SignupRequest {
    pub email: String,
    pub password: String,
    pub password_confirmation: String,
}

impl fmt::Debug for SignupRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignupRequest")
            .field("email", &self.email)
            .finish_non_exhaustive()
    }
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

/// Body of both `/reset-password` and `/password/checklist`.
#[derive(ToSchema, Deserialize)]
pub struct PasswordRequest {
    pub password: String,
    pub password_confirmation: String,
}

impl fmt::Debug for PasswordRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordRequest").finish_non_exhaustive()
    }
}

#[derive(ToSchema, Deserialize, Debug)]
pub struct OnboardingRequest {
    pub monthly_income: f64,
}

#[derive(ToSchema, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct RedirectResponse {
    pub redirect: String,
}

impl RedirectResponse {
    pub fn to(path: impl Into<String>) -> Self {
        Self {
            redirect: path.into(),
        }
    }
}

#[derive(ToSchema, Serialize, Debug, PartialEq, Eq)]
#[serde(untagged)]
pub enum SignupResponse {
    /// Auto-confirmed account, session cookies are set.
    Redirect { redirect: String },
    /// A confirmation email was sent.
    ConfirmationSent { confirmation_sent: bool },
}
