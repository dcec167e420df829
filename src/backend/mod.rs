//! Access to the hosted auth/database provider.
//!
//! One project URL exposes two APIs: the auth API (`/auth/v1`) issuing and
//! validating sessions, and the data API (`/rest/v1`) serving tables and views
//! under row-level security. Every request carries the project public API key;
//! data requests also carry the user's access token so the database sees the
//! caller's identity.
//!
//! Handlers and the session middleware depend on the [`Backend`] trait, not on
//! `reqwest`, so they can be driven by a stub in tests.

mod client;
mod error;
pub mod types;

pub use self::client::HttpBackend;
pub use self::error::BackendError;
pub use self::types::{OtpType, Profile, Relation, Session, SignUpOutcome, User};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;
use uuid::Uuid;

#[async_trait]
pub trait Backend: Send + Sync {
    /// Revalidate an access token remotely and return its user.
    async fn get_user(&self, access_token: &str) -> Result<User, BackendError>;

    /// Exchange a refresh token for a new session.
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError>;

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError>;

    /// Register a user. `redirect_to` is where the confirmation link lands.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<SignUpOutcome, BackendError>;

    /// Send a password recovery email.
    async fn recover_password(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<(), BackendError>;

    async fn update_password(&self, access_token: &str, password: &str)
    -> Result<User, BackendError>;

    /// Exchange an authorization code (PKCE) for a session.
    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<Session, BackendError>;

    /// Verify an email link token hash and open a session.
    async fn verify_otp(&self, token_hash: &str, otp_type: OtpType)
    -> Result<Session, BackendError>;

    /// Revoke the session behind an access token.
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;

    /// Read rows from a table or view; `query` uses the data API filter syntax.
    async fn select(
        &self,
        access_token: &str,
        relation: &str,
        query: &[(&str, String)],
    ) -> Result<Value, BackendError>;

    /// Patch the rows matching `filter`.
    async fn update(
        &self,
        access_token: &str,
        relation: &str,
        filter: &[(&str, String)],
        patch: &Value,
    ) -> Result<(), BackendError>;

    /// URL starting an OAuth sign-in with the given provider.
    fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<Url, BackendError>;
}

/// Read and decode every row of `T`'s relation matching `query`.
///
/// # Errors
/// Returns an error if the request fails or rows do not match `T`.
pub async fn fetch_rows<T>(
    backend: &dyn Backend,
    access_token: &str,
    query: &[(&str, String)],
) -> Result<Vec<T>, BackendError>
where
    T: Relation + DeserializeOwned,
{
    let rows = backend.select(access_token, T::NAME, query).await?;
    serde_json::from_value(rows).map_err(|err| BackendError::Decode(format!("{}: {err}", T::NAME)))
}

/// Fetch the profile row of a user, `None` when it does not exist yet.
///
/// # Errors
/// Returns an error if the request fails or the row cannot be decoded.
pub async fn fetch_profile(
    backend: &dyn Backend,
    access_token: &str,
    user_id: Uuid,
) -> Result<Option<Profile>, BackendError> {
    let rows: Vec<Profile> = fetch_rows(
        backend,
        access_token,
        &[
            ("select", "*".to_string()),
            ("id", format!("eq.{user_id}")),
            ("limit", "1".to_string()),
        ],
    )
    .await?;
    Ok(rows.into_iter().next())
}
