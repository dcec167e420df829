//! Handler-level session check for protected pages.
//!
//! The middleware already routes anonymous requests away from protected
//! prefixes; the gate validates the access token again, remotely, right
//! before a protected handler runs.

use super::{AuthenticatedUser, SessionTokens, cookies, policy::LOGIN_PATH};
use crate::api::state::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::request::Parts,
    response::Redirect,
};
use std::sync::Arc;
use tracing::{debug, error, warn};

/// Extractor yielding the user behind a freshly revalidated access token.
#[derive(Debug, Clone)]
pub struct RequireUser(pub AuthenticatedUser);

#[async_trait]
impl<S> FromRequestParts<S> for RequireUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let Some(state) = parts.extensions.get::<Arc<AppState>>().cloned() else {
            error!("AppState extension missing, rejecting protected request");
            return Err(Redirect::to(LOGIN_PATH));
        };

        // Tokens refreshed by the middleware win over the (stale) request cookie.
        let access_token = parts
            .extensions
            .get::<SessionTokens>()
            .and_then(|tokens| tokens.access_token.clone())
            .or_else(|| cookies::read_cookie(&parts.headers, cookies::ACCESS_COOKIE_NAME));

        let Some(access_token) = access_token else {
            debug!("no access token, redirecting to login");
            return Err(Redirect::to(LOGIN_PATH));
        };

        match state.backend().get_user(&access_token).await {
            Ok(user) => Ok(Self(AuthenticatedUser { user, access_token })),
            Err(err) => {
                warn!("protected page revalidation failed: {err}");
                Err(Redirect::to(LOGIN_PATH))
            }
        }
    }
}
