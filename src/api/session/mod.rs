//! Session boundary of the web app.
//!
//! Flow Overview: the middleware reads the session cookies, revalidates the
//! access token with the auth provider (refreshing it when expired), applies
//! the route policy and appends any cookie change to the response. Protected
//! handlers additionally take a [`gate::RequireUser`] extractor that performs
//! its own remote check.

pub mod cookies;
pub mod gate;
pub mod middleware;
pub mod policy;

use crate::backend::{Backend, BackendError, Session, User};
use std::fmt;
use tracing::{debug, warn};

/// Raw session tokens of a request.
#[derive(Clone, Default)]
pub struct SessionTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &self.access_token.as_ref().map(|_| "[redacted]"))
            .field("refresh_token", &self.refresh_token.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}

/// A user whose access token was just validated by the provider.
#[derive(Clone)]
pub struct AuthenticatedUser {
    pub user: User,
    pub access_token: String,
}

impl fmt::Debug for AuthenticatedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthenticatedUser")
            .field("user", &self.user)
            .field("access_token", &"[redacted]")
            .finish()
    }
}

/// Cookie change decided while resolving the session.
#[derive(Debug)]
pub enum CookieUpdate {
    Keep,
    Set(Box<Session>),
    Clear,
}

#[derive(Debug)]
pub struct Resolution {
    pub authenticated: Option<AuthenticatedUser>,
    pub cookies: CookieUpdate,
}

impl Resolution {
    fn anonymous(cookies: CookieUpdate) -> Self {
        Self {
            authenticated: None,
            cookies,
        }
    }
}

/// Resolve the request's tokens into a validated user.
///
/// Rejected tokens trigger one refresh attempt; a rejected refresh clears the
/// cookies. Provider failures fail closed and leave the cookies untouched.
pub async fn resolve(backend: &dyn Backend, tokens: Option<SessionTokens>) -> Resolution {
    let Some(tokens) = tokens else {
        return Resolution::anonymous(CookieUpdate::Keep);
    };

    if let Some(access_token) = tokens.access_token {
        match backend.get_user(&access_token).await {
            Ok(user) => {
                return Resolution {
                    authenticated: Some(AuthenticatedUser { user, access_token }),
                    cookies: CookieUpdate::Keep,
                };
            }
            Err(BackendError::Unauthorized) => debug!("access token rejected"),
            Err(err) => {
                warn!("session check failed, treating request as anonymous: {err}");
                return Resolution::anonymous(CookieUpdate::Keep);
            }
        }
    }

    let Some(refresh_token) = tokens.refresh_token else {
        return Resolution::anonymous(CookieUpdate::Clear);
    };

    match backend.refresh_session(&refresh_token).await {
        Ok(session) => {
            debug!(user_id = %session.user.id, "session refreshed");
            Resolution {
                authenticated: Some(AuthenticatedUser {
                    user: session.user.clone(),
                    access_token: session.access_token.clone(),
                }),
                cookies: CookieUpdate::Set(Box::new(session)),
            }
        }
        Err(BackendError::Unauthorized) => {
            debug!("refresh token rejected");
            Resolution::anonymous(CookieUpdate::Clear)
        }
        Err(err) => {
            warn!("session refresh failed, treating request as anonymous: {err}");
            Resolution::anonymous(CookieUpdate::Keep)
        }
    }
}
