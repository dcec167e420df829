//! Landing route of every provider redirect: OAuth sign-in, email
//! confirmation and password recovery links.

use crate::{
    api::{
        onboarding::post_auth_destination,
        session::{
            cookies::{
                VerifierFlow, append_cookies, clear_code_verifier_cookie, read_cookie,
                session_cookies,
            },
            policy::{LOGIN_PATH, RESET_PASSWORD_PATH, safe_return_to},
        },
        state::AppState,
    },
    backend::{BackendError, OtpType, Session},
};
use axum::{
    extract::{Extension, Query},
    http::HeaderMap,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument, warn};
use utoipa::IntoParams;

pub const CALLBACK_ERROR_CODE: &str = "auth_callback";

#[derive(Deserialize, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct CallbackParams {
    /// Authorization code (PKCE flows).
    code: Option<String>,
    /// Email link token hash, paired with `type`.
    token_hash: Option<String>,
    #[serde(rename = "type")]
    otp_type: Option<String>,
    /// Local path to continue to.
    next: Option<String>,
    /// `signup` or `recovery` for email links, absent for OAuth.
    flow: Option<String>,
    error: Option<String>,
    error_description: Option<String>,
}

#[derive(Debug, Error)]
enum CallbackError {
    #[error("provider returned {0}")]
    Provider(String),
    #[error("code verifier cookie missing")]
    MissingVerifier,
    #[error("unknown email link type: {0}")]
    UnknownType(String),
    #[error("neither code nor token_hash present")]
    MissingCode,
    #[error(transparent)]
    Backend(#[from] BackendError),
}

/// `/login?error=auth_callback`
fn failure_location() -> String {
    format!("{LOGIN_PATH}?error={CALLBACK_ERROR_CODE}")
}

/// Exchange whatever the provider sent back for a session.
///
/// Returns the session and whether it comes from a recovery link.
async fn establish_session(
    state: &AppState,
    headers: &HeaderMap,
    flow: VerifierFlow,
    params: &CallbackParams,
) -> Result<(Session, bool), CallbackError> {
    if let Some(error) = &params.error {
        let description = params.error_description.as_deref().unwrap_or_default();
        return Err(CallbackError::Provider(format!("{error}: {description}")));
    }

    if let Some(code) = &params.code {
        let verifier =
            read_cookie(headers, flow.cookie_name()).ok_or(CallbackError::MissingVerifier)?;
        let session = state
            .backend()
            .exchange_code_for_session(code, &verifier)
            .await?;
        return Ok((session, flow == VerifierFlow::Recovery));
    }

    if let (Some(token_hash), Some(raw_type)) = (&params.token_hash, &params.otp_type) {
        let otp_type =
            OtpType::parse(raw_type).ok_or_else(|| CallbackError::UnknownType(raw_type.clone()))?;
        let session = state.backend().verify_otp(token_hash, otp_type).await?;
        return Ok((session, otp_type == OtpType::Recovery));
    }

    Err(CallbackError::MissingCode)
}

#[utoipa::path(
    get,
    path= "/auth/callback",
    params(CallbackParams),
    responses (
        (status = 303, description = "Session established and redirected to the app, or back to login with error=auth_callback"),
    ),
    tag= "auth"
)]
#[instrument(skip(state, headers, params))]
pub async fn callback(
    state: Extension<Arc<AppState>>,
    headers: HeaderMap,
    params: Option<Query<CallbackParams>>,
) -> Response {
    let params = params.map(|Query(params)| params).unwrap_or_default();
    let config = state.config();
    let flow = VerifierFlow::from_param(params.flow.as_deref());

    let mut cookies = Vec::new();
    if read_cookie(&headers, flow.cookie_name()).is_some() {
        match clear_code_verifier_cookie(config, flow) {
            Ok(cookie) => cookies.push(cookie),
            Err(err) => error!("Failed to build verifier cookie: {err}"),
        }
    }

    let location = match establish_session(&state, &headers, flow, &params).await {
        Ok((session, recovery)) => match session_cookies(config, &session) {
            Ok(session_cookies) => {
                cookies.extend(session_cookies);
                info!(user_id = %session.user.id, recovery, "auth callback completed");

                let requested =
                    safe_return_to(params.next.as_deref()).unwrap_or(config.default_landing());
                // Recovery links must reach the reset form, onboarding comes later.
                if recovery || requested == RESET_PASSWORD_PATH {
                    requested.to_string()
                } else {
                    post_auth_destination(state.backend(), &session, requested).await
                }
            }
            Err(err) => {
                error!("Failed to build session cookies: {err}");
                failure_location()
            }
        },
        Err(err) => {
            warn!("Auth callback failed: {err}");
            failure_location()
        }
    };

    let mut response = Redirect::to(&location).into_response();
    append_cookies(response.headers_mut(), cookies);
    response
}
