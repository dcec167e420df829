//! Password based auth flows.
//!
//! Flow Overview: the provider owns credentials and sessions. These handlers
//! validate input locally (email shape, password checklist), forward to the
//! auth API and translate the outcome into session cookies plus a JSON body
//! telling the page where to navigate.

use super::{
    types::{
        ForgotPasswordRequest, LoginRequest, PasswordRequest, RedirectResponse, SignupRequest,
        SignupResponse,
    },
    valid_email,
};
use crate::{
    api::{
        error::{ApiError, AuthFailure},
        onboarding::{ONBOARDING_PATH, post_auth_destination},
        password::PasswordChecklist,
        pkce::Pkce,
        session::{
            cookies::{
                VerifierFlow, append_cookies, clear_session_cookies, code_verifier_cookie,
                session_cookies, session_tokens,
            },
            SessionTokens,
            gate::RequireUser,
            policy::{RESET_PASSWORD_PATH, safe_return_to},
        },
        state::{AppConfig, AppState},
    },
    backend::{BackendError, Session, SignUpOutcome},
};
use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, HeaderValue, StatusCode, header::InvalidHeaderValue},
};
use std::sync::Arc;
use tracing::{debug, error, info, instrument, warn};

fn auth_failure(err: &BackendError) -> ApiError {
    let failure = AuthFailure::from_backend(err);
    match failure {
        AuthFailure::Generic(_) => error!("Auth provider call failed: {err}"),
        _ => debug!("Auth provider rejected request: {err}"),
    }
    ApiError::Auth(failure)
}

fn cookie_error(err: &InvalidHeaderValue) -> ApiError {
    error!("Failed to build cookie header: {err}");
    ApiError::Auth(AuthFailure::Generic(StatusCode::INTERNAL_SERVER_ERROR))
}

fn missing_payload() -> ApiError {
    ApiError::Auth(AuthFailure::Generic(StatusCode::BAD_REQUEST))
}

fn normalize_email(email: &str) -> Result<String, ApiError> {
    let email = email.trim().to_lowercase();
    if valid_email(&email) {
        Ok(email)
    } else {
        Err(ApiError::Auth(AuthFailure::InvalidEmail))
    }
}

/// `Set-Cookie` headers storing a new session.
pub(crate) fn session_headers(config: &AppConfig, session: &Session) -> Result<HeaderMap, ApiError> {
    let cookies = session_cookies(config, session).map_err(|err| cookie_error(&err))?;
    let mut headers = HeaderMap::new();
    append_cookies(&mut headers, cookies);
    Ok(headers)
}

fn verifier_headers(
    config: &AppConfig,
    flow: VerifierFlow,
    verifier: &str,
) -> Result<HeaderMap, ApiError> {
    let cookie: HeaderValue =
        code_verifier_cookie(config, flow, verifier).map_err(|err| cookie_error(&err))?;
    let mut headers = HeaderMap::new();
    append_cookies(&mut headers, vec![cookie]);
    Ok(headers)
}

#[utoipa::path(
    post,
    path= "/login",
    request_body = LoginRequest,
    responses (
        (status = 200, description = "Signed in, session cookies set", body = RedirectResponse),
        (status = 400, description = "Email not confirmed or malformed request", body = crate::api::error::ErrorBody),
        (status = 401, description = "Invalid credentials", body = crate::api::error::ErrorBody),
        (status = 502, description = "Auth provider failure", body = crate::api::error::ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip(state, payload))]
pub async fn login(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<LoginRequest>>,
) -> Result<(HeaderMap, Json<RedirectResponse>), ApiError> {
    let Some(Json(request)) = payload else {
        return Err(missing_payload());
    };
    let email = normalize_email(&request.email)
        .map_err(|_| ApiError::Auth(AuthFailure::InvalidCredentials))?;

    let session = state
        .backend()
        .sign_in_with_password(&email, &request.password)
        .await
        .map_err(|err| auth_failure(&err))?;

    info!(user_id = %session.user.id, "user signed in");

    let requested = safe_return_to(request.redirect.as_deref())
        .unwrap_or(state.config().default_landing());
    let destination = post_auth_destination(state.backend(), &session, requested).await;
    let headers = session_headers(state.config(), &session)?;

    Ok((headers, Json(RedirectResponse::to(destination))))
}

#[utoipa::path(
    post,
    path= "/signup",
    request_body = SignupRequest,
    responses (
        (status = 200, description = "Account created: either signed in or confirmation email sent", body = SignupResponse),
        (status = 400, description = "Invalid email", body = crate::api::error::ErrorBody),
        (status = 422, description = "Password rules not met", body = PasswordChecklist),
    ),
    tag= "auth"
)]
#[instrument(skip(state, payload))]
pub async fn signup(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<SignupRequest>>,
) -> Result<(HeaderMap, Json<SignupResponse>), ApiError> {
    let Some(Json(request)) = payload else {
        return Err(missing_payload());
    };
    let email = normalize_email(&request.email)?;

    let checklist = PasswordChecklist::evaluate(&request.password, &request.password_confirmation);
    if !checklist.is_satisfied() {
        return Err(ApiError::Checklist(checklist));
    }

    let pkce = Pkce::generate();
    let outcome = state
        .backend()
        .sign_up(
            &email,
            &request.password,
            &state.config().callback_url(VerifierFlow::Signup, None),
            &pkce.challenge,
        )
        .await
        .map_err(|err| auth_failure(&err))?;

    match outcome {
        SignUpOutcome::Session(session) => {
            info!(user_id = %session.user.id, "user signed up and confirmed");
            let headers = session_headers(state.config(), &session)?;
            Ok((
                headers,
                Json(SignupResponse::Redirect {
                    redirect: ONBOARDING_PATH.to_string(),
                }),
            ))
        }
        SignUpOutcome::ConfirmationSent(user) => {
            info!(user_id = %user.id, "user signed up, confirmation pending");
            let headers = verifier_headers(state.config(), VerifierFlow::Signup, &pkce.verifier)?;
            Ok((
                headers,
                Json(SignupResponse::ConfirmationSent {
                    confirmation_sent: true,
                }),
            ))
        }
    }
}

#[utoipa::path(
    post,
    path= "/forgot-password",
    request_body = ForgotPasswordRequest,
    responses (
        (status = 202, description = "Recovery email sent if the account exists"),
        (status = 400, description = "Invalid email", body = crate::api::error::ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip(state, payload))]
pub async fn forgot_password(
    state: Extension<Arc<AppState>>,
    payload: Option<Json<ForgotPasswordRequest>>,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    let Some(Json(request)) = payload else {
        return Err(missing_payload());
    };
    let email = normalize_email(&request.email)?;

    let pkce = Pkce::generate();
    let redirect_to = state
        .config()
        .callback_url(VerifierFlow::Recovery, Some(RESET_PASSWORD_PATH));
    // The answer never reveals whether the account exists.
    if let Err(err) = state
        .backend()
        .recover_password(&email, &redirect_to, &pkce.challenge)
        .await
    {
        warn!("Password recovery request failed: {err}");
    }

    let headers = verifier_headers(state.config(), VerifierFlow::Recovery, &pkce.verifier)?;
    Ok((StatusCode::ACCEPTED, headers))
}

#[utoipa::path(
    post,
    path= "/reset-password",
    request_body = PasswordRequest,
    responses (
        (status = 200, description = "Password updated", body = RedirectResponse),
        (status = 303, description = "No valid session"),
        (status = 422, description = "Password rules not met", body = PasswordChecklist),
    ),
    tag= "auth"
)]
#[instrument(skip(gate, state, payload))]
pub async fn reset_password(
    gate: RequireUser,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<PasswordRequest>>,
) -> Result<Json<RedirectResponse>, ApiError> {
    let RequireUser(authenticated) = gate;
    let Some(Json(request)) = payload else {
        return Err(missing_payload());
    };

    let checklist = PasswordChecklist::evaluate(&request.password, &request.password_confirmation);
    if !checklist.is_satisfied() {
        return Err(ApiError::Checklist(checklist));
    }

    state
        .backend()
        .update_password(&authenticated.access_token, &request.password)
        .await
        .map_err(|err| auth_failure(&err))?;

    info!(user_id = %authenticated.user.id, "password updated");

    Ok(Json(RedirectResponse::to(state.config().default_landing())))
}

#[utoipa::path(
    post,
    path= "/password/checklist",
    request_body = PasswordRequest,
    responses (
        (status = 200, description = "State of each password rule", body = PasswordChecklist),
    ),
    tag= "auth"
)]
pub async fn password_checklist(Json(request): Json<PasswordRequest>) -> Json<PasswordChecklist> {
    Json(PasswordChecklist::evaluate(
        &request.password,
        &request.password_confirmation,
    ))
}

#[utoipa::path(
    post,
    path= "/logout",
    responses (
        (status = 204, description = "Session revoked and cookies cleared"),
    ),
    tag= "auth"
)]
#[instrument(skip(state, tokens, headers))]
pub async fn logout(
    state: Extension<Arc<AppState>>,
    tokens: Option<Extension<SessionTokens>>,
    headers: HeaderMap,
) -> Result<(StatusCode, HeaderMap), ApiError> {
    // The middleware may have refreshed the session; that token is the live one.
    let tokens = tokens.map(|Extension(tokens)| tokens).or_else(|| session_tokens(&headers));
    if let Some(access_token) = tokens.and_then(|tokens| tokens.access_token) {
        if let Err(err) = state.backend().sign_out(&access_token).await {
            warn!("Sign out failed, clearing cookies anyway: {err}");
        }
    }

    let cookies = clear_session_cookies(state.config()).map_err(|err| cookie_error(&err))?;
    let mut response_headers = HeaderMap::new();
    append_cookies(&mut response_headers, cookies);

    Ok((StatusCode::NO_CONTENT, response_headers))
}
