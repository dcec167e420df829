use super::{
    CookieUpdate, SessionTokens,
    cookies::{
        append_cookies, clear_session_cookies, session_cookies, sets_session_cookie, session_tokens,
    },
    policy::{self, Decision},
    resolve,
};
use crate::api::state::AppState;
use axum::{
    extract::{Request, State},
    http::HeaderValue,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;
use tracing::{debug, error};

/// Session middleware applied to every route of the web app.
pub async fn enforce(State(state): State<Arc<AppState>>, mut request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();
    let target = request
        .uri()
        .path_and_query()
        .map_or_else(|| path.clone(), |target| target.as_str().to_string());
    let return_to = policy::return_to_from_query(request.uri().query());

    let resolution = resolve(state.backend(), session_tokens(request.headers())).await;
    // Computed up front so every branch below propagates the same cookies.
    let cookies = cookie_headers(&state, &resolution.cookies);

    let decision = policy::decide(
        &target,
        resolution.authenticated.is_some(),
        return_to.as_deref(),
        state.config().default_landing(),
    );

    let mut response = match decision {
        Decision::PassThrough => {
            if let Some(authenticated) = resolution.authenticated {
                let refresh_token = match &resolution.cookies {
                    CookieUpdate::Set(session) => Some(session.refresh_token.clone()),
                    _ => None,
                };
                request.extensions_mut().insert(SessionTokens {
                    access_token: Some(authenticated.access_token.clone()),
                    refresh_token,
                });
                request.extensions_mut().insert(authenticated);
            }
            next.run(request).await
        }
        Decision::Redirect(location) => {
            debug!(%path, %location, "session policy redirect");
            Redirect::to(&location).into_response()
        }
    };

    // A handler that just issued or cleared the session has the final word.
    if !sets_session_cookie(response.headers()) {
        append_cookies(response.headers_mut(), cookies);
    }
    response
}

fn cookie_headers(state: &AppState, update: &CookieUpdate) -> Vec<HeaderValue> {
    let result = match update {
        CookieUpdate::Keep => return Vec::new(),
        CookieUpdate::Set(session) => session_cookies(state.config(), session),
        CookieUpdate::Clear => clear_session_cookies(state.config()),
    };
    result.unwrap_or_else(|err| {
        error!("Failed to build session cookies: {err}");
        Vec::new()
    })
}
