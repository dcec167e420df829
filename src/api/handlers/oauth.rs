use crate::api::{
    error::{ApiError, ErrorBody},
    pkce::Pkce,
    session::{
        cookies::{VerifierFlow, code_verifier_cookie},
        policy::safe_return_to,
    },
    state::AppState,
};
use axum::{
    Json,
    extract::{Extension, Query},
    http::{StatusCode, header::SET_COOKIE},
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, instrument};
use utoipa::IntoParams;

pub const OAUTH_PROVIDERS: &[&str] = &["google", "github", "apple", "azure"];

#[derive(Deserialize, IntoParams, Debug)]
#[into_params(parameter_in = Query)]
pub struct OAuthParams {
    /// One of `google`, `github`, `apple`, `azure`.
    provider: String,
    /// Local path to continue to after the callback.
    next: Option<String>,
}

#[utoipa::path(
    get,
    path= "/auth/oauth",
    params(OAuthParams),
    responses (
        (status = 303, description = "Redirect to the provider's authorize endpoint"),
        (status = 400, description = "Unsupported provider", body = ErrorBody),
    ),
    tag= "auth"
)]
#[instrument(skip(state))]
pub async fn oauth_start(
    state: Extension<Arc<AppState>>,
    Query(params): Query<OAuthParams>,
) -> Response {
    if !OAUTH_PROVIDERS.contains(&params.provider.as_str()) {
        debug!("unsupported OAuth provider requested");
        return (
            StatusCode::BAD_REQUEST,
            Json(ErrorBody::new("Fournisseur de connexion non pris en charge.")),
        )
            .into_response();
    }

    let config = state.config();
    let next = safe_return_to(params.next.as_deref()).unwrap_or(config.default_landing());
    let pkce = Pkce::generate();

    let authorize_url = match state.backend().authorize_url(
        &params.provider,
        &config.callback_url(VerifierFlow::OAuth, Some(next)),
        &pkce.challenge,
    ) {
        Ok(url) => url,
        Err(err) => return ApiError::Backend(err).into_response(),
    };

    let cookie = match code_verifier_cookie(config, VerifierFlow::OAuth, &pkce.verifier) {
        Ok(cookie) => cookie,
        Err(err) => {
            error!("Failed to build verifier cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response = Redirect::to(authorize_url.as_str()).into_response();
    response.headers_mut().append(SET_COOKIE, cookie);
    response
}

#[cfg(test)]
mod tests {
    use crate::api::{
        pkce::challenge_for,
        test_support::{StubBackend, test_app},
    };
    use anyhow::{Context, Result};
    use axum::{
        body::Body,
        http::{
            Request, StatusCode,
            header::{LOCATION, SET_COOKIE},
        },
    };
    use tower::ServiceExt;
    use url::Url;

    #[tokio::test]
    async fn redirects_to_provider_with_pkce_challenge() -> Result<()> {
        let response = test_app(StubBackend::default())
            .oneshot(
                Request::builder()
                    .uri("/auth/oauth?provider=google&next=%2Fbudget")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);

        let cookie = response
            .headers()
            .get(SET_COOKIE)
            .and_then(|v| v.to_str().ok())
            .context("verifier cookie")?;
        let verifier = cookie
            .strip_prefix("patrimoine-code-verifier=")
            .and_then(|rest| rest.split(';').next())
            .context("verifier value")?;

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|v| v.to_str().ok())
            .context("location")?;
        let url = Url::parse(location)?;
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert!(pairs.contains(&("provider".to_string(), "google".to_string())));
        assert!(pairs.contains(&(
            "redirect_to".to_string(),
            "http://localhost:8080/auth/callback?next=%2Fbudget".to_string()
        )));
        assert!(pairs.contains(&("code_challenge".to_string(), challenge_for(verifier))));
        Ok(())
    }

    #[tokio::test]
    async fn rejects_unknown_provider() -> Result<()> {
        let response = test_app(StubBackend::default())
            .oneshot(
                Request::builder()
                    .uri("/auth/oauth?provider=myspace")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(response.headers().get(SET_COOKIE).is_none());
        Ok(())
    }
}
