use super::types::{OnboardingRequest, RedirectResponse};
use crate::{
    api::{
        error::ApiError,
        onboarding::profile_is_complete,
        session::gate::RequireUser,
        state::AppState,
    },
    backend::{Profile, Relation, fetch_profile},
};
use axum::{Json, extract::Extension};
use serde::Serialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{info, instrument};
use utoipa::ToSchema;

const INVALID_INCOME_MESSAGE: &str = "Le revenu mensuel doit être supérieur à 0.";

#[derive(ToSchema, Serialize, Debug)]
pub struct OnboardingStatus {
    pub profile: Option<Profile>,
    pub complete: bool,
}

#[utoipa::path(
    get,
    path= "/onboarding",
    responses (
        (status = 200, description = "Current profile and whether onboarding is done", body = OnboardingStatus),
        (status = 303, description = "No valid session"),
    ),
    tag= "onboarding"
)]
#[instrument(skip(gate, state))]
pub async fn status(
    gate: RequireUser,
    state: Extension<Arc<AppState>>,
) -> Result<Json<OnboardingStatus>, ApiError> {
    let RequireUser(authenticated) = gate;
    let profile = fetch_profile(
        state.backend(),
        &authenticated.access_token,
        authenticated.user.id,
    )
    .await?;

    Ok(Json(OnboardingStatus {
        complete: profile_is_complete(profile.as_ref()),
        profile,
    }))
}

#[utoipa::path(
    post,
    path= "/onboarding",
    request_body = OnboardingRequest,
    responses (
        (status = 200, description = "Income saved", body = RedirectResponse),
        (status = 303, description = "No valid session"),
        (status = 422, description = "Income must be a positive number", body = crate::api::error::ErrorBody),
    ),
    tag= "onboarding"
)]
#[instrument(skip(gate, state, payload))]
pub async fn save(
    gate: RequireUser,
    state: Extension<Arc<AppState>>,
    payload: Option<Json<OnboardingRequest>>,
) -> Result<Json<RedirectResponse>, ApiError> {
    let RequireUser(authenticated) = gate;
    let monthly_income = payload
        .map(|Json(request)| request.monthly_income)
        .filter(|income| income.is_finite() && *income > 0.0)
        .ok_or(ApiError::Validation(INVALID_INCOME_MESSAGE))?;

    state
        .backend()
        .update(
            &authenticated.access_token,
            Profile::NAME,
            &[("id", format!("eq.{}", authenticated.user.id))],
            &json!({ "monthly_income": monthly_income }),
        )
        .await?;

    info!(user_id = %authenticated.user.id, "onboarding completed");

    Ok(Json(RedirectResponse::to(state.config().default_landing())))
}

#[cfg(test)]
mod tests {
    use crate::api::test_support::{StubBackend, USER_ID, body_json, test_app};
    use anyhow::Result;
    use axum::{
        body::Body,
        http::{
            Request, StatusCode,
            header::{CONTENT_TYPE, COOKIE},
        },
    };
    use serde_json::{Value, json};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn post(body: &Value) -> Result<Request<Body>> {
        Ok(Request::builder()
            .method("POST")
            .uri("/onboarding")
            .header(CONTENT_TYPE, "application/json")
            .header(COOKIE, "patrimoine-access-token=good-token")
            .body(Body::from(serde_json::to_vec(body)?))?)
    }

    #[tokio::test]
    async fn status_reports_incomplete_profile() -> Result<()> {
        let backend = StubBackend::default()
            .with_user("good-token")
            .with_profile(None);
        let response = test_app(backend)
            .oneshot(
                Request::builder()
                    .uri("/onboarding")
                    .header(COOKIE, "patrimoine-access-token=good-token")
                    .body(Body::empty())?,
            )
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await?;
        assert_eq!(body["complete"], false);
        assert_eq!(body["profile"]["id"], USER_ID);
        Ok(())
    }

    #[tokio::test]
    async fn save_patches_profile_and_redirects() -> Result<()> {
        let backend = Arc::new(StubBackend::default().with_user("good-token"));
        let response = test_app(backend.clone())
            .oneshot(post(&json!({"monthly_income": 2450.5}))?)
            .await?;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await?, json!({"redirect": "/dashboard"}));

        let updates = backend.updates.lock().map(|u| u.clone()).unwrap_or_default();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].0, "profiles");
        assert_eq!(updates[0].1, vec![("id".to_string(), format!("eq.{USER_ID}"))]);
        assert_eq!(updates[0].2, json!({"monthly_income": 2450.5}));
        Ok(())
    }

    #[tokio::test]
    async fn save_rejects_non_positive_income() -> Result<()> {
        for income in [json!(0), json!(-100)] {
            let backend = Arc::new(StubBackend::default().with_user("good-token"));
            let response = test_app(backend.clone())
                .oneshot(post(&json!({ "monthly_income": income }))?)
                .await?;
            assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
            assert!(backend.updates.lock().map(|u| u.is_empty()).unwrap_or(false));
        }
        Ok(())
    }
}
