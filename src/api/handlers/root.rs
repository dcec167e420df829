use crate::api::state::AppState;
use axum::{Extension, response::Redirect};
use std::sync::Arc;

// axum handler for /, the middleware has already vetted the session
pub async fn root(state: Extension<Arc<AppState>>) -> Redirect {
    Redirect::to(state.config().default_landing())
}
