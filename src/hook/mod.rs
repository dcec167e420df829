//! Send-email hook, deployed on its own.
//!
//! The auth provider calls this webhook instead of sending auth emails itself.
//! Each call is signed; the hook verifies the signature, renders the template
//! for the action type and hands the message to an [`sender::EmailSender`].
//! It shares no state with the web app.

pub mod handler;
pub mod sender;
pub mod signature;
pub mod templates;

use crate::api::{handlers::health, make_span, shutdown_signal};
use anyhow::Result;
use axum::{
    Extension, Router,
    http::{HeaderName, HeaderValue},
    routing::{get, post},
};
use sender::EmailSender;
use signature::WebhookVerifier;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::PropagateRequestIdLayer, set_header::SetRequestHeaderLayer, trace::TraceLayer,
};
use tracing::info;
use ulid::Ulid;

pub const SEND_EMAIL_PATH: &str = "/hooks/send-email";

pub struct HookState {
    verifier: WebhookVerifier,
    sender: Arc<dyn EmailSender>,
    backend_url: String,
}

impl HookState {
    #[must_use]
    pub fn new(verifier: WebhookVerifier, sender: Arc<dyn EmailSender>, backend_url: &str) -> Self {
        Self {
            verifier,
            sender,
            backend_url: backend_url.trim_end_matches('/').to_string(),
        }
    }

    #[must_use]
    pub fn verifier(&self) -> &WebhookVerifier {
        &self.verifier
    }

    #[must_use]
    pub fn sender(&self) -> &dyn EmailSender {
        self.sender.as_ref()
    }

    /// Project URL the confirmation links point to.
    #[must_use]
    pub fn backend_url(&self) -> &str {
        &self.backend_url
    }
}

#[must_use]
pub fn router(state: Arc<HookState>) -> Router {
    Router::new()
        .route(SEND_EMAIL_PATH, post(handler::send_email))
        .route("/health", get(health::health))
        .layer(Extension(state))
}

/// Start the hook server
/// # Errors
/// Return error if failed to start the server
pub async fn new(port: u16, state: Arc<HookState>) -> Result<()> {
    let app = router(state).layer(
        ServiceBuilder::new()
            .layer(SetRequestHeaderLayer::if_not_present(
                HeaderName::from_static("x-request-id"),
                |_req: &_| HeaderValue::from_str(Ulid::new().to_string().as_str()).ok(),
            ))
            .layer(PropagateRequestIdLayer::new(HeaderName::from_static(
                "x-request-id",
            )))
            .layer(TraceLayer::new_for_http().make_span_with(make_span)),
    );

    let listener = TcpListener::bind(format!("::0:{port}")).await?;

    info!("Email hook listening on [::]:{}", port);

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}
