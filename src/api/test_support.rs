//! In-memory backend and helpers shared by the api unit tests.

use super::{AppConfig, AppState, router};
use crate::backend::{Backend, BackendError, OtpType, Session, SignUpOutcome, User};
use anyhow::Result;
use async_trait::async_trait;
use axum::{Router, body::to_bytes, response::Response};
use serde_json::{Value, json};
use std::{
    collections::{HashMap, HashSet},
    sync::{Arc, Mutex},
};
use url::Url;
use uuid::Uuid;

pub(crate) const USER_ID: &str = "5b1d3c9e-6a0f-4f53-9d8c-1f6f3b2a7e10";
pub(crate) const USER_UUID: Uuid = Uuid::from_u128(0x5b1d_3c9e_6a0f_4f53_9d8c_1f6f_3b2a_7e10);
pub(crate) const SITE_URL: &str = "http://localhost:8080";

pub(crate) fn user() -> User {
    User {
        id: USER_UUID,
        email: Some("marie@example.fr".to_string()),
        email_confirmed_at: Some("2024-05-01T10:00:00Z".to_string()),
        created_at: None,
    }
}

pub(crate) fn session(access_token: &str) -> Session {
    Session {
        access_token: access_token.to_string(),
        refresh_token: format!("{access_token}-refresh"),
        expires_in: 3600,
        token_type: Some("bearer".to_string()),
        user: user(),
    }
}

fn unavailable_error() -> BackendError {
    BackendError::Api {
        status: 503,
        code: None,
        message: "Service Unavailable".to_string(),
    }
}

#[derive(Default)]
pub(crate) struct StubBackend {
    access_tokens: HashSet<String>,
    refresh_tokens: HashMap<String, String>,
    passwords: HashMap<String, String>,
    unconfirmed: HashSet<String>,
    codes: HashSet<String>,
    token_hashes: HashSet<String>,
    auto_confirm: bool,
    unavailable: bool,
    profile: Option<Value>,
    profile_error: bool,
    rows: HashMap<String, Value>,
    pub(crate) calls: Mutex<Vec<String>>,
    pub(crate) selects: Mutex<Vec<(String, Vec<(String, String)>)>>,
    pub(crate) updates: Mutex<Vec<(String, Vec<(String, String)>, Value)>>,
}

impl StubBackend {
    /// Accept `token` as a valid access token.
    pub(crate) fn with_user(mut self, token: &str) -> Self {
        self.access_tokens.insert(token.to_string());
        self
    }

    /// Accept `refresh` and answer with a session whose access token is `new_access`.
    pub(crate) fn with_refresh(mut self, refresh: &str, new_access: &str) -> Self {
        self.refresh_tokens
            .insert(refresh.to_string(), new_access.to_string());
        self.access_tokens.insert(new_access.to_string());
        self
    }

    pub(crate) fn with_password(mut self, email: &str, password: &str) -> Self {
        self.passwords
            .insert(email.to_string(), password.to_string());
        self.access_tokens.insert("signed-in".to_string());
        self
    }

    pub(crate) fn with_unconfirmed(mut self, email: &str) -> Self {
        self.unconfirmed.insert(email.to_string());
        self
    }

    pub(crate) fn with_code(mut self, code: &str) -> Self {
        self.codes.insert(code.to_string());
        self
    }

    pub(crate) fn with_token_hash(mut self, token_hash: &str) -> Self {
        self.token_hashes.insert(token_hash.to_string());
        self
    }

    pub(crate) fn auto_confirm(mut self) -> Self {
        self.auto_confirm = true;
        self
    }

    pub(crate) fn unavailable(mut self) -> Self {
        self.unavailable = true;
        self
    }

    /// Store a profile row; `None` income mirrors a fresh signup.
    pub(crate) fn with_profile(mut self, monthly_income: Option<f64>) -> Self {
        self.profile = Some(json!({
            "id": USER_ID,
            "email": "marie@example.fr",
            "full_name": "Marie Curie",
            "monthly_income": monthly_income,
            "currency": "EUR",
        }));
        self
    }

    pub(crate) fn with_profile_error(mut self) -> Self {
        self.profile_error = true;
        self
    }

    pub(crate) fn with_rows(mut self, relation: &str, rows: Value) -> Self {
        self.rows.insert(relation.to_string(), rows);
        self
    }

    fn record(&self, call: String) {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(call);
        }
    }

    pub(crate) fn recorded(&self) -> Vec<String> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    fn check_available(&self) -> Result<(), BackendError> {
        if self.unavailable {
            Err(unavailable_error())
        } else {
            Ok(())
        }
    }
}

fn owned(query: &[(&str, String)]) -> Vec<(String, String)> {
    query
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

#[async_trait]
impl Backend for StubBackend {
    async fn get_user(&self, access_token: &str) -> Result<User, BackendError> {
        self.check_available()?;
        if self.access_tokens.contains(access_token) {
            Ok(user())
        } else {
            Err(BackendError::Unauthorized)
        }
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        self.check_available()?;
        self.refresh_tokens
            .get(refresh_token)
            .map(|access| session(access))
            .ok_or(BackendError::Unauthorized)
    }

    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        self.check_available()?;
        self.record(format!("sign_in:{email}"));
        if self.passwords.get(email).is_some_and(|p| p == password) {
            if self.unconfirmed.contains(email) {
                return Err(BackendError::Api {
                    status: 400,
                    code: Some("email_not_confirmed".to_string()),
                    message: "Email not confirmed".to_string(),
                });
            }
            return Ok(session("signed-in"));
        }
        Err(BackendError::Api {
            status: 400,
            code: Some("invalid_credentials".to_string()),
            message: "Invalid login credentials".to_string(),
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<SignUpOutcome, BackendError> {
        self.check_available()?;
        self.record(format!("sign_up:{email}:{redirect_to}:{}", !code_challenge.is_empty()));
        if self.auto_confirm {
            Ok(SignUpOutcome::Session(Box::new(session("new-user"))))
        } else {
            Ok(SignUpOutcome::ConfirmationSent(user()))
        }
    }

    async fn recover_password(
        &self,
        email: &str,
        redirect_to: &str,
        _code_challenge: &str,
    ) -> Result<(), BackendError> {
        self.check_available()?;
        self.record(format!("recover:{email}:{redirect_to}"));
        Ok(())
    }

    async fn update_password(
        &self,
        access_token: &str,
        _password: &str,
    ) -> Result<User, BackendError> {
        self.check_available()?;
        self.record(format!("update_password:{access_token}"));
        Ok(user())
    }

    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<Session, BackendError> {
        self.check_available()?;
        self.record(format!("exchange:{auth_code}:{code_verifier}"));
        if self.codes.contains(auth_code) {
            Ok(session("from-code"))
        } else {
            Err(BackendError::Unauthorized)
        }
    }

    async fn verify_otp(
        &self,
        token_hash: &str,
        otp_type: OtpType,
    ) -> Result<Session, BackendError> {
        self.check_available()?;
        self.record(format!("verify:{token_hash}:{otp_type:?}"));
        if self.token_hashes.contains(token_hash) {
            Ok(session("from-otp"))
        } else {
            Err(BackendError::Unauthorized)
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        self.record(format!("sign_out:{access_token}"));
        self.check_available()
    }

    async fn select(
        &self,
        _access_token: &str,
        relation: &str,
        query: &[(&str, String)],
    ) -> Result<Value, BackendError> {
        self.check_available()?;
        if let Ok(mut selects) = self.selects.lock() {
            selects.push((relation.to_string(), owned(query)));
        }
        if relation == "profiles" {
            if self.profile_error {
                return Err(unavailable_error());
            }
            return Ok(self
                .profile
                .clone()
                .map_or_else(|| json!([]), |row| json!([row])));
        }
        Ok(self.rows.get(relation).cloned().unwrap_or_else(|| json!([])))
    }

    async fn update(
        &self,
        _access_token: &str,
        relation: &str,
        filter: &[(&str, String)],
        patch: &Value,
    ) -> Result<(), BackendError> {
        self.check_available()?;
        if let Ok(mut updates) = self.updates.lock() {
            updates.push((relation.to_string(), owned(filter), patch.clone()));
        }
        Ok(())
    }

    fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<Url, BackendError> {
        let mut url = Url::parse("https://project.example/auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "s256");
        Ok(url)
    }
}

pub(crate) fn test_state(backend: impl Into<Arc<StubBackend>>) -> Arc<AppState> {
    let backend: Arc<StubBackend> = backend.into();
    let config = match AppConfig::new(SITE_URL) {
        Ok(config) => config,
        Err(err) => panic!("test site url must parse: {err}"),
    };
    Arc::new(AppState::new(config, backend))
}

pub(crate) fn test_app(backend: impl Into<Arc<StubBackend>>) -> Router {
    router(test_state(backend))
}

pub(crate) async fn body_json(response: Response) -> Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}
