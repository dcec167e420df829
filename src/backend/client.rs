use super::{Backend, BackendError, OtpType, Session, SignUpOutcome, User};
use crate::APP_USER_AGENT;
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response};
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const AUTH_PREFIX: &str = "auth/v1/";
const REST_PREFIX: &str = "rest/v1/";
const REQUEST_TIMEOUT_SECONDS: u64 = 10;

/// `reqwest` implementation of [`Backend`].
#[derive(Clone, Debug)]
pub struct HttpBackend {
    client: Client,
    base_url: Url,
    anon_key: SecretString,
}

impl HttpBackend {
    /// Build a client for the project at `base_url`.
    ///
    /// # Errors
    /// Returns an error if the URL is not http(s) or the HTTP client cannot be built.
    pub fn new(base_url: &str, anon_key: SecretString) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).with_context(|| format!("Invalid backend URL: {base_url}"))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(anyhow!(
                "Backend URL must use http or https: {base_url}"
            ));
        }
        // Joining relative endpoints must keep any path prefix of the project URL.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECONDS))
            .build()
            .context("Failed to build backend HTTP client")?;

        Ok(Self {
            client,
            base_url,
            anon_key,
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, prefix: &str, path: &str) -> Result<Url, BackendError> {
        Ok(self.base_url.join(prefix)?.join(path)?)
    }

    /// Every call carries the API key; `bearer` defaults to the key itself.
    fn request(&self, method: Method, url: Url, bearer: Option<&str>) -> RequestBuilder {
        let anon_key = self.anon_key.expose_secret();
        self.client
            .request(method, url)
            .header("apikey", anon_key)
            .bearer_auth(bearer.unwrap_or(anon_key))
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<Session, BackendError> {
        let url = self.endpoint(AUTH_PREFIX, "token")?;
        let response = self
            .request(Method::POST, url, None)
            .query(&[("grant_type", grant_type)])
            .json(&body)
            .send()
            .await?;
        // Refresh and code exchanges fail with 400 when the presented grant is spent.
        let token_call = grant_type != "password";
        decode(response, token_call).await
    }
}

async fn check(response: Response, token_call: bool) -> Result<Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    debug!("backend error response: {status}");
    Err(BackendError::from_response(status, &body, token_call))
}

async fn decode<T: DeserializeOwned>(response: Response, token_call: bool) -> Result<T, BackendError> {
    let response = check(response, token_call).await?;
    let bytes = response.bytes().await?;
    serde_json::from_slice(&bytes).map_err(|err| BackendError::Decode(err.to_string()))
}

#[async_trait]
impl Backend for HttpBackend {
    #[instrument(skip_all)]
    async fn get_user(&self, access_token: &str) -> Result<User, BackendError> {
        let url = self.endpoint(AUTH_PREFIX, "user")?;
        let response = self
            .request(Method::GET, url, Some(access_token))
            .send()
            .await?;
        decode(response, true).await
    }

    #[instrument(skip_all)]
    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    #[instrument(skip(self, password))]
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, BackendError> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    #[instrument(skip(self, password, code_challenge))]
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<SignUpOutcome, BackendError> {
        let url = self.endpoint(AUTH_PREFIX, "signup")?;
        let response = self
            .request(Method::POST, url, None)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({
                "email": email,
                "password": password,
                "code_challenge": code_challenge,
                "code_challenge_method": "s256",
            }))
            .send()
            .await?;
        let body: Value = decode(response, false).await?;

        // With auto-confirm the provider answers with a full session,
        // otherwise with the pending user.
        if body.get("access_token").is_some() {
            let session: Session =
                serde_json::from_value(body).map_err(|err| BackendError::Decode(err.to_string()))?;
            Ok(SignUpOutcome::Session(Box::new(session)))
        } else {
            let user_value = body.get("user").cloned().unwrap_or(body);
            let user: User = serde_json::from_value(user_value)
                .map_err(|err| BackendError::Decode(err.to_string()))?;
            Ok(SignUpOutcome::ConfirmationSent(user))
        }
    }

    #[instrument(skip(self, code_challenge))]
    async fn recover_password(
        &self,
        email: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(AUTH_PREFIX, "recover")?;
        let response = self
            .request(Method::POST, url, None)
            .query(&[("redirect_to", redirect_to)])
            .json(&json!({
                "email": email,
                "code_challenge": code_challenge,
                "code_challenge_method": "s256",
            }))
            .send()
            .await?;
        check(response, false).await?;
        Ok(())
    }

    #[instrument(skip_all)]
    async fn update_password(
        &self,
        access_token: &str,
        password: &str,
    ) -> Result<User, BackendError> {
        let url = self.endpoint(AUTH_PREFIX, "user")?;
        let response = self
            .request(Method::PUT, url, Some(access_token))
            .json(&json!({ "password": password }))
            .send()
            .await?;
        decode(response, false).await
    }

    #[instrument(skip_all)]
    async fn exchange_code_for_session(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<Session, BackendError> {
        self.token_grant(
            "pkce",
            json!({ "auth_code": auth_code, "code_verifier": code_verifier }),
        )
        .await
    }

    #[instrument(skip(self, token_hash))]
    async fn verify_otp(
        &self,
        token_hash: &str,
        otp_type: OtpType,
    ) -> Result<Session, BackendError> {
        let url = self.endpoint(AUTH_PREFIX, "verify")?;
        let response = self
            .request(Method::POST, url, None)
            .json(&json!({ "type": otp_type, "token_hash": token_hash }))
            .send()
            .await?;
        decode(response, true).await
    }

    #[instrument(skip_all)]
    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let url = self.endpoint(AUTH_PREFIX, "logout")?;
        let response = self
            .request(Method::POST, url, Some(access_token))
            .send()
            .await?;
        check(response, true).await?;
        Ok(())
    }

    #[instrument(skip(self, access_token, query))]
    async fn select(
        &self,
        access_token: &str,
        relation: &str,
        query: &[(&str, String)],
    ) -> Result<Value, BackendError> {
        let url = self.endpoint(REST_PREFIX, relation)?;
        let response = self
            .request(Method::GET, url, Some(access_token))
            .query(query)
            .send()
            .await?;
        decode(response, false).await
    }

    #[instrument(skip(self, access_token, filter, patch))]
    async fn update(
        &self,
        access_token: &str,
        relation: &str,
        filter: &[(&str, String)],
        patch: &Value,
    ) -> Result<(), BackendError> {
        let url = self.endpoint(REST_PREFIX, relation)?;
        let response = self
            .request(Method::PATCH, url, Some(access_token))
            .header("Prefer", "return=minimal")
            .query(filter)
            .json(patch)
            .send()
            .await?;
        check(response, false).await?;
        Ok(())
    }

    fn authorize_url(
        &self,
        provider: &str,
        redirect_to: &str,
        code_challenge: &str,
    ) -> Result<Url, BackendError> {
        let mut url = self.endpoint(AUTH_PREFIX, "authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", "s256");
        Ok(url)
    }
}
