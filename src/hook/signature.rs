//! Standard Webhooks signature verification.
//!
//! The auth provider signs `"{webhook-id}.{webhook-timestamp}.{body}"` with
//! HMAC-SHA256 and sends one or more `v1,<base64>` signatures, space
//! separated, in `webhook-signature`.

use axum::http::HeaderMap;
use base64::{Engine, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretSlice, SecretString};
use sha2::Sha256;
use std::time::{SystemTime, UNIX_EPOCH};
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

pub const WEBHOOK_ID_HEADER: &str = "webhook-id";
pub const WEBHOOK_TIMESTAMP_HEADER: &str = "webhook-timestamp";
pub const WEBHOOK_SIGNATURE_HEADER: &str = "webhook-signature";

const TIMESTAMP_TOLERANCE_SECONDS: u64 = 5 * 60;
const SIGNATURE_VERSION: &str = "v1";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("missing {0} header")]
    MissingHeader(&'static str),
    #[error("invalid webhook timestamp")]
    InvalidTimestamp,
    #[error("webhook timestamp outside tolerance")]
    Expired,
    #[error("no matching signature")]
    NoMatch,
    #[error("invalid webhook secret")]
    InvalidSecret,
}

pub struct WebhookVerifier {
    key: SecretSlice<u8>,
}

impl WebhookVerifier {
    /// Build a verifier from a `v1,whsec_<base64>` (or `whsec_<base64>`) secret.
    ///
    /// # Errors
    /// Returns an error if the secret is empty or not valid base64.
    pub fn new(secret: &SecretString) -> Result<Self, SignatureError> {
        let raw = secret.expose_secret().trim();
        let raw = raw.strip_prefix("v1,").unwrap_or(raw);
        let raw = raw.strip_prefix("whsec_").unwrap_or(raw);
        let key = STANDARD
            .decode(raw)
            .map_err(|_| SignatureError::InvalidSecret)?;
        if key.is_empty() {
            return Err(SignatureError::InvalidSecret);
        }
        Ok(Self {
            key: SecretSlice::from(key),
        })
    }

    fn mac(&self, id: &str, timestamp: &str, body: &[u8]) -> Result<HmacSha256, SignatureError> {
        let mut mac = HmacSha256::new_from_slice(self.key.expose_secret())
            .map_err(|_| SignatureError::InvalidSecret)?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(body);
        Ok(mac)
    }

    /// `v1,<base64>` signature of a payload, as the provider would send it.
    ///
    /// # Errors
    /// Returns an error if the key cannot initialise the MAC.
    pub fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> Result<String, SignatureError> {
        let mac = self.mac(id, &timestamp.to_string(), body)?;
        Ok(format!(
            "{SIGNATURE_VERSION},{}",
            STANDARD.encode(mac.finalize().into_bytes())
        ))
    }

    /// Verify the request headers against the raw body using the current time.
    ///
    /// # Errors
    /// Returns the first check that failed.
    pub fn verify(&self, headers: &HeaderMap, body: &[u8]) -> Result<(), SignatureError> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX));
        self.verify_at(headers, body, now)
    }

    /// Same as [`Self::verify`] with an explicit clock.
    ///
    /// # Errors
    /// Returns the first check that failed.
    pub fn verify_at(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), SignatureError> {
        let id = header(headers, WEBHOOK_ID_HEADER)?;
        let timestamp = header(headers, WEBHOOK_TIMESTAMP_HEADER)?;
        let signatures = header(headers, WEBHOOK_SIGNATURE_HEADER)?;

        let sent_at: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| SignatureError::InvalidTimestamp)?;
        if now.abs_diff(sent_at) > TIMESTAMP_TOLERANCE_SECONDS {
            return Err(SignatureError::Expired);
        }

        let mac = self.mac(id, timestamp.trim(), body)?;
        let matched = signatures
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == SIGNATURE_VERSION)
            .filter_map(|(_, signature)| STANDARD.decode(signature).ok())
            // verify_slice consumes the MAC and compares in constant time.
            .any(|signature| mac.clone().verify_slice(&signature).is_ok());

        if matched {
            Ok(())
        } else {
            Err(SignatureError::NoMatch)
        }
    }
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .ok_or(SignatureError::MissingHeader(name))
}
