use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    /// The access or refresh token was rejected by the auth provider.
    #[error("session rejected by auth provider")]
    Unauthorized,
    #[error("backend returned {status}: {message}")]
    Api {
        status: u16,
        code: Option<String>,
        message: String,
    },
    #[error("backend request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("invalid backend response: {0}")]
    Decode(String),
    #[error("invalid backend url: {0}")]
    Url(#[from] url::ParseError),
}

impl BackendError {
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized)
    }

    /// Machine readable error code reported by the provider, if any.
    #[must_use]
    pub fn code(&self) -> Option<&str> {
        match self {
            Self::Api { code, .. } => code.as_deref(),
            _ => None,
        }
    }

    /// Build an error from a non-success response body.
    ///
    /// `token_call` marks endpoints whose 400/401/403 answers mean the presented
    /// token is no longer valid.
    pub(crate) fn from_response(status: StatusCode, body: &str, token_call: bool) -> Self {
        if token_call
            && matches!(
                status,
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            )
        {
            return Self::Unauthorized;
        }

        let parsed: ProviderErrorBody = serde_json::from_str(body).unwrap_or_default();
        let code = parsed
            .error_code
            .or(parsed.error)
            .filter(|code| !code.is_empty());
        let message = parsed
            .msg
            .or(parsed.message)
            .or(parsed.error_description)
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("unexpected status")
                    .to_string()
            });

        Self::Api {
            status: status.as_u16(),
            code,
            message,
        }
    }
}

// The auth API has shipped two error shapes over time:
// `{"error_code": "...", "msg": "..."}` and `{"error": "...", "error_description": "..."}`.
#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    error_code: Option<String>,
    error: Option<String>,
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_calls_map_rejections_to_unauthorized() {
        for status in [
            StatusCode::BAD_REQUEST,
            StatusCode::UNAUTHORIZED,
            StatusCode::FORBIDDEN,
        ] {
            let err = BackendError::from_response(status, "{}", true);
            assert!(err.is_unauthorized(), "{status} should be unauthorized");
        }
    }

    #[test]
    fn token_calls_keep_server_errors() {
        let err = BackendError::from_response(StatusCode::BAD_GATEWAY, "", true);
        assert!(!err.is_unauthorized());
        assert_eq!(err.to_string(), "backend returned 502: Bad Gateway");
    }

    #[test]
    fn parses_current_error_shape() {
        let body = r#"{"code":400,"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#;
        let err = BackendError::from_response(StatusCode::BAD_REQUEST, body, false);
        assert_eq!(err.code(), Some("invalid_credentials"));
        assert!(err.to_string().contains("Invalid login credentials"));
    }

    #[test]
    fn parses_legacy_error_shape() {
        let body = r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#;
        let err = BackendError::from_response(StatusCode::BAD_REQUEST, body, false);
        assert_eq!(err.code(), Some("invalid_grant"));
        assert!(err.to_string().contains("Email not confirmed"));
    }

    #[test]
    fn non_json_body_falls_back_to_reason() {
        let err = BackendError::from_response(StatusCode::SERVICE_UNAVAILABLE, "<html>", false);
        assert_eq!(err.code(), None);
        assert_eq!(
            err.to_string(),
            "backend returned 503: Service Unavailable"
        );
    }
}
