//! Session cookie parsing and `Set-Cookie` construction.

use super::SessionTokens;
use crate::{api::state::AppConfig, backend::Session};
use axum::http::{
    HeaderMap, HeaderValue,
    header::{COOKIE, InvalidHeaderValue, SET_COOKIE},
};

pub const ACCESS_COOKIE_NAME: &str = "patrimoine-access-token";
pub const REFRESH_COOKIE_NAME: &str = "patrimoine-refresh-token";
pub const CODE_VERIFIER_COOKIE_NAME: &str = "patrimoine-code-verifier";
pub const SIGNUP_CODE_VERIFIER_COOKIE_NAME: &str = "patrimoine-signup-code-verifier";
pub const RECOVERY_CODE_VERIFIER_COOKIE_NAME: &str = "patrimoine-recovery-code-verifier";

/// Query parameter of the callback URL naming the flow that started it.
pub const FLOW_PARAM: &str = "flow";

const OAUTH_CODE_VERIFIER_MAX_AGE_SECONDS: i64 = 10 * 60;

/// The flow a PKCE verifier belongs to.
///
/// Each flow keeps its verifier in its own cookie, so starting one never
/// invalidates a link still pending for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerifierFlow {
    /// Provider redirect, completed within minutes.
    OAuth,
    /// Signup confirmation email.
    Signup,
    /// Password recovery email.
    Recovery,
}

impl VerifierFlow {
    /// Flow named by the callback's `flow` parameter; absent means OAuth.
    #[must_use]
    pub fn from_param(value: Option<&str>) -> Self {
        match value {
            Some("signup") => Self::Signup,
            Some("recovery") => Self::Recovery,
            _ => Self::OAuth,
        }
    }

    /// Value carried in the callback URL, `None` for OAuth.
    #[must_use]
    pub fn param(self) -> Option<&'static str> {
        match self {
            Self::OAuth => None,
            Self::Signup => Some("signup"),
            Self::Recovery => Some("recovery"),
        }
    }

    #[must_use]
    pub fn cookie_name(self) -> &'static str {
        match self {
            Self::OAuth => CODE_VERIFIER_COOKIE_NAME,
            Self::Signup => SIGNUP_CODE_VERIFIER_COOKIE_NAME,
            Self::Recovery => RECOVERY_CODE_VERIFIER_COOKIE_NAME,
        }
    }

    /// Email links must survive until the user opens their mailbox.
    fn max_age(self, config: &AppConfig) -> i64 {
        match self {
            Self::OAuth => OAUTH_CODE_VERIFIER_MAX_AGE_SECONDS,
            Self::Signup | Self::Recovery => config.email_link_max_age_seconds(),
        }
    }
}

/// Read a cookie value from the request headers.
#[must_use]
pub fn read_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    for header in headers.get_all(COOKIE) {
        let Ok(value) = header.to_str() else {
            continue;
        };
        for pair in value.split(';') {
            let mut parts = pair.trim().splitn(2, '=');
            let (Some(key), Some(val)) = (parts.next(), parts.next()) else {
                continue;
            };
            let val = val.trim();
            if key.trim() == name && !val.is_empty() {
                return Some(val.to_string());
            }
        }
    }
    None
}

/// Session tokens carried by the request, `None` when neither cookie is set.
#[must_use]
pub fn session_tokens(headers: &HeaderMap) -> Option<SessionTokens> {
    let access_token = read_cookie(headers, ACCESS_COOKIE_NAME);
    let refresh_token = read_cookie(headers, REFRESH_COOKIE_NAME);
    if access_token.is_none() && refresh_token.is_none() {
        return None;
    }
    Some(SessionTokens {
        access_token,
        refresh_token,
    })
}

fn build_cookie(
    config: &AppConfig,
    name: &str,
    value: &str,
    max_age: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    let mut cookie = format!("{name}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
    if config.cookie_secure() {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

/// Cookies storing a freshly issued session.
///
/// # Errors
/// Returns an error if a token contains bytes not allowed in a header.
pub fn session_cookies(
    config: &AppConfig,
    session: &Session,
) -> Result<Vec<HeaderValue>, InvalidHeaderValue> {
    Ok(vec![
        build_cookie(
            config,
            ACCESS_COOKIE_NAME,
            &session.access_token,
            session.expires_in.max(0),
        )?,
        build_cookie(
            config,
            REFRESH_COOKIE_NAME,
            &session.refresh_token,
            config.session_max_age_seconds(),
        )?,
    ])
}

/// Cookies expiring both session tokens.
///
/// # Errors
/// Returns an error if the cookie cannot be encoded as a header.
pub fn clear_session_cookies(config: &AppConfig) -> Result<Vec<HeaderValue>, InvalidHeaderValue> {
    Ok(vec![
        build_cookie(config, ACCESS_COOKIE_NAME, "", 0)?,
        build_cookie(config, REFRESH_COOKIE_NAME, "", 0)?,
    ])
}

/// # Errors
/// Returns an error if the verifier cannot be encoded as a header.
pub fn code_verifier_cookie(
    config: &AppConfig,
    flow: VerifierFlow,
    verifier: &str,
) -> Result<HeaderValue, InvalidHeaderValue> {
    build_cookie(config, flow.cookie_name(), verifier, flow.max_age(config))
}

/// # Errors
/// Returns an error if the cookie cannot be encoded as a header.
pub fn clear_code_verifier_cookie(
    config: &AppConfig,
    flow: VerifierFlow,
) -> Result<HeaderValue, InvalidHeaderValue> {
    build_cookie(config, flow.cookie_name(), "", 0)
}

/// Whether a response already writes the session cookies itself.
#[must_use]
pub fn sets_session_cookie(headers: &HeaderMap) -> bool {
    let prefix = format!("{ACCESS_COOKIE_NAME}=");
    headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .any(|value| value.starts_with(&prefix))
}

/// Append `Set-Cookie` headers without touching any already present.
pub fn append_cookies(headers: &mut HeaderMap, cookies: Vec<HeaderValue>) {
    for cookie in cookies {
        headers.append(SET_COOKIE, cookie);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::User;
    use anyhow::Result;

    fn session() -> Result<Session> {
        Ok(Session {
            access_token: "acc.ess".to_string(),
            refresh_token: "refresh".to_string(),
            expires_in: 3600,
            token_type: Some("bearer".to_string()),
            user: User {
                id: "5b1d3c9e-6a0f-4f53-9d8c-1f6f3b2a7e10".parse()?,
                email: None,
                email_confirmed_at: None,
                created_at: None,
            },
        })
    }

    #[test]
    fn reads_named_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; patrimoine-access-token=abc.def ; other=1"),
        );
        assert_eq!(
            read_cookie(&headers, ACCESS_COOKIE_NAME),
            Some("abc.def".to_string())
        );
        assert_eq!(read_cookie(&headers, REFRESH_COOKIE_NAME), None);
    }

    #[test]
    fn reads_across_multiple_cookie_headers() {
        let mut headers = HeaderMap::new();
        headers.append(COOKIE, HeaderValue::from_static("theme=dark"));
        headers.append(COOKIE, HeaderValue::from_static("patrimoine-refresh-token=r1"));
        let tokens = session_tokens(&headers);
        assert_eq!(
            tokens.and_then(|t| t.refresh_token),
            Some("r1".to_string())
        );
    }

    #[test]
    fn empty_cookie_values_are_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("patrimoine-access-token="));
        assert!(session_tokens(&headers).is_none());
    }

    #[test]
    fn session_cookies_use_token_lifetimes() -> Result<()> {
        let config = AppConfig::new("https://app.patrimoine.fr")?.with_session_max_age_seconds(600);
        let cookies = session_cookies(&config, &session()?)?;
        assert_eq!(
            cookies[0].to_str()?,
            "patrimoine-access-token=acc.ess; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600; Secure"
        );
        assert_eq!(
            cookies[1].to_str()?,
            "patrimoine-refresh-token=refresh; Path=/; HttpOnly; SameSite=Lax; Max-Age=600; Secure"
        );
        Ok(())
    }

    #[test]
    fn clear_cookies_expire_immediately() -> Result<()> {
        let config = AppConfig::new("http://localhost:8080")?;
        let cookies = clear_session_cookies(&config)?;
        assert_eq!(cookies.len(), 2);
        for cookie in cookies {
            let value = cookie.to_str()?;
            assert!(value.contains("Max-Age=0"));
            assert!(!value.contains("Secure"));
        }
        Ok(())
    }

    #[test]
    fn detects_handler_issued_session_cookie() -> Result<()> {
        let config = AppConfig::new("http://localhost:8080")?;
        let mut headers = HeaderMap::new();
        append_cookies(
            &mut headers,
            vec![code_verifier_cookie(&config, VerifierFlow::OAuth, "v")?],
        );
        assert!(!sets_session_cookie(&headers));
        append_cookies(&mut headers, session_cookies(&config, &session()?)?);
        assert!(sets_session_cookie(&headers));
        Ok(())
    }

    #[test]
    fn oauth_verifier_is_short_lived() -> Result<()> {
        let config = AppConfig::new("http://localhost:8080")?.with_email_link_max_age_seconds(3600);
        assert_eq!(
            code_verifier_cookie(&config, VerifierFlow::OAuth, "v")?.to_str()?,
            "patrimoine-code-verifier=v; Path=/; HttpOnly; SameSite=Lax; Max-Age=600"
        );
        Ok(())
    }

    #[test]
    fn email_link_verifiers_outlive_the_oauth_window() -> Result<()> {
        let config = AppConfig::new("http://localhost:8080")?;
        assert_eq!(
            code_verifier_cookie(&config, VerifierFlow::Signup, "s")?.to_str()?,
            "patrimoine-signup-code-verifier=s; Path=/; HttpOnly; SameSite=Lax; Max-Age=86400"
        );

        let config = config.with_email_link_max_age_seconds(2 * 86_400);
        assert_eq!(
            code_verifier_cookie(&config, VerifierFlow::Recovery, "r")?.to_str()?,
            "patrimoine-recovery-code-verifier=r; Path=/; HttpOnly; SameSite=Lax; Max-Age=172800"
        );
        Ok(())
    }

    #[test]
    fn flows_round_trip_through_callback_param() {
        for flow in [VerifierFlow::OAuth, VerifierFlow::Signup, VerifierFlow::Recovery] {
            assert_eq!(VerifierFlow::from_param(flow.param()), flow);
        }
        assert_eq!(VerifierFlow::from_param(Some("other")), VerifierFlow::OAuth);
    }

    #[test]
    fn append_keeps_existing_set_cookie() -> Result<()> {
        let config = AppConfig::new("http://localhost:8080")?;
        let mut headers = HeaderMap::new();
        headers.insert(SET_COOKIE, HeaderValue::from_static("theme=dark"));
        append_cookies(&mut headers, clear_session_cookies(&config)?);
        assert_eq!(headers.get_all(SET_COOKIE).iter().count(), 3);
        Ok(())
    }
}
