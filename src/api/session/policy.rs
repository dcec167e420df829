//! Route classes and the redirect rules applied by the session middleware.
//!
//! The rules are a pure function of the path, the session validity and the
//! return-to parameter, so they are evaluated here without any I/O.

use url::form_urlencoded;

pub const LOGIN_PATH: &str = "/login";
pub const RETURN_TO_PARAM: &str = "redirect";
pub const RESET_PASSWORD_PATH: &str = "/reset-password";

/// Paths that require a session.
pub const PROTECTED_PREFIXES: &[&str] = &[
    "/dashboard",
    "/budget",
    "/transactions",
    "/accounts",
    "/investments",
    "/debts",
    "/settings",
    RESET_PASSWORD_PATH,
];

/// Paths only meaningful without a session.
pub const AUTH_ONLY_PREFIXES: &[&str] = &[LOGIN_PATH, "/signup", "/forgot-password"];

/// Paths that need a session but never carry a return-to parameter.
pub const SPECIAL_AUTH_PREFIXES: &[&str] = &["/onboarding"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    Protected,
    AuthOnly,
    SpecialAuth,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    PassThrough,
    Redirect(String),
}

/// Match on path segment boundaries: `/budget` matches `/budget/2024` but not `/budgets`.
fn matches_prefix(path: &str, prefix: &str) -> bool {
    path.strip_prefix(prefix)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}

fn matches_any(path: &str, prefixes: &[&str]) -> bool {
    prefixes.iter().any(|prefix| matches_prefix(path, prefix))
}

#[must_use]
pub fn classify(path: &str) -> RouteClass {
    if matches_any(path, PROTECTED_PREFIXES) {
        RouteClass::Protected
    } else if matches_any(path, AUTH_ONLY_PREFIXES) {
        RouteClass::AuthOnly
    } else if matches_any(path, SPECIAL_AUTH_PREFIXES) {
        RouteClass::SpecialAuth
    } else {
        RouteClass::Public
    }
}

/// Decide what happens to a request.
///
/// `target` is the request path with its query string, if any; only the path
/// is classified, the whole target becomes the return-to of a login redirect.
/// `return_to` is the raw `redirect` query parameter of the request; unsafe
/// values are ignored in favour of `default_landing`.
#[must_use]
pub fn decide(
    target: &str,
    authenticated: bool,
    return_to: Option<&str>,
    default_landing: &str,
) -> Decision {
    let path = target.split_once('?').map_or(target, |(path, _)| path);
    match (classify(path), authenticated) {
        (RouteClass::Protected, false) => Decision::Redirect(login_location(Some(target))),
        (RouteClass::AuthOnly, true) => Decision::Redirect(
            safe_return_to(return_to)
                .unwrap_or(default_landing)
                .to_string(),
        ),
        (RouteClass::SpecialAuth, false) => Decision::Redirect(login_location(None)),
        _ => Decision::PassThrough,
    }
}

/// Login URL, optionally carrying the path to come back to.
#[must_use]
pub fn login_location(return_to: Option<&str>) -> String {
    match return_to {
        Some(path) => {
            let query = form_urlencoded::Serializer::new(String::new())
                .append_pair(RETURN_TO_PARAM, path)
                .finish();
            format!("{LOGIN_PATH}?{query}")
        }
        None => LOGIN_PATH.to_string(),
    }
}

/// Accept only same-origin absolute paths as redirect targets.
#[must_use]
pub fn safe_return_to(candidate: Option<&str>) -> Option<&str> {
    let candidate = candidate?;
    let is_local = candidate.starts_with('/')
        && !candidate.starts_with("//")
        && !candidate.starts_with("/\\")
        && !candidate.chars().any(char::is_control);
    is_local.then_some(candidate)
}

/// Extract the return-to parameter from a raw query string.
#[must_use]
pub fn return_to_from_query(query: Option<&str>) -> Option<String> {
    form_urlencoded::parse(query?.as_bytes())
        .find(|(key, _)| key == RETURN_TO_PARAM)
        .map(|(_, value)| value.into_owned())
}
