//! Route handlers of the web app.
//!
//! Auth handlers talk to the provider's auth API and write session cookies;
//! page handlers are thin reads over the data API for the gated user.

pub mod auth;
pub mod callback;
pub mod health;
pub mod oauth;
pub mod onboarding;
pub mod pages;
pub mod root;
pub mod types;

use regex::Regex;

/// Lightweight email sanity check used by auth handlers before calling the provider.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").is_ok_and(|re| re.is_match(email))
}
