//! # Patrimoine (personal finance web application)
//!
//! `patrimoine` serves the authenticated surface of a personal-finance
//! application whose data and identity live in a hosted database/auth
//! provider. The crate owns the session boundary and thin page data reads:
//!
//! - **Session middleware:** every request is revalidated against the auth
//!   provider, refreshed when the access token expired, and routed through
//!   three path classes (protected, auth-only, onboarding).
//! - **Gate:** protected handlers re-check the session remotely before they
//!   run, independently of the middleware.
//! - **Onboarding:** after sign-in or the OAuth callback, users without a
//!   positive monthly income are sent to `/onboarding`.
//! - **Pages:** dashboard, budget, transactions, accounts, investments, debts
//!   and settings read rows and rollup views through the provider's data API.
//!   Aggregates are computed by the database views, never here.
//!
//! The `email-hook` subcommand runs a separate, stateless webhook that
//! verifies signed auth events and sends the matching transactional email.

pub mod api;
pub mod backend;
pub mod cli;
pub mod hook;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
