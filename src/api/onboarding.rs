//! Onboarding completeness: a profile needs a positive monthly income before
//! the rest of the app is usable.

use crate::backend::{Backend, Profile, Session, fetch_profile};
use tracing::{debug, warn};

pub const ONBOARDING_PATH: &str = "/onboarding";

/// A missing profile, a missing income and a non-positive income all count
/// as incomplete.
#[must_use]
pub fn profile_is_complete(profile: Option<&Profile>) -> bool {
    profile
        .and_then(|profile| profile.monthly_income)
        .is_some_and(|income| income > 0.0)
}

/// Where to send a user who just authenticated and asked for `requested`.
#[must_use]
pub fn destination_after_auth(profile: Option<&Profile>, requested: &str) -> String {
    if profile_is_complete(profile) {
        requested.to_string()
    } else {
        ONBOARDING_PATH.to_string()
    }
}

/// Fetch the user's profile and pick the post-authentication destination.
///
/// A failed profile read sends the user to onboarding, which is reachable
/// with any valid session.
pub async fn post_auth_destination(
    backend: &dyn Backend,
    session: &Session,
    requested: &str,
) -> String {
    match fetch_profile(backend, &session.access_token, session.user.id).await {
        Ok(profile) => {
            let destination = destination_after_auth(profile.as_ref(), requested);
            debug!(user_id = %session.user.id, %destination, "post-auth destination");
            destination
        }
        Err(err) => {
            warn!(user_id = %session.user.id, "profile lookup failed after sign-in: {err}");
            ONBOARDING_PATH.to_string()
        }
    }
}
