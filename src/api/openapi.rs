use super::handlers::{auth, callback, health, oauth, onboarding, pages};
use utoipa::openapi::{Contact, InfoBuilder, License, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI document.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` document.
/// Routes added outside (like `/`) are intentionally not documented.
pub(crate) fn api_router() -> OpenApiRouter {
    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add the route to OpenAPI.
    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Sign-in, sign-up, password recovery and provider callbacks".to_string());

    let mut onboarding_tag = Tag::new("onboarding");
    onboarding_tag.description = Some("Monthly income capture after the first sign-in".to_string());

    let mut pages_tag = Tag::new("pages");
    pages_tag.description = Some("Data behind each screen of the app".to_string());

    // utoipa-axum 0.1 has no `get_openapi_mut`; `routes` never touches tags, so set them up front.
    let mut doc = cargo_openapi();
    doc.tags = Some(vec![auth_tag, onboarding_tag, pages_tag]);

    let router = OpenApiRouter::with_openapi(doc)
        .routes(routes!(health::health))
        .routes(routes!(pages::login_form, auth::login))
        .routes(routes!(pages::signup_form, auth::signup))
        .routes(routes!(auth::forgot_password))
        .routes(routes!(pages::reset_password_form, auth::reset_password))
        .routes(routes!(auth::password_checklist))
        .routes(routes!(auth::logout))
        .routes(routes!(callback::callback))
        .routes(routes!(oauth::oauth_start))
        .routes(routes!(onboarding::status, onboarding::save))
        .routes(routes!(pages::dashboard))
        .routes(routes!(pages::budget))
        .routes(routes!(pages::transactions))
        .routes(routes!(pages::accounts))
        .routes(routes!(pages::investments))
        .routes(routes!(pages::debts))
        .routes(routes!(pages::settings));

    router
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let mut info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(optional_str(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    info.contact = cargo_contact();
    info.license = cargo_license();

    OpenApiBuilder::new().info(info).build()
}

fn cargo_contact() -> Option<Contact> {
    // Cargo authors are `;` separated and may include "Name <email>".
    let authors = env!("CARGO_PKG_AUTHORS");
    let primary = authors.split(';').next().map(str::trim)?;
    if primary.is_empty() {
        return None;
    }

    let (name, email) = parse_author(primary);
    if name.is_none() && email.is_none() {
        return None;
    }

    let mut contact = Contact::new();
    contact.name = name.map(str::to_string);
    contact.email = email.map(str::to_string);
    Some(contact)
}

fn cargo_license() -> Option<License> {
    let identifier = optional_str(env!("CARGO_PKG_LICENSE"))?;
    let mut license = License::new(identifier);
    license.identifier = Some(identifier.to_string());
    Some(license)
}

fn optional_str(value: &'static str) -> Option<&'static str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed)
    }
}

fn parse_author(author: &str) -> (Option<&str>, Option<&str>) {
    if let Some(start) = author.find('<') {
        let name = author[..start].trim();
        let email = author[start + 1..].trim_end_matches('>').trim();
        let name = if name.is_empty() { None } else { Some(name) };
        let email = if email.is_empty() { None } else { Some(email) };
        (name, email)
    } else {
        let name = author.trim();
        (if name.is_empty() { None } else { Some(name) }, None)
    }
}
