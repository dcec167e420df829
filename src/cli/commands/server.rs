use clap::{Arg, ArgMatches, Command};

pub const COMMAND: &str = "server";
pub const ARG_PORT: &str = "port";
pub const ARG_SITE_URL: &str = "site-url";
pub const ARG_DEFAULT_LANDING: &str = "default-landing";
pub const ARG_SESSION_MAX_AGE_SECONDS: &str = "session-max-age-seconds";
pub const ARG_EMAIL_LINK_MAX_AGE_SECONDS: &str = "email-link-max-age-seconds";

#[derive(Debug, Clone)]
pub struct Options {
    pub port: u16,
    pub site_url: String,
    pub default_landing: String,
    pub session_max_age_seconds: i64,
    pub email_link_max_age_seconds: i64,
}

impl Options {
    /// Parse web app arguments; every one of them has a default.
    #[must_use]
    pub fn parse(matches: &ArgMatches) -> Self {
        Self {
            port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8080),
            site_url: matches
                .get_one::<String>(ARG_SITE_URL)
                .cloned()
                .unwrap_or_else(|| "http://localhost:8080".to_string()),
            default_landing: matches
                .get_one::<String>(ARG_DEFAULT_LANDING)
                .cloned()
                .unwrap_or_else(|| "/dashboard".to_string()),
            session_max_age_seconds: matches
                .get_one::<i64>(ARG_SESSION_MAX_AGE_SECONDS)
                .copied()
                .unwrap_or(604_800),
            email_link_max_age_seconds: matches
                .get_one::<i64>(ARG_EMAIL_LINK_MAX_AGE_SECONDS)
                .copied()
                .unwrap_or(86_400),
        }
    }
}

#[must_use]
pub fn command() -> Command {
    let command = Command::new(COMMAND)
        .about("Serve the web app")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8080")
                .env("PATRIMOINE_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_SITE_URL)
                .long(ARG_SITE_URL)
                .help("Public origin of the app, used for auth redirect URLs")
                .long_help(
                    "Public origin of the app, used for auth redirect URLs.\n\nAn https origin marks session cookies Secure.",
                )
                .env("PATRIMOINE_SITE_URL")
                .default_value("http://localhost:8080"),
        )
        .arg(
            Arg::new(ARG_DEFAULT_LANDING)
                .long(ARG_DEFAULT_LANDING)
                .help("Path signed-in users land on")
                .env("PATRIMOINE_DEFAULT_LANDING")
                .default_value("/dashboard"),
        )
        .arg(
            Arg::new(ARG_SESSION_MAX_AGE_SECONDS)
                .long(ARG_SESSION_MAX_AGE_SECONDS)
                .help("Refresh cookie lifetime in seconds")
                .env("PATRIMOINE_SESSION_MAX_AGE_SECONDS")
                .default_value("604800")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_EMAIL_LINK_MAX_AGE_SECONDS)
                .long(ARG_EMAIL_LINK_MAX_AGE_SECONDS)
                .help("How long a signup or recovery email link can still be completed, in seconds")
                .long_help(
                    "How long a signup or recovery email link can still be completed, in seconds.\n\nLifetime of the PKCE verifier cookie set when the email is sent. Keep it at least as long as the provider's email link expiry.",
                )
                .env("PATRIMOINE_EMAIL_LINK_MAX_AGE_SECONDS")
                .default_value("86400")
                .value_parser(clap::value_parser!(i64)),
        );

    super::backend::with_args(command)
}
