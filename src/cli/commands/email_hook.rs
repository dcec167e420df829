use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const COMMAND: &str = "email-hook";
pub const ARG_PORT: &str = "port";
pub const ARG_HOOK_SECRET: &str = "hook-secret";
pub const ARG_EMAIL_API_URL: &str = "email-api-url";
pub const ARG_EMAIL_API_KEY: &str = "email-api-key";
pub const ARG_EMAIL_FROM: &str = "email-from";

#[derive(Debug, Clone)]
pub struct Options {
    pub port: u16,
    pub hook_secret: SecretString,
    pub email_api_url: String,
    pub email_api_key: Option<SecretString>,
    pub email_from: String,
}

impl Options {
    /// Parse hook arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the hook secret is missing or empty.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let hook_secret = match matches.get_one::<String>(ARG_HOOK_SECRET) {
            Some(value) if !value.trim().is_empty() => SecretString::from(value.trim().to_string()),
            _ => anyhow::bail!("missing required argument: --{ARG_HOOK_SECRET}"),
        };

        Ok(Self {
            port: matches.get_one::<u16>(ARG_PORT).copied().unwrap_or(8081),
            hook_secret,
            email_api_url: matches
                .get_one::<String>(ARG_EMAIL_API_URL)
                .cloned()
                .unwrap_or_else(|| "https://api.resend.com/emails".to_string()),
            email_api_key: matches
                .get_one::<String>(ARG_EMAIL_API_KEY)
                .filter(|value| !value.trim().is_empty())
                .map(|value| SecretString::from(value.clone())),
            email_from: matches
                .get_one::<String>(ARG_EMAIL_FROM)
                .cloned()
                .unwrap_or_else(|| "Patrimoine <noreply@patrimoine.app>".to_string()),
        })
    }
}

#[must_use]
pub fn command() -> Command {
    let command = Command::new(COMMAND)
        .about("Serve the send-email hook called by the auth provider")
        .arg(
            Arg::new(ARG_PORT)
                .short('p')
                .long(ARG_PORT)
                .help("Port to listen on")
                .default_value("8081")
                .env("PATRIMOINE_HOOK_PORT")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new(ARG_HOOK_SECRET)
                .long(ARG_HOOK_SECRET)
                .help("Hook signing secret, format: v1,whsec_<base64>")
                .env("PATRIMOINE_HOOK_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_EMAIL_API_URL)
                .long(ARG_EMAIL_API_URL)
                .help("Transactional email API endpoint")
                .env("PATRIMOINE_EMAIL_API_URL")
                .default_value("https://api.resend.com/emails"),
        )
        .arg(
            Arg::new(ARG_EMAIL_API_KEY)
                .long(ARG_EMAIL_API_KEY)
                .help("Email API key; without it emails are only logged")
                .env("PATRIMOINE_EMAIL_API_KEY")
                .hide_env_values(true),
        )
        .arg(
            Arg::new(ARG_EMAIL_FROM)
                .long(ARG_EMAIL_FROM)
                .help("Sender address")
                .env("PATRIMOINE_EMAIL_FROM")
                .default_value("Patrimoine <noreply@patrimoine.app>"),
        );

    super::backend::with_url_arg(command)
}
