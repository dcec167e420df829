//! Connection to the hosted auth and data provider.

use anyhow::{Result, bail};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

pub const ARG_BACKEND_URL: &str = "backend-url";
pub const ARG_BACKEND_ANON_KEY: &str = "backend-anon-key";

#[derive(Debug, Clone)]
pub struct Options {
    pub url: String,
    pub anon_key: Option<SecretString>,
}

impl Options {
    /// Parse backend arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the backend URL is missing or empty.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let url = match matches.get_one::<String>(ARG_BACKEND_URL) {
            Some(value) if !value.trim().is_empty() => value.trim().to_string(),
            _ => bail!("missing required argument: --{ARG_BACKEND_URL}"),
        };

        // clap lets empty env values through
        let anon_key = matches
            .try_get_one::<String>(ARG_BACKEND_ANON_KEY)
            .ok()
            .flatten()
            .filter(|value| !value.trim().is_empty())
            .map(|value| SecretString::from(value.clone()));

        Ok(Self { url, anon_key })
    }

    /// # Errors
    /// Returns an error if no anon key was given.
    pub fn require_anon_key(&self) -> Result<SecretString> {
        match &self.anon_key {
            Some(key) => Ok(key.clone()),
            None => bail!("missing required argument: --{ARG_BACKEND_ANON_KEY}"),
        }
    }
}

fn url_arg() -> Arg {
    Arg::new(ARG_BACKEND_URL)
        .long(ARG_BACKEND_URL)
        .help("Project URL of the auth and data provider, example: https://<project>.supabase.co")
        .env("PATRIMOINE_BACKEND_URL")
        .required(true)
}

/// URL and public API key, for commands that call the provider.
#[must_use]
pub fn with_args(command: Command) -> Command {
    command.arg(url_arg()).arg(
        Arg::new(ARG_BACKEND_ANON_KEY)
            .long(ARG_BACKEND_ANON_KEY)
            .help("Public (anon) API key of the provider")
            .env("PATRIMOINE_BACKEND_ANON_KEY")
            .hide_env_values(true)
            .required(true),
    )
}

/// URL only, for commands that just build links to the provider.
#[must_use]
pub fn with_url_arg(command: Command) -> Command {
    command.arg(url_arg())
}
