//! Map validated CLI arguments to the action to run.

use crate::cli::{
    actions::{Action, email_hook, server},
    commands::{self, backend},
};
use anyhow::{Result, bail};

/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    match matches.subcommand() {
        Some((commands::server::COMMAND, sub)) => {
            let backend = backend::Options::parse(sub)?;
            let options = commands::server::Options::parse(sub);

            Ok(Action::Server(server::Args {
                port: options.port,
                backend_anon_key: backend.require_anon_key()?,
                backend_url: backend.url,
                site_url: options.site_url,
                default_landing: options.default_landing,
                session_max_age_seconds: options.session_max_age_seconds,
                email_link_max_age_seconds: options.email_link_max_age_seconds,
            }))
        }
        Some((commands::email_hook::COMMAND, sub)) => {
            let backend = backend::Options::parse(sub)?;
            let options = commands::email_hook::Options::parse(sub)?;

            Ok(Action::EmailHook(email_hook::Args {
                port: options.port,
                backend_url: backend.url,
                hook_secret: options.hook_secret,
                email_api_url: options.email_api_url,
                email_api_key: options.email_api_key,
                email_from: options.email_from,
            }))
        }
        Some((name, _)) => bail!("unknown command: {name}"),
        None => bail!("missing command"),
    }
}
