//! Maps validated CLI arguments to the action to run.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{identity, session};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let session_opts = session::Options::parse(matches)?;
    let identity_opts = identity::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        environment: session_opts.environment,
        cookie_domain: session_opts.cookie_domain,
        session_secret: session_opts.session_secret,
        session_issuer: session_opts.session_issuer,
        session_check_revoked: session_opts.check_revoked,
        login_ttl_seconds: session_opts.login_ttl_seconds,
        country_code: session_opts.country_code,
        identity_api_key: identity_opts.api_key,
        identity_base_url: identity_opts.base_url,
    }))
}
