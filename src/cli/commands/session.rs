use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgMatches, Command, builder::BoolishValueParser};
use secrecy::SecretString;

use crate::api::handlers::auth::Environment;

pub const ARG_ENVIRONMENT: &str = "environment";
pub const ARG_COOKIE_DOMAIN: &str = "cookie-domain";
pub const ARG_SESSION_SECRET: &str = "session-secret";
pub const ARG_SESSION_ISSUER: &str = "session-issuer";
pub const ARG_SESSION_CHECK_REVOKED: &str = "session-check-revoked";
pub const ARG_LOGIN_TTL_SECONDS: &str = "login-ttl-seconds";
pub const ARG_COUNTRY_CODE: &str = "country-code";

#[derive(Debug)]
pub struct Options {
    pub environment: Environment,
    pub cookie_domain: String,
    pub session_secret: SecretString,
    pub session_issuer: String,
    pub check_revoked: bool,
    pub login_ttl_seconds: u64,
    pub country_code: String,
}

fn required(matches: &ArgMatches, id: &str) -> Result<String> {
    matches
        .get_one::<String>(id)
        .cloned()
        .with_context(|| format!("missing required argument: --{id}"))
}

impl Options {
    /// # Errors
    /// Returns an error if a required argument is missing or a value does not parse.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let environment = required(matches, ARG_ENVIRONMENT)?
            .parse::<Environment>()
            .map_err(|err| anyhow!(err))?;

        Ok(Self {
            environment,
            cookie_domain: required(matches, ARG_COOKIE_DOMAIN)?,
            session_secret: SecretString::from(required(matches, ARG_SESSION_SECRET)?),
            session_issuer: required(matches, ARG_SESSION_ISSUER)?,
            check_revoked: matches
                .get_one::<bool>(ARG_SESSION_CHECK_REVOKED)
                .copied()
                .unwrap_or(true),
            login_ttl_seconds: matches
                .get_one::<u64>(ARG_LOGIN_TTL_SECONDS)
                .copied()
                .unwrap_or(300),
            country_code: required(matches, ARG_COUNTRY_CODE)?,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_ENVIRONMENT)
                .long(ARG_ENVIRONMENT)
                .help("Deployment environment; production adds Secure and Domain to the cookie")
                .env("AGRODIGITO_ENV")
                .default_value("development")
                .value_parser(["development", "production", "dev", "prod"])
                .ignore_case(true),
        )
        .arg(
            Arg::new(ARG_COOKIE_DOMAIN)
                .long(ARG_COOKIE_DOMAIN)
                .help("Session cookie domain in production")
                .env("AGRODIGITO_COOKIE_DOMAIN")
                .default_value(".agrodigito.com"),
        )
        .arg(
            Arg::new(ARG_SESSION_SECRET)
                .long(ARG_SESSION_SECRET)
                .help("HS256 key for session artifacts (at least 32 bytes)")
                .env("AGRODIGITO_SESSION_SECRET")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_SESSION_ISSUER)
                .long(ARG_SESSION_ISSUER)
                .help("Issuer written into and required from session artifacts")
                .env("AGRODIGITO_SESSION_ISSUER")
                .default_value("https://admin.agrodigito.com"),
        )
        .arg(
            Arg::new(ARG_SESSION_CHECK_REVOKED)
                .long(ARG_SESSION_CHECK_REVOKED)
                .help("Consult the revocation table on every page load")
                .env("AGRODIGITO_SESSION_CHECK_REVOKED")
                .default_value("true")
                .value_parser(BoolishValueParser::new()),
        )
        .arg(
            Arg::new(ARG_LOGIN_TTL_SECONDS)
                .long(ARG_LOGIN_TTL_SECONDS)
                .help("How long a pending sign-in attempt is kept")
                .env("AGRODIGITO_LOGIN_TTL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_COUNTRY_CODE)
                .long(ARG_COUNTRY_CODE)
                .help("Country code prepended to local phone numbers")
                .env("AGRODIGITO_COUNTRY_CODE")
                .default_value("+255"),
        )
}
