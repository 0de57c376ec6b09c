use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};
use secrecy::SecretString;

use crate::identity::firebase::DEFAULT_BASE_URL;

pub const ARG_IDENTITY_API_KEY: &str = "identity-api-key";
pub const ARG_IDENTITY_BASE_URL: &str = "identity-base-url";

#[derive(Debug)]
pub struct Options {
    pub api_key: SecretString,
    pub base_url: String,
}

impl Options {
    /// # Errors
    /// Returns an error if the API key is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        let api_key = matches
            .get_one::<String>(ARG_IDENTITY_API_KEY)
            .cloned()
            .context("missing required argument: --identity-api-key")?;
        let base_url = matches
            .get_one::<String>(ARG_IDENTITY_BASE_URL)
            .cloned()
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());

        Ok(Self {
            api_key: SecretString::from(api_key),
            base_url,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_IDENTITY_API_KEY)
                .long(ARG_IDENTITY_API_KEY)
                .help("Identity Toolkit web API key")
                .env("AGRODIGITO_IDENTITY_API_KEY")
                .hide_env_values(true)
                .required(true),
        )
        .arg(
            Arg::new(ARG_IDENTITY_BASE_URL)
                .long(ARG_IDENTITY_BASE_URL)
                .help("Identity Toolkit base URL")
                .env("AGRODIGITO_IDENTITY_BASE_URL")
                .default_value(DEFAULT_BASE_URL),
        )
}
