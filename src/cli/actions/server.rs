use crate::api::{
    self,
    handlers::auth::{AdminParams, AuthConfig, Environment, SessionSigner},
};
use anyhow::{Context, Result};
use secrecy::SecretString;
use tracing::info;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub environment: Environment,
    pub cookie_domain: String,
    pub session_secret: SecretString,
    pub session_issuer: String,
    pub session_check_revoked: bool,
    pub login_ttl_seconds: u64,
    pub country_code: String,
    pub identity_api_key: SecretString,
    pub identity_base_url: String,
}

/// Execute the server action.
/// # Errors
/// Returns an error if the session secret is unusable, the database is unreachable,
/// or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    log_startup_args(&args);

    // A bad key must stop startup, not the first sign-in.
    SessionSigner::new(&args.session_secret, args.session_issuer.clone())
        .context("Invalid session secret")?;

    let auth_config = AuthConfig::new(args.environment)
        .with_cookie_domain(args.cookie_domain)
        .with_check_revoked(args.session_check_revoked)
        .with_login_ttl_seconds(args.login_ttl_seconds)
        .with_country_code(args.country_code);

    let admin_params = AdminParams {
        identity_base_url: args.identity_base_url,
        identity_api_key: args.identity_api_key,
        session_secret: args.session_secret,
        session_issuer: args.session_issuer,
    };

    api::new(args.port, args.dsn, auth_config, admin_params).await
}

fn log_startup_args(args: &Args) {
    let entries = [
        ("listen", format!("tcp:{}", args.port)),
        ("dsn", redact_dsn(&args.dsn)),
        ("environment", args.environment.to_string()),
        ("cookie_domain", args.cookie_domain.clone()),
        ("session_issuer", args.session_issuer.clone()),
        (
            "session_check_revoked",
            args.session_check_revoked.to_string(),
        ),
        ("login_ttl_seconds", args.login_ttl_seconds.to_string()),
        ("country_code", args.country_code.clone()),
        ("identity_base_url", args.identity_base_url.clone()),
    ];
    log_entries("Startup configuration", &entries);
}

fn redact_dsn(dsn: &str) -> String {
    match Url::parse(dsn) {
        Ok(mut parsed) => {
            if parsed.password().is_some() {
                let _ = parsed.set_password(Some("REDACTED"));
            }
            parsed.to_string()
        }
        Err(_) => "invalid-dsn".to_string(),
    }
}

fn log_entries(title: &str, entries: &[(&str, String)]) {
    let max_key_len = entries.iter().map(|(key, _)| key.len()).max().unwrap_or(0);
    let mut message = format!(
        "agrodigito {} - {}\n\n{title}:",
        env!("CARGO_PKG_VERSION"),
        short_commit(crate::GIT_COMMIT_HASH)
    );
    for (key, value) in entries {
        let padding = " ".repeat(max_key_len.saturating_sub(key.len()));
        let _ =
            std::fmt::Write::write_fmt(&mut message, format_args!("\n  {key}:{padding} {value}"));
    }
    info!("{message}");
}

fn short_commit(hash: &str) -> String {
    let trimmed = hash.trim();
    if trimmed.len() > 7 {
        trimmed[..7].to_string()
    } else {
        trimmed.to_string()
    }
}
