//! Auth state, configuration, and pending login attempts.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use uuid::Uuid;

use super::{admin::AdminHandle, flow::LoginFlow, phone::DEFAULT_COUNTRY_CODE};

/// Five days, fixed.
pub(crate) const SESSION_TTL_SECONDS: i64 = 5 * 24 * 60 * 60;
const DEFAULT_LOGIN_TTL_SECONDS: u64 = 5 * 60;
const DEFAULT_COOKIE_DOMAIN: &str = ".agrodigito.com";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Environment {
    #[default]
    Development,
    Production,
}

impl Environment {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Development => "development",
            Self::Production => "production",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Self::Development),
            "production" | "prod" => Ok(Self::Production),
            other => Err(format!("unknown environment: {other}")),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug)]
pub struct AuthConfig {
    environment: Environment,
    cookie_domain: String,
    check_revoked: bool,
    login_ttl_seconds: u64,
    country_code: String,
}

impl AuthConfig {
    #[must_use]
    pub fn new(environment: Environment) -> Self {
        Self {
            environment,
            cookie_domain: DEFAULT_COOKIE_DOMAIN.to_string(),
            check_revoked: true,
            login_ttl_seconds: DEFAULT_LOGIN_TTL_SECONDS,
            country_code: DEFAULT_COUNTRY_CODE.to_string(),
        }
    }

    #[must_use]
    pub fn with_cookie_domain(mut self, domain: String) -> Self {
        self.cookie_domain = domain;
        self
    }

    #[must_use]
    pub fn with_check_revoked(mut self, check_revoked: bool) -> Self {
        self.check_revoked = check_revoked;
        self
    }

    #[must_use]
    pub fn with_login_ttl_seconds(mut self, seconds: u64) -> Self {
        self.login_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_country_code(mut self, country_code: String) -> Self {
        self.country_code = country_code;
        self
    }

    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    #[must_use]
    pub fn session_ttl_seconds(&self) -> i64 {
        SESSION_TTL_SECONDS
    }

    #[must_use]
    pub fn check_revoked(&self) -> bool {
        self.check_revoked
    }

    #[must_use]
    pub fn login_ttl_seconds(&self) -> u64 {
        self.login_ttl_seconds
    }

    #[must_use]
    pub fn country_code(&self) -> &str {
        &self.country_code
    }

    /// Cookies are only marked `Secure` in production.
    #[must_use]
    pub fn session_cookie_secure(&self) -> bool {
        self.environment == Environment::Production
    }

    /// Cookie domain, only applied in production.
    #[must_use]
    pub fn session_cookie_domain(&self) -> Option<&str> {
        match self.environment {
            Environment::Production if !self.cookie_domain.is_empty() => {
                Some(self.cookie_domain.as_str())
            }
            _ => None,
        }
    }
}

pub(crate) struct PendingLogin {
    pub(crate) flow: LoginFlow,
    created_at: Instant,
}

/// Login attempts waiting for the next step, keyed by `login_id`.
pub struct LoginAttempts {
    ttl: Duration,
    attempts: Mutex<HashMap<Uuid, PendingLogin>>,
}

impl LoginAttempts {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            attempts: Mutex::new(HashMap::new()),
        }
    }

    pub(crate) async fn store(&self, flow: LoginFlow) -> Uuid {
        let login_id = Uuid::new_v4();
        let mut attempts = self.attempts.lock().await;
        attempts.retain(|_, entry| entry.created_at.elapsed() < self.ttl);
        attempts.insert(
            login_id,
            PendingLogin {
                flow,
                created_at: Instant::now(),
            },
        );
        login_id
    }

    /// Remove an attempt; expired attempts are dropped and reported as missing.
    pub(crate) async fn take(&self, login_id: Uuid) -> Option<PendingLogin> {
        let mut attempts = self.attempts.lock().await;
        match attempts.remove(&login_id) {
            Some(entry) if entry.created_at.elapsed() < self.ttl => Some(entry),
            _ => None,
        }
    }

    /// Put an attempt back under its id, keeping its original deadline.
    pub(crate) async fn restore(&self, login_id: Uuid, pending: PendingLogin) {
        let mut attempts = self.attempts.lock().await;
        attempts.insert(login_id, pending);
    }

    #[cfg(test)]
    pub(crate) async fn len(&self) -> usize {
        self.attempts.lock().await.len()
    }
}

pub struct AuthState {
    config: AuthConfig,
    admin: AdminHandle,
    logins: LoginAttempts,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig, admin: AdminHandle) -> Self {
        let logins = LoginAttempts::new(Duration::from_secs(config.login_ttl_seconds()));
        Self {
            config,
            admin,
            logins,
        }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    #[must_use]
    pub fn admin(&self) -> &AdminHandle {
        &self.admin
    }

    pub(crate) fn logins(&self) -> &LoginAttempts {
        &self.logins
    }
}
