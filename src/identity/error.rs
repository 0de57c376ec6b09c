use thiserror::Error;

/// Failures reported by the identity provider boundary.
#[derive(Debug, Error)]
pub enum IdentityError {
    /// The anti-automation credential was rejected; retrying will not help.
    #[error("invalid app credential")]
    InvalidAppCredential,
    #[error("too many attempts, try again later")]
    RateLimited,
    #[error("invalid or expired verification code")]
    InvalidCode,
    #[error("invalid identity assertion: {0}")]
    InvalidAssertion(String),
    #[error("identity provider error: {0}")]
    Provider(String),
    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl IdentityError {
    /// Map an Identity Toolkit error message (e.g. `INVALID_CODE` or
    /// `TOO_MANY_ATTEMPTS_TRY_LATER : ...`) onto an error variant.
    #[must_use]
    pub fn from_provider_message(message: &str) -> Self {
        let code = message
            .split(|c: char| c == ':' || c.is_whitespace())
            .next()
            .unwrap_or_default();

        match code {
            "INVALID_APP_CREDENTIAL" | "MISSING_APP_CREDENTIAL" | "CAPTCHA_CHECK_FAILED" => {
                Self::InvalidAppCredential
            }
            "TOO_MANY_ATTEMPTS_TRY_LATER" | "QUOTA_EXCEEDED" => Self::RateLimited,
            "INVALID_CODE" | "SESSION_EXPIRED" | "INVALID_SESSION_INFO" | "CODE_EXPIRED" => {
                Self::InvalidCode
            }
            "INVALID_ID_TOKEN" | "TOKEN_EXPIRED" | "USER_DISABLED" | "USER_NOT_FOUND" => {
                Self::InvalidAssertion(code.to_string())
            }
            "" => Self::Provider("empty error message".to_string()),
            other => Self::Provider(other.to_string()),
        }
    }
}
