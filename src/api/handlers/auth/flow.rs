//! Phone sign-in as a three-step state machine.
//!
//! ```text
//! phone --send_code--> otp --input_otp (6 digits, confirmed, exchanged)--> authenticated
//!   ^                   |
//!   +------resend-------+
//! ```
//!
//! Each code request consumes the attached anti-automation challenge, whether
//! the provider accepted it or not, so a retry needs a fresh one.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{error, warn};
use utoipa::ToSchema;

use super::phone::normalize_phone;
use crate::identity::{ConfirmationHandle, IdentityAssertion, IdentityError, IdentityProvider};

pub(crate) const OTP_LENGTH: usize = 6;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum LoginStep {
    Phone,
    Otp,
    Authenticated,
}

/// User-facing login failures. The display text is shown as-is.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LoginError {
    #[error("Please enter a valid phone number.")]
    InvalidPhoneNumber,
    #[error("Verification challenge required.")]
    MissingChallenge,
    #[error("Security blocked: check the app verification settings.")]
    InvalidAppCredential,
    #[error("Too many attempts. Wait 15 minutes.")]
    RateLimited,
    #[error("Failed to send code.")]
    SendFailed,
    #[error("Enter the 6-digit code.")]
    MalformedCode,
    #[error("Invalid code. Please try again.")]
    InvalidCode,
    #[error("This sign-in step is not available right now.")]
    WrongStep,
}

/// Single-use anti-automation token supplied by the client.
pub struct Challenge(String);

impl Challenge {
    /// Returns `None` for blank tokens.
    #[must_use]
    pub fn new(token: &str) -> Option<Self> {
        let token = token.trim();
        (!token.is_empty()).then(|| Self(token.to_string()))
    }
}

impl fmt::Debug for Challenge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Challenge(..)")
    }
}

/// Turns a confirmed identity assertion into a session.
#[async_trait]
pub trait SessionExchange: Send + Sync {
    type Session: Send;
    type Error: fmt::Display + Send;

    async fn exchange(&self, assertion: &IdentityAssertion)
    -> Result<Self::Session, Self::Error>;
}

#[derive(Debug)]
pub enum OtpProgress<S> {
    /// Fewer or more than six characters entered; nothing was submitted.
    Incomplete { entered: usize },
    Authenticated(S),
}

#[derive(Debug)]
pub struct LoginFlow {
    step: LoginStep,
    phone_number: Option<String>,
    confirmation: Option<ConfirmationHandle>,
    challenge: Option<Challenge>,
    otp: String,
}

impl Default for LoginFlow {
    fn default() -> Self {
        Self::new()
    }
}

impl LoginFlow {
    #[must_use]
    pub fn new() -> Self {
        Self {
            step: LoginStep::Phone,
            phone_number: None,
            confirmation: None,
            challenge: None,
            otp: String::new(),
        }
    }

    #[must_use]
    pub fn step(&self) -> LoginStep {
        self.step
    }

    #[must_use]
    pub fn phone_number(&self) -> Option<&str> {
        self.phone_number.as_deref()
    }

    /// Replace the current challenge, if any.
    pub fn attach_challenge(&mut self, challenge: Challenge) {
        self.challenge = Some(challenge);
    }

    #[must_use]
    pub fn has_challenge(&self) -> bool {
        self.challenge.is_some()
    }

    /// Normalize the phone number and ask the provider for a code.
    ///
    /// # Errors
    /// Invalid numbers are rejected before any provider call and keep the
    /// challenge. Every other failure leaves the flow on the phone step with
    /// the challenge consumed.
    pub async fn send_code(
        &mut self,
        verifier: &dyn IdentityProvider,
        raw_phone: &str,
        country_code: &str,
    ) -> Result<(), LoginError> {
        if self.step != LoginStep::Phone {
            return Err(LoginError::WrongStep);
        }

        let phone_number =
            normalize_phone(raw_phone, country_code).ok_or(LoginError::InvalidPhoneNumber)?;
        let challenge = self.challenge.take().ok_or(LoginError::MissingChallenge)?;

        match verifier
            .send_verification_code(&phone_number, &challenge.0)
            .await
        {
            Ok(handle) => {
                self.phone_number = Some(phone_number);
                self.confirmation = Some(handle);
                self.otp.clear();
                self.step = LoginStep::Otp;
                Ok(())
            }
            Err(IdentityError::InvalidAppCredential) => {
                error!("Identity provider rejected the app verification credential");
                Err(LoginError::InvalidAppCredential)
            }
            Err(IdentityError::RateLimited) => {
                warn!("Verification code rate limited");
                Err(LoginError::RateLimited)
            }
            Err(err) => {
                error!("Failed to send verification code: {err}");
                Err(LoginError::SendFailed)
            }
        }
    }

    /// Feed the current OTP input. Exactly six characters submit it once.
    ///
    /// # Errors
    /// A failed confirmation or exchange clears the buffer and keeps the flow
    /// on the otp step so the user can retry.
    pub async fn input_otp<E>(
        &mut self,
        value: &str,
        verifier: &dyn IdentityProvider,
        exchange: &E,
    ) -> Result<OtpProgress<E::Session>, LoginError>
    where
        E: SessionExchange + ?Sized,
    {
        if self.step != LoginStep::Otp {
            return Err(LoginError::WrongStep);
        }

        self.otp = value.chars().filter(|c| !c.is_whitespace()).collect();
        let entered = self.otp.chars().count();
        if entered != OTP_LENGTH {
            return Ok(OtpProgress::Incomplete { entered });
        }

        let code = std::mem::take(&mut self.otp);
        if !code.chars().all(|c| c.is_ascii_digit()) {
            return Err(LoginError::MalformedCode);
        }

        let handle = self.confirmation.as_ref().ok_or(LoginError::WrongStep)?;
        let assertion = match verifier.confirm_code(handle, &code).await {
            Ok(assertion) => assertion,
            Err(IdentityError::RateLimited) => {
                warn!("Code confirmation rate limited");
                return Err(LoginError::RateLimited);
            }
            Err(err) => {
                warn!("Code confirmation failed: {err}");
                return Err(LoginError::InvalidCode);
            }
        };

        match exchange.exchange(&assertion).await {
            Ok(session) => {
                self.confirmation = None;
                self.step = LoginStep::Authenticated;
                Ok(OtpProgress::Authenticated(session))
            }
            Err(err) => {
                warn!("Session exchange failed: {err}");
                Err(LoginError::InvalidCode)
            }
        }
    }

    /// Go back to the phone step, discarding the pending confirmation.
    ///
    /// # Errors
    /// Only valid from the otp step.
    pub fn resend(&mut self) -> Result<(), LoginError> {
        if self.step != LoginStep::Otp {
            return Err(LoginError::WrongStep);
        }
        self.confirmation = None;
        self.otp.clear();
        self.step = LoginStep::Phone;
        Ok(())
    }
}
