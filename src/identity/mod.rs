//! Identity provider boundary.
//!
//! The dashboard never stores phone credentials itself. It asks an external
//! provider to text a one-time code, to confirm that code, and to verify the
//! short-lived ID token the provider hands back after confirmation.

mod error;
pub mod firebase;

pub use error::IdentityError;
pub use firebase::FirebaseIdentity;

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::fmt;

/// Opaque handle returned by the provider after a code was sent.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfirmationHandle(String);

impl ConfirmationHandle {
    #[must_use]
    pub fn new(value: String) -> Self {
        Self(value)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ConfirmationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConfirmationHandle(..)")
    }
}

/// Short-lived ID token proving the holder confirmed a code.
#[derive(Clone)]
pub struct IdentityAssertion {
    id_token: String,
}

impl IdentityAssertion {
    #[must_use]
    pub fn new(id_token: String) -> Self {
        Self { id_token }
    }

    #[must_use]
    pub fn id_token(&self) -> &str {
        &self.id_token
    }
}

impl fmt::Debug for IdentityAssertion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdentityAssertion")
            .field("id_token", &"[redacted]")
            .finish()
    }
}

/// Account details the provider vouches for once an assertion checks out.
#[derive(Clone, Debug, PartialEq)]
pub struct VerifiedIdentity {
    pub uid: String,
    pub phone_number: Option<String>,
    /// Custom claims attached to the account, passed through untouched.
    pub claims: Map<String, Value>,
}

#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Ask the provider to text a code to `phone_number` (E.164).
    async fn send_verification_code(
        &self,
        phone_number: &str,
        challenge_token: &str,
    ) -> Result<ConfirmationHandle, IdentityError>;

    async fn confirm_code(
        &self,
        handle: &ConfirmationHandle,
        code: &str,
    ) -> Result<IdentityAssertion, IdentityError>;

    async fn verify_assertion(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError>;
}
