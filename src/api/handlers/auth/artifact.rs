//! Signed session artifact carried in the `__session` cookie.
//!
//! The artifact is an HS256 JWT minted locally after the identity provider
//! vouched for the caller. Verification is purely local: signature, issuer and
//! expiry with no leeway. Revocation is checked separately against Postgres.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use uuid::Uuid;

use crate::identity::VerifiedIdentity;

pub(crate) const MIN_SECRET_BYTES: usize = 32;

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("session secret must be at least {MIN_SECRET_BYTES} bytes")]
    WeakSecret,
    #[error("session artifact expired")]
    Expired,
    #[error("session artifact signature mismatch")]
    InvalidSignature,
    #[error("session artifact issuer mismatch")]
    InvalidIssuer,
    #[error("malformed session artifact: {0}")]
    Malformed(String),
    #[error("failed to sign session artifact: {0}")]
    Signing(String),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default)]
    pub claims: Map<String, Value>,
    pub auth_time: i64,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub jti: Uuid,
}

impl SessionClaims {
    /// Expiry as a timestamp, used when recording revocations.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

pub struct SessionSigner {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
}

impl SessionSigner {
    /// # Errors
    /// Returns [`ArtifactError::WeakSecret`] when the secret is too short.
    pub fn new(secret: &SecretString, issuer: String) -> Result<Self, ArtifactError> {
        let secret = secret.expose_secret().as_bytes();
        if secret.len() < MIN_SECRET_BYTES {
            return Err(ArtifactError::WeakSecret);
        }

        Ok(Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            issuer,
        })
    }

    /// Mint a fresh artifact for `identity`, valid for `ttl` from now.
    ///
    /// # Errors
    /// Returns an error if encoding fails.
    pub fn mint(
        &self,
        identity: &VerifiedIdentity,
        ttl: Duration,
    ) -> Result<(String, SessionClaims), ArtifactError> {
        self.mint_at(identity, ttl, Utc::now())
    }

    pub(crate) fn mint_at(
        &self,
        identity: &VerifiedIdentity,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<(String, SessionClaims), ArtifactError> {
        let claims = SessionClaims {
            sub: identity.uid.clone(),
            phone_number: identity.phone_number.clone(),
            claims: identity.claims.clone(),
            auth_time: now.timestamp(),
            iat: now.timestamp(),
            exp: (now + ttl).timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|err| ArtifactError::Signing(err.to_string()))?;

        Ok((token, claims))
    }

    /// Verify signature, issuer and expiry.
    ///
    /// # Errors
    /// Returns the specific reason the artifact was rejected.
    pub fn verify(&self, token: &str) -> Result<SessionClaims, ArtifactError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_issuer(&[&self.issuer]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        decode::<SessionClaims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => ArtifactError::Expired,
                ErrorKind::InvalidSignature => ArtifactError::InvalidSignature,
                ErrorKind::InvalidIssuer => ArtifactError::InvalidIssuer,
                _ => ArtifactError::Malformed(err.to_string()),
            })
    }
}
