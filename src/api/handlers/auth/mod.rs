//! Auth handlers and supporting modules.
//!
//! Sign-in is a phone one-time-code flow against the identity provider. A
//! confirmed code yields an ID token which the session issuer trades for a
//! signed `__session` cookie.
//!
//! ## Two guards
//!
//! - `guard`: edge middleware, checks cookie *presence* only and redirects
//!   between `/login` and `/dashboard`.
//! - `principal`: the authoritative check every dashboard handler runs,
//!   verifying signature, expiry and revocation.
//!
//! ## Session artifact
//!
//! - **Lifetime:** fixed at five days (`Max-Age=432000`).
//! - **Revocation:** logout records the artifact `jti` in `revoked_sessions`
//!   until it would have expired.

pub(crate) mod admin;
mod artifact;
mod cookie;
pub(crate) mod flow;
pub(crate) mod guard;
pub(crate) mod login;
mod phone;
pub(crate) mod principal;
pub(crate) mod session;
mod state;
mod storage;
pub(crate) mod types;

pub use admin::{AdminApp, AdminHandle, AdminParams};
pub use artifact::{ArtifactError, SessionClaims, SessionSigner};
pub use guard::route_guard;
pub use state::{AuthConfig, AuthState, Environment};

#[cfg(test)]
mod tests;
