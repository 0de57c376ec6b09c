//! # AgroDigito admin
//!
//! `agrodigito` is the backend of the AgroDigito administrative dashboard. It
//! owns phone-based sign-in, the session cookie, and the page/action endpoints
//! used to manage the product catalog, orders, and registered users.
//!
//! ## Authentication
//!
//! Sign-in is a phone one-time-code flow against an external identity provider.
//! Once the provider confirms the code it returns a short-lived ID token, which
//! the session issuer exchanges for a signed `__session` cookie valid for five
//! days.
//!
//! Two guards sit in front of the dashboard:
//!
//! - **Route guard (edge):** a middleware that only checks whether the cookie is
//!   present. It bounces anonymous traffic to `/login` and signed-in traffic away
//!   from `/login`.
//! - **Page guard (authoritative):** every `/dashboard` handler verifies the
//!   cookie signature, expiry and revocation status before touching data. Any
//!   failure clears the cookie and redirects to `/login`; the cause is only
//!   logged.
//!
//! ## Backend
//!
//! Catalog, order and profile records live in Postgres and are accessed with
//! plain parameterized `sqlx` queries.

pub mod api;
pub mod cli;
pub mod identity;

#[cfg(test)]
pub(crate) mod test_support;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
