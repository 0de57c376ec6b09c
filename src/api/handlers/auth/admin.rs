//! Process-wide admin handle: the identity provider client and session signer.
//!
//! Built lazily on first use and shared afterwards. Concurrent first calls
//! block on the same initializer, so credentials are parsed at most once per
//! process.

use anyhow::{Context, Result, anyhow};
use once_cell::sync::OnceCell;
use secrecy::SecretString;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

use super::artifact::SessionSigner;
use crate::identity::{FirebaseIdentity, IdentityProvider};

/// Credentials needed to build the admin handle.
#[derive(Clone)]
pub struct AdminParams {
    pub identity_base_url: String,
    pub identity_api_key: SecretString,
    pub session_secret: SecretString,
    pub session_issuer: String,
}

impl fmt::Debug for AdminParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdminParams")
            .field("identity_base_url", &self.identity_base_url)
            .field("session_issuer", &self.session_issuer)
            .finish_non_exhaustive()
    }
}

pub struct AdminApp {
    identity: Arc<dyn IdentityProvider>,
    signer: SessionSigner,
}

impl AdminApp {
    #[must_use]
    pub fn new(identity: Arc<dyn IdentityProvider>, signer: SessionSigner) -> Self {
        Self { identity, signer }
    }

    /// # Errors
    /// Returns an error if the identity client or signer cannot be built.
    pub fn from_params(params: &AdminParams) -> Result<Self> {
        let identity = FirebaseIdentity::new(
            &params.identity_base_url,
            params.identity_api_key.clone(),
        )
        .context("Failed to build identity provider client")?;
        let signer = SessionSigner::new(&params.session_secret, params.session_issuer.clone())
            .context("Failed to build session signer")?;

        Ok(Self::new(Arc::new(identity), signer))
    }

    #[must_use]
    pub fn identity(&self) -> &dyn IdentityProvider {
        self.identity.as_ref()
    }

    #[must_use]
    pub fn signer(&self) -> &SessionSigner {
        &self.signer
    }
}

pub struct AdminHandle {
    params: Option<AdminParams>,
    app: OnceCell<AdminApp>,
}

impl AdminHandle {
    #[must_use]
    pub fn new(params: AdminParams) -> Self {
        Self {
            params: Some(params),
            app: OnceCell::new(),
        }
    }

    /// Wrap an already-built app; used when the collaborators are injected.
    #[must_use]
    pub fn from_app(app: AdminApp) -> Self {
        Self {
            params: None,
            app: OnceCell::with_value(app),
        }
    }

    /// Return the shared app, building it on first use.
    ///
    /// # Errors
    /// Returns an error if no credentials are configured or initialization fails.
    /// A failed initialization is retried on the next call.
    pub fn get(&self) -> Result<&AdminApp> {
        self.app.get_or_try_init(|| {
            let params = self
                .params
                .as_ref()
                .ok_or_else(|| anyhow!("Admin credentials are not configured"))?;
            debug!("Initializing admin handle");
            AdminApp::from_params(params)
        })
    }
}
