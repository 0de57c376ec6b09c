//! Identity Toolkit REST client (Firebase phone authentication).

use super::{
    ConfirmationHandle, IdentityAssertion, IdentityError, IdentityProvider, VerifiedIdentity,
};
use crate::APP_USER_AGENT;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Map, Value, json};
use std::time::Duration;
use tracing::{Instrument, debug, info_span, warn};

pub const DEFAULT_BASE_URL: &str = "https://identitytoolkit.googleapis.com";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug)]
pub struct FirebaseIdentity {
    client: Client,
    base_url: String,
    api_key: SecretString,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SendCodeResponse {
    session_info: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    id_token: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
    phone_number: Option<String>,
    custom_attributes: Option<String>,
    #[serde(default)]
    disabled: bool,
}

impl FirebaseIdentity {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(base_url: &str, api_key: SecretString) -> Result<Self, IdentityError> {
        let client = Client::builder()
            .user_agent(APP_USER_AGENT)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn endpoint(&self, method: &str) -> String {
        format!("{}/v1/accounts:{method}", self.base_url)
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, IdentityError> {
        let span = info_span!("identity.request", identity.method = method);

        async {
            let response = self
                .client
                .post(self.endpoint(method))
                .query(&[("key", self.api_key.expose_secret())])
                .json(&body)
                .send()
                .await?;

            let status = response.status();
            if status.is_success() {
                return Ok(response.json::<T>().await?);
            }

            let body: Value = response.json().await.unwrap_or(Value::Null);
            let message = body
                .get("error")
                .and_then(|error| error.get("message"))
                .and_then(Value::as_str)
                .unwrap_or_default();

            debug!("Identity provider rejected {method}: {status} {message}");

            Err(IdentityError::from_provider_message(message))
        }
        .instrument(span)
        .await
    }
}

#[async_trait]
impl IdentityProvider for FirebaseIdentity {
    async fn send_verification_code(
        &self,
        phone_number: &str,
        challenge_token: &str,
    ) -> Result<ConfirmationHandle, IdentityError> {
        let response: SendCodeResponse = self
            .call(
                "sendVerificationCode",
                json!({
                    "phoneNumber": phone_number,
                    "recaptchaToken": challenge_token,
                }),
            )
            .await?;

        Ok(ConfirmationHandle::new(response.session_info))
    }

    async fn confirm_code(
        &self,
        handle: &ConfirmationHandle,
        code: &str,
    ) -> Result<IdentityAssertion, IdentityError> {
        let response: SignInResponse = self
            .call(
                "signInWithPhoneNumber",
                json!({
                    "sessionInfo": handle.as_str(),
                    "code": code,
                }),
            )
            .await?;

        Ok(IdentityAssertion::new(response.id_token))
    }

    async fn verify_assertion(&self, id_token: &str) -> Result<VerifiedIdentity, IdentityError> {
        let response: LookupResponse = self.call("lookup", json!({ "idToken": id_token })).await?;

        let user = response
            .users
            .into_iter()
            .next()
            .ok_or_else(|| IdentityError::InvalidAssertion("USER_NOT_FOUND".to_string()))?;

        if user.disabled {
            return Err(IdentityError::InvalidAssertion("USER_DISABLED".to_string()));
        }

        let claims = match user.custom_attributes.as_deref() {
            None | Some("") => Map::new(),
            Some(raw) => match serde_json::from_str::<Map<String, Value>>(raw) {
                Ok(claims) => claims,
                Err(err) => {
                    warn!("Ignoring malformed custom attributes for {}: {err}", user.local_id);
                    Map::new()
                }
            },
        };

        Ok(VerifiedIdentity {
            uid: user.local_id,
            phone_number: user.phone_number,
            claims,
        })
    }
}
