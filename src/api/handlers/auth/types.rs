//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use super::flow::LoginStep;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateSessionRequest {
    pub id_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct CreateSessionResponse {
    pub success: bool,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginPhoneRequest {
    pub phone_number: String,
    pub recaptcha_token: String,
    /// Continue an attempt that went back to the phone step via resend.
    #[serde(default)]
    pub login_id: Option<Uuid>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginPhoneResponse {
    pub login_id: Uuid,
    pub phone_number: String,
    pub step: LoginStep,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginOtpRequest {
    pub login_id: Uuid,
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginOtpResponse {
    pub redirect: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginResendRequest {
    pub login_id: Uuid,
}
