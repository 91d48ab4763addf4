//! Request/response types for auth endpoints.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
    /// Optional TOTP code for clients that collect both factors up front;
    /// when absent, MFA-enabled accounts receive a challenge instead.
    #[serde(default)]
    pub mfa_code: Option<String>,
}

/// Returned when the password is correct but a second factor is required.
/// The challenge id is opaque; the secret it references never leaves the
/// server.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MfaRequiredResponse {
    pub mfa_required: bool,
    pub challenge: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MfaVerifyRequest {
    pub challenge: String,
    pub code: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct SessionResponse {
    pub user_id: String,
    pub email: String,
    pub name: String,
    pub role: String,
    pub language: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MfaEnrollStartResponse {
    pub secret: String,
    pub otpauth_url: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MfaEnrollFinishRequest {
    pub code: String,
}
