//! MFA enrollment and disable endpoints.
//!
//! Enrollment is two-step: `start` generates a secret and the `otpauth://`
//! URI for the QR code, parking the secret server-side; `finish` verifies
//! the first code and enables MFA with a single storage write. `disable`
//! clears both MFA columns atomically. Language preference and MFA state
//! live in separate columns and never share storage.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, info};

use super::{
    principal::require_auth,
    state::AuthState,
    storage,
    types::{MfaEnrollFinishRequest, MfaEnrollStartResponse},
};
use crate::totp;

#[utoipa::path(
    post,
    path = "/v1/auth/mfa/enroll/start",
    responses(
        (status = 200, description = "Enrollment started", body = MfaEnrollStartResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth"
)]
pub async fn enroll_start(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> axum::response::Response {
    let principal = match require_auth(&headers, &pool, auth_state.config()).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let secret = match totp::generate_secret() {
        Ok(secret) => secret,
        Err(err) => {
            error!("Failed to generate TOTP secret: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let otpauth_url =
        match totp::enrollment_uri(&secret, &principal.email, auth_state.config().issuer()) {
            Ok(uri) => uri,
            Err(err) => {
                error!("Failed to build enrollment URI: {err}");
                return StatusCode::INTERNAL_SERVER_ERROR.into_response();
            }
        };

    auth_state
        .challenges()
        .park_enrollment(principal.user_id, secret.clone())
        .await;

    let response = MfaEnrollStartResponse {
        secret,
        otpauth_url,
    };
    (StatusCode::OK, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/mfa/enroll/finish",
    request_body = MfaEnrollFinishRequest,
    responses(
        (status = 204, description = "MFA enabled"),
        (status = 400, description = "Invalid code", body = String),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth"
)]
pub async fn enroll_finish(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<MfaEnrollFinishRequest>>,
) -> axum::response::Response {
    let principal = match require_auth(&headers, &pool, auth_state.config()).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload").into_response();
    };

    if !totp::valid_code_format(&request.code) {
        return (StatusCode::BAD_REQUEST, "Invalid code").into_response();
    }

    let Some(secret) = auth_state
        .challenges()
        .take_enrollment(principal.user_id)
        .await
    else {
        return (StatusCode::BAD_REQUEST, "No enrollment in progress").into_response();
    };

    match totp::verify_code(&secret, &request.code) {
        Ok(true) => {}
        Ok(false) => {
            // Keep the pending secret so the user can retry with the next code.
            auth_state
                .challenges()
                .park_enrollment(principal.user_id, secret)
                .await;
            return (StatusCode::BAD_REQUEST, "Invalid code").into_response();
        }
        Err(err) => {
            error!(user_id = %principal.user_id, "TOTP verification failed: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    match storage::enable_mfa(&pool, principal.user_id, &secret).await {
        Ok(true) => {
            info!(user_id = %principal.user_id, "MFA enabled");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!(user_id = %principal.user_id, "Failed to enable MFA: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    post,
    path = "/v1/auth/mfa/disable",
    responses(
        (status = 204, description = "MFA disabled"),
        (status = 401, description = "Unauthorized")
    ),
    tag = "auth"
)]
pub async fn disable(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> axum::response::Response {
    let principal = match require_auth(&headers, &pool, auth_state.config()).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    match storage::disable_mfa(&pool, principal.user_id).await {
        Ok(true) => {
            info!(user_id = %principal.user_id, "MFA disabled");
            StatusCode::NO_CONTENT.into_response()
        }
        Ok(false) => StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!(user_id = %principal.user_id, "Failed to disable MFA: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
