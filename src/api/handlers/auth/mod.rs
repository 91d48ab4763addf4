//! Auth handlers and supporting modules.
//!
//! Flow Overview:
//! 1) `POST /v1/auth/login` validates credentials. Accounts without MFA get
//!    a session immediately; accounts with MFA get an opaque challenge id.
//! 2) `POST /v1/auth/mfa/verify` resolves the challenge server-side, checks
//!    the TOTP code, and issues the session.
//! 3) Every completed login schedules a detached access-history write.
//!
//! Security boundaries:
//! - Clients only ever see generic failure messages; which check failed
//!   stays in server logs.
//! - Challenge ids are single-use and expire after a few minutes; the TOTP
//!   secret is never sent to the client during login.
//! - Completing a challenge re-checks the user's current MFA state, so a
//!   challenge issued before a secret rotation or an MFA disable is dead.

pub(crate) mod challenge;
mod history;
pub(crate) mod mfa;
pub mod password;
pub mod principal;
pub(crate) mod session;
mod state;
pub(crate) mod storage;
pub(crate) mod types;
mod utils;

pub use state::{AuthConfig, AuthState};
pub use storage::Role;

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode, header::SET_COOKIE},
    response::IntoResponse,
};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::{error, warn};
use uuid::Uuid;

use crate::totp;
use history::ClientInfo;
use storage::UserRecord;
use types::{LoginRequest, MfaRequiredResponse, MfaVerifyRequest, SessionResponse};

#[utoipa::path(
    post,
    path = "/v1/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Session issued or second factor required", body = SessionResponse),
        (status = 400, description = "Malformed request", body = String),
        (status = 401, description = "Invalid credentials", body = String)
    ),
    tag = "auth"
)]
pub async fn login(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LoginRequest>>,
) -> axum::response::Response {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload").into_response();
    };

    // Reject malformed input before touching storage. The message never says
    // which field failed.
    let email = utils::normalize_email(&request.email);
    if !utils::valid_email(&email) || request.password.len() < password::MIN_PASSWORD_LEN {
        return (StatusCode::BAD_REQUEST, "Invalid request").into_response();
    }

    let user = match storage::lookup_user_by_email(&pool, &email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response();
        }
        Err(err) => {
            // Storage failures fail closed; never grant access.
            error!("Failed to lookup user for login: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // Externally provisioned accounts have no password hash and cannot use
    // credential login. Indistinguishable from a wrong password on the wire.
    let Some(password_hash) = user.password_hash.as_deref() else {
        warn!(user_id = %user.id, "Login attempt for account without password hash");
        return (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response();
    };

    match password::verify_password(&request.password, password_hash) {
        Ok(true) => {}
        Ok(false) => {
            return (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response();
        }
        Err(err) => {
            error!(user_id = %user.id, "Password verification failed: {err}");
            return (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response();
        }
    }

    if user.mfa_enabled {
        let Some(secret) = user.mfa_secret.clone() else {
            // Enabled flag without a secret violates the storage invariant;
            // fail closed rather than skip the second factor.
            error!(user_id = %user.id, "MFA enabled but no secret on record");
            return (StatusCode::UNAUTHORIZED, "Invalid credentials").into_response();
        };

        // Clients that collect both factors up front may send the code with
        // the credentials and skip the challenge round trip.
        if let Some(code) = request.mfa_code.as_deref() {
            if !totp::valid_code_format(code) {
                return (StatusCode::UNAUTHORIZED, "Invalid code").into_response();
            }
            match totp::verify_code(&secret, code) {
                Ok(true) => return finish_login(user, &auth_state, &pool, &headers),
                Ok(false) => {
                    return (StatusCode::UNAUTHORIZED, "Invalid code").into_response();
                }
                Err(err) => {
                    error!(user_id = %user.id, "TOTP verification failed: {err}");
                    return StatusCode::INTERNAL_SERVER_ERROR.into_response();
                }
            }
        }

        let challenge_id = auth_state.challenges().issue(user.id, secret).await;
        let response = MfaRequiredResponse {
            mfa_required: true,
            challenge: challenge_id.to_string(),
        };
        return (StatusCode::OK, Json(response)).into_response();
    }

    finish_login(user, &auth_state, &pool, &headers)
}

#[utoipa::path(
    post,
    path = "/v1/auth/mfa/verify",
    request_body = MfaVerifyRequest,
    responses(
        (status = 200, description = "Session issued", body = SessionResponse),
        (status = 400, description = "Malformed request", body = String),
        (status = 401, description = "Invalid code", body = String)
    ),
    tag = "auth"
)]
pub async fn mfa_verify(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<MfaVerifyRequest>>,
) -> axum::response::Response {
    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload").into_response();
    };

    // A malformed code is a verification failure, not an error; it never
    // reaches the cryptographic check.
    if !totp::valid_code_format(&request.code) {
        return (StatusCode::UNAUTHORIZED, "Invalid code").into_response();
    }

    let Ok(challenge_id) = Uuid::parse_str(&request.challenge) else {
        return (StatusCode::UNAUTHORIZED, "Invalid code").into_response();
    };

    // Challenges are consumed exactly once: a failed code means restarting
    // the login flow from the password step.
    let Some(challenge) = auth_state.challenges().take(challenge_id).await else {
        return (StatusCode::UNAUTHORIZED, "Invalid code").into_response();
    };

    let user = match storage::lookup_user_by_id(&pool, challenge.user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            return (StatusCode::UNAUTHORIZED, "Invalid code").into_response();
        }
        Err(err) => {
            error!("Failed to lookup user for MFA verification: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    // The secret captured at challenge time must still be the user's current
    // one; a rotated or disabled secret invalidates outstanding challenges.
    if !secret_still_current(&user, &challenge.secret) {
        warn!(user_id = %user.id, "MFA challenge no longer matches stored secret");
        return (StatusCode::UNAUTHORIZED, "Invalid code").into_response();
    }

    match totp::verify_code(&challenge.secret, &request.code) {
        Ok(true) => {}
        Ok(false) => {
            return (StatusCode::UNAUTHORIZED, "Invalid code").into_response();
        }
        Err(err) => {
            error!(user_id = %user.id, "TOTP verification failed: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    finish_login(user, &auth_state, &pool, &headers)
}

fn secret_still_current(user: &UserRecord, challenge_secret: &str) -> bool {
    user.mfa_enabled && user.mfa_secret.as_deref() == Some(challenge_secret)
}

/// Issue the session and schedule the access-history write. The write is
/// never awaited; the client gets its session regardless of its outcome.
fn finish_login(
    user: UserRecord,
    auth_state: &AuthState,
    pool: &PgPool,
    headers: &HeaderMap,
) -> axum::response::Response {
    let (token, _claims) = match session::issue_session(user.id, user.role, auth_state.config()) {
        Ok(issued) => issued,
        Err(err) => {
            error!(user_id = %user.id, "Failed to issue session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response_headers = HeaderMap::new();
    match session::session_cookie(
        auth_state.config(),
        &token,
        auth_state.config().session_ttl_seconds(),
    ) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    history::record(pool.clone(), user.id, ClientInfo::from_headers(headers));

    let response = SessionResponse {
        user_id: user.id.to_string(),
        email: user.email,
        name: user.name,
        role: user.role.as_str().to_string(),
        language: user.language,
    };
    (StatusCode::OK, response_headers, Json(response)).into_response()
}

#[cfg(test)]
mod tests {
    use super::challenge::ChallengeStore;
    use super::{Role, secret_still_current};
    use crate::totp;
    use anyhow::Result;
    use std::time::Duration;
    use uuid::Uuid;

    fn user(mfa_enabled: bool, mfa_secret: Option<&str>) -> super::UserRecord {
        super::UserRecord {
            id: Uuid::new_v4(),
            email: "medico@clinica.com".to_string(),
            name: "Dr. João Silva".to_string(),
            password_hash: Some("$2b$12$hash".to_string()),
            role: Role::Doctor,
            mfa_enabled,
            mfa_secret: mfa_secret.map(str::to_string),
            language: None,
        }
    }

    #[test]
    fn challenge_matches_current_secret() {
        let user = user(true, Some("SECRET"));
        assert!(secret_still_current(&user, "SECRET"));
    }

    #[test]
    fn disabled_mfa_invalidates_challenge() {
        // MFA disabled after the challenge was issued: the old secret must
        // not complete the login even if the code would have been valid.
        let user = user(false, None);
        assert!(!secret_still_current(&user, "SECRET"));
    }

    #[test]
    fn rotated_secret_invalidates_challenge() {
        let user = user(true, Some("NEW-SECRET"));
        assert!(!secret_still_current(&user, "OLD-SECRET"));
    }

    #[tokio::test]
    async fn challenge_round_trip_completes_the_second_factor() -> Result<()> {
        let store = ChallengeStore::new(Duration::from_secs(60));
        let secret = totp::generate_secret()?;
        let user = user(true, Some(&secret));

        let challenge_id = store.issue(user.id, secret.clone()).await;
        let challenge = store.take(challenge_id).await.expect("challenge present");
        assert_eq!(challenge.user_id, user.id);
        assert!(secret_still_current(&user, &challenge.secret));

        // The consumed challenge cannot be replayed.
        assert!(store.take(challenge_id).await.is_none());
        Ok(())
    }
}
