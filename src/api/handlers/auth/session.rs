//! Signed session claims and the session/logout endpoints.
//!
//! Sessions are stateless: a signed HS256 claim carrying the user id and
//! role. The maximum age is fixed at issuance and is never extended by
//! activity; renewal re-signs the claim with a freshly read role but keeps
//! the original expiry. Sign-out clears the cookie.

use anyhow::{Context, Result};
use axum::{
    Json,
    extract::Extension,
    http::{
        HeaderMap, HeaderValue, StatusCode,
        header::{AUTHORIZATION, InvalidHeaderValue, SET_COOKIE},
    },
    response::IntoResponse,
};
use chrono::Utc;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use uuid::Uuid;

use super::{
    state::{AuthConfig, AuthState},
    storage::{self, Role, UserRecord},
    types::SessionResponse,
};

const SESSION_COOKIE_NAME: &str = "clinica_session";

/// Claims embedded in every session token. Only `sub` and `role` are
/// authorization-relevant; display fields are read from storage per request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionClaims {
    /// Subject: user id (UUID string).
    pub sub: String,
    /// Role tag at issuance; refreshed from storage on renewal.
    pub role: String,
    /// Issuer.
    pub iss: String,
    /// Issued-at (Unix timestamp).
    pub iat: i64,
    /// Expiration (Unix timestamp), fixed at issuance.
    pub exp: i64,
    /// Unique token id.
    pub jti: String,
}

/// Issue a fresh session claim for a fully authenticated user.
///
/// # Errors
/// Returns an error if signing fails.
pub(super) fn issue_session(
    user_id: Uuid,
    role: Role,
    config: &AuthConfig,
) -> Result<(String, SessionClaims)> {
    let now = Utc::now().timestamp();
    let claims = SessionClaims {
        sub: user_id.to_string(),
        role: role.as_str().to_string(),
        iss: config.issuer().to_string(),
        iat: now,
        exp: now + config.session_ttl_seconds(),
        jti: Uuid::new_v4().to_string(),
    };
    let token = sign_claims(&claims, config)?;
    Ok((token, claims))
}

fn sign_claims(claims: &SessionClaims, config: &AuthConfig) -> Result<String> {
    let key = EncodingKey::from_secret(config.session_key().expose_secret().as_bytes());
    jsonwebtoken::encode(&Header::default(), claims, &key).context("failed to sign session")
}

/// Decode and verify a session token (signature, expiry, issuer).
///
/// # Errors
/// Returns an error for any invalid, expired, or foreign token.
pub(super) fn decode_session(token: &str, config: &AuthConfig) -> Result<SessionClaims> {
    let key = DecodingKey::from_secret(config.session_key().expose_secret().as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[config.issuer()]);
    validation.set_required_spec_claims(&["exp", "iat", "iss"]);
    jsonwebtoken::decode::<SessionClaims>(token, &key, &validation)
        .map(|data| data.claims)
        .context("failed to decode session")
}

/// Resolve the session token into verified claims plus the current user
/// record, if present.
///
/// Returns `Ok(None)` when the token is missing, invalid, expired, or the
/// account no longer exists. Storage errors fail closed.
pub(crate) async fn authenticate_session(
    headers: &HeaderMap,
    pool: &PgPool,
    config: &AuthConfig,
) -> Result<Option<(SessionClaims, UserRecord)>, StatusCode> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };
    let Ok(claims) = decode_session(&token, config) else {
        return Ok(None);
    };
    let Ok(user_id) = Uuid::parse_str(&claims.sub) else {
        return Ok(None);
    };
    match storage::lookup_user_by_id(pool, user_id).await {
        Ok(Some(user)) => Ok(Some((claims, user))),
        Ok(None) => Ok(None),
        Err(err) => {
            error!("Failed to resolve session user: {err}");
            Err(StatusCode::INTERNAL_SERVER_ERROR)
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/auth/session",
    responses(
        (status = 200, description = "Session is active", body = SessionResponse),
        (status = 204, description = "No active session")
    ),
    tag = "auth"
)]
pub async fn session(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // Missing cookies are treated as "no session" to avoid leaking auth state.
    let (claims, user) = match authenticate_session(&headers, &pool, auth_state.config()).await {
        Ok(Some(resolved)) => resolved,
        Ok(None) => return StatusCode::NO_CONTENT.into_response(),
        Err(status) => return status.into_response(),
    };

    // Renewal keeps the original expiry but refreshes the role from storage
    // so administrative changes propagate before the session ends.
    let remaining = claims.exp - Utc::now().timestamp();
    if remaining <= 0 {
        return StatusCode::NO_CONTENT.into_response();
    }

    let renewed = SessionClaims {
        role: user.role.as_str().to_string(),
        ..claims
    };
    let token = match sign_claims(&renewed, auth_state.config()) {
        Ok(token) => token,
        Err(err) => {
            error!("Failed to renew session: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    let mut response_headers = HeaderMap::new();
    match session_cookie(auth_state.config(), &token, remaining) {
        Ok(cookie) => {
            response_headers.insert(SET_COOKIE, cookie);
        }
        Err(err) => {
            error!("Failed to build session cookie: {err}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    }

    let response = SessionResponse {
        user_id: user.id.to_string(),
        email: user.email,
        name: user.name,
        role: user.role.as_str().to_string(),
        language: user.language,
    };
    (StatusCode::OK, response_headers, Json(response)).into_response()
}

#[utoipa::path(
    post,
    path = "/v1/auth/logout",
    responses(
        (status = 204, description = "Session cleared")
    ),
    tag = "auth"
)]
pub async fn logout(auth_state: Extension<Arc<AuthState>>) -> impl IntoResponse {
    // Logout is idempotent: always clear the cookie, session or not.
    let mut response_headers = HeaderMap::new();
    if let Ok(cookie) = clear_session_cookie(auth_state.config()) {
        response_headers.insert(SET_COOKIE, cookie);
    }
    (StatusCode::NO_CONTENT, response_headers).into_response()
}

/// Build a secure `HttpOnly` cookie for the session token.
pub(super) fn session_cookie(
    config: &AuthConfig,
    token: &str,
    max_age_seconds: i64,
) -> Result<HeaderValue, InvalidHeaderValue> {
    // Only mark cookies secure when the frontend is served over HTTPS.
    let secure = config.session_cookie_secure();
    let mut cookie = format!(
        "{SESSION_COOKIE_NAME}={token}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age_seconds}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

fn clear_session_cookie(config: &AuthConfig) -> Result<HeaderValue, InvalidHeaderValue> {
    let secure = config.session_cookie_secure();
    let mut cookie = format!("{SESSION_COOKIE_NAME}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0");
    if secure {
        cookie.push_str("; Secure");
    }
    HeaderValue::from_str(&cookie)
}

pub(super) fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = extract_bearer_token(headers) {
        return Some(token);
    }
    let header = headers.get(axum::http::header::COOKIE)?;
    let value = header.to_str().ok()?;
    for pair in value.split(';') {
        let trimmed = pair.trim();
        let mut parts = trimmed.splitn(2, '=');
        let key = parts.next()?.trim();
        let val = parts.next()?.trim();
        if key == SESSION_COOKIE_NAME {
            return Some(val.to_string());
        }
    }
    None
}

fn extract_bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let trimmed = value.trim();
    let token = trimmed
        .strip_prefix("Bearer ")
        .or_else(|| trimmed.strip_prefix("bearer "))?
        .trim();
    if token.is_empty() {
        None
    } else {
        Some(token.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderMap;
    use secrecy::SecretString;

    fn config() -> AuthConfig {
        AuthConfig::new(
            "https://clinica.dev".to_string(),
            SecretString::from("unit-test-session-key"),
        )
    }

    #[test]
    fn issue_and_decode_round_trips() -> Result<()> {
        let config = config();
        let user_id = Uuid::new_v4();
        let (token, claims) = issue_session(user_id, Role::Admin, &config)?;

        let decoded = decode_session(&token, &config)?;
        assert_eq!(decoded.sub, user_id.to_string());
        assert_eq!(decoded.role, "admin");
        assert_eq!(decoded.iss, config.issuer());
        assert_eq!(decoded.exp, claims.iat + 8 * 60 * 60);
        Ok(())
    }

    #[test]
    fn jti_is_unique_per_session() -> Result<()> {
        let config = config();
        let user_id = Uuid::new_v4();
        let (_, first) = issue_session(user_id, Role::Doctor, &config)?;
        let (_, second) = issue_session(user_id, Role::Doctor, &config)?;
        assert_ne!(first.jti, second.jti);
        Ok(())
    }

    #[test]
    fn tampered_token_is_rejected() -> Result<()> {
        let config = config();
        let (token, _) = issue_session(Uuid::new_v4(), Role::User, &config)?;
        let mut tampered = token;
        tampered.pop();
        assert!(decode_session(&tampered, &config).is_err());
        Ok(())
    }

    #[test]
    fn foreign_key_is_rejected() -> Result<()> {
        let config = config();
        let other = AuthConfig::new(
            "https://clinica.dev".to_string(),
            SecretString::from("another-session-key"),
        );
        let (token, _) = issue_session(Uuid::new_v4(), Role::User, &config)?;
        assert!(decode_session(&token, &other).is_err());
        Ok(())
    }

    #[test]
    fn expired_claims_are_rejected() -> Result<()> {
        let config = config();
        let now = Utc::now().timestamp();
        let claims = SessionClaims {
            sub: Uuid::new_v4().to_string(),
            role: "user".to_string(),
            iss: config.issuer().to_string(),
            iat: now - 9 * 60 * 60,
            exp: now - 60 * 60,
            jti: Uuid::new_v4().to_string(),
        };
        let token = sign_claims(&claims, &config)?;
        assert!(decode_session(&token, &config).is_err());
        Ok(())
    }

    #[test]
    fn wrong_issuer_is_rejected() -> Result<()> {
        let config = config();
        let other = AuthConfig::new(
            "https://clinica.dev".to_string(),
            SecretString::from("unit-test-session-key"),
        )
        .with_issuer("Other".to_string());
        let (token, _) = issue_session(Uuid::new_v4(), Role::User, &config)?;
        assert!(decode_session(&token, &other).is_err());
        Ok(())
    }

    #[test]
    fn session_cookie_sets_security_attributes() -> Result<(), InvalidHeaderValue> {
        let cookie = session_cookie(&config(), "token-value", 3600)?;
        let value = cookie.to_str().unwrap_or_default();
        assert!(value.contains("clinica_session=token-value"));
        assert!(value.contains("HttpOnly"));
        assert!(value.contains("SameSite=Lax"));
        assert!(value.contains("Max-Age=3600"));
        assert!(value.contains("Secure"));
        Ok(())
    }

    #[test]
    fn clear_cookie_zeroes_max_age() -> Result<(), InvalidHeaderValue> {
        let cookie = clear_session_cookie(&config())?;
        let value = cookie.to_str().unwrap_or_default();
        assert!(value.contains("clinica_session=;"));
        assert!(value.contains("Max-Age=0"));
        Ok(())
    }

    #[test]
    fn extract_token_from_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("theme=dark; clinica_session=abc123; lang=pt-BR"),
        );
        assert_eq!(extract_session_token(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn extract_token_prefers_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer from-auth"));
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("clinica_session=from-cookie"),
        );
        assert_eq!(
            extract_session_token(&headers),
            Some("from-auth".to_string())
        );
    }

    #[test]
    fn extract_token_none_when_absent() {
        let headers = HeaderMap::new();
        assert_eq!(extract_session_token(&headers), None);
    }
}
