//! Authenticated principal extraction.
//!
//! Flow Overview: read the session token, verify the signed claims, resolve
//! the current user record, and return a principal that downstream handlers
//! can use. Display fields come from storage, not from the claim.

use axum::http::{HeaderMap, StatusCode};
use sqlx::PgPool;
use uuid::Uuid;

use super::{session::authenticate_session, state::AuthConfig, storage::Role};

/// Authenticated user context derived from the session token.
#[derive(Clone, Debug)]
pub struct Principal {
    pub user_id: Uuid,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub language: Option<String>,
}

/// Resolve the session token into a principal, or return 401.
pub async fn require_auth(
    headers: &HeaderMap,
    pool: &PgPool,
    config: &AuthConfig,
) -> Result<Principal, StatusCode> {
    match authenticate_session(headers, pool, config).await {
        Ok(Some((_claims, user))) => Ok(Principal {
            user_id: user.id,
            email: user.email,
            name: user.name,
            role: user.role,
            language: user.language,
        }),
        Ok(None) => Err(StatusCode::UNAUTHORIZED),
        Err(status) => Err(status),
    }
}
