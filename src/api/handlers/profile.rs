//! Authenticated self-service endpoints: language preference and access
//! history.

use axum::{
    Json,
    extract::Extension,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::sync::Arc;
use tracing::error;
use utoipa::ToSchema;

use super::auth::{AuthState, principal::require_auth, storage};

/// Locale returned when a user has not chosen a language yet.
const DEFAULT_LANGUAGE: &str = "pt-BR";

/// Closed set of locales the frontend ships translations for.
const SUPPORTED_LANGUAGES: [&str; 3] = ["pt-BR", "en-US", "es-ES"];

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LanguageResponse {
    pub language: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LanguageUpdateRequest {
    pub language: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AccessHistoryEntry {
    pub id: String,
    pub created_at: String,
    pub ip: String,
    pub user_agent: String,
    pub location: String,
}

fn supported_language(language: &str) -> bool {
    SUPPORTED_LANGUAGES.contains(&language)
}

#[utoipa::path(
    get,
    path = "/v1/profile/language",
    responses(
        (status = 200, description = "Current language preference", body = LanguageResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "profile"
)]
pub async fn get_language(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, auth_state.config()).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    match storage::get_language(&pool, principal.user_id).await {
        Ok(Some(language)) => {
            let response = LanguageResponse {
                language: language.unwrap_or_else(|| DEFAULT_LANGUAGE.to_string()),
            };
            (StatusCode::OK, Json(response)).into_response()
        }
        Ok(None) => StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Failed to read language preference: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    put,
    path = "/v1/profile/language",
    request_body = LanguageUpdateRequest,
    responses(
        (status = 204, description = "Language updated"),
        (status = 400, description = "Unsupported language", body = String),
        (status = 401, description = "Unauthorized")
    ),
    tag = "profile"
)]
pub async fn put_language(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
    payload: Option<Json<LanguageUpdateRequest>>,
) -> impl IntoResponse {
    let principal = match require_auth(&headers, &pool, auth_state.config()).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    let Some(Json(request)) = payload else {
        return (StatusCode::BAD_REQUEST, "Missing payload").into_response();
    };

    if !supported_language(&request.language) {
        return (StatusCode::BAD_REQUEST, "Unsupported language").into_response();
    }

    match storage::set_language(&pool, principal.user_id, &request.language).await {
        Ok(true) => StatusCode::NO_CONTENT.into_response(),
        Ok(false) => StatusCode::UNAUTHORIZED.into_response(),
        Err(err) => {
            error!("Failed to update language preference: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[utoipa::path(
    get,
    path = "/v1/profile/access-history",
    responses(
        (status = 200, description = "Most recent logins, newest first", body = [AccessHistoryEntry]),
        (status = 401, description = "Unauthorized")
    ),
    tag = "profile"
)]
pub async fn access_history(
    headers: HeaderMap,
    pool: Extension<PgPool>,
    auth_state: Extension<Arc<AuthState>>,
) -> impl IntoResponse {
    // History is only ever read for the authenticated principal; there is no
    // way to request another user's entries.
    let principal = match require_auth(&headers, &pool, auth_state.config()).await {
        Ok(principal) => principal,
        Err(status) => return status.into_response(),
    };

    match storage::list_access_entries(&pool, principal.user_id, auth_state.config().history_limit())
        .await
    {
        Ok(entries) => {
            let entries: Vec<AccessHistoryEntry> = entries
                .into_iter()
                .map(|entry| AccessHistoryEntry {
                    id: entry.id.to_string(),
                    created_at: entry.created_at.to_rfc3339(),
                    ip: entry.ip,
                    user_agent: entry.user_agent,
                    location: entry.location,
                })
                .collect();
            (StatusCode::OK, Json(entries)).into_response()
        }
        Err(err) => {
            error!("Failed to list access history: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
