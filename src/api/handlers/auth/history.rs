//! Best-effort access-history recording.
//!
//! A history write accompanies every completed login but is detached from
//! the response path: it runs on its own task, is never awaited by the
//! handler, and swallows every failure after logging it. A storage outage
//! must never fail or delay the login that produced the entry.

use axum::http::HeaderMap;
use sqlx::PgPool;
use tracing::error;
use uuid::Uuid;

use super::{storage, utils::extract_client_ip};

const UNKNOWN: &str = "unknown";

/// Client fingerprint captured at login time, best-effort.
#[derive(Clone, Debug)]
pub(super) struct ClientInfo {
    pub(super) ip: String,
    pub(super) user_agent: String,
    pub(super) location: String,
}

impl ClientInfo {
    /// Derive the network origin and client signature from request headers.
    /// No geolocation service is integrated; location is a placeholder.
    pub(super) fn from_headers(headers: &HeaderMap) -> Self {
        let ip = extract_client_ip(headers).unwrap_or_else(|| UNKNOWN.to_string());
        let user_agent = headers
            .get(axum::http::header::USER_AGENT)
            .and_then(|value| value.to_str().ok())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map_or_else(|| UNKNOWN.to_string(), str::to_string);
        Self {
            ip,
            user_agent,
            location: UNKNOWN.to_string(),
        }
    }
}

/// Schedule an access-history write for a completed login (fire-and-forget).
pub(super) fn record(pool: PgPool, user_id: Uuid, client: ClientInfo) {
    tokio::spawn(async move {
        if let Err(err) = storage::insert_access_entry(
            &pool,
            user_id,
            &client.ip,
            &client.user_agent,
            &client.location,
        )
        .await
        {
            error!(user_id = %user_id, "Failed to record access history: {err}");
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn client_info_reads_proxy_headers_and_user_agent() {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static("200.145.12.98"));
        headers.insert(
            axum::http::header::USER_AGENT,
            HeaderValue::from_static("Mozilla/5.0 (X11; Linux x86_64) Firefox/112.0"),
        );

        let client = ClientInfo::from_headers(&headers);
        assert_eq!(client.ip, "200.145.12.98");
        assert_eq!(
            client.user_agent,
            "Mozilla/5.0 (X11; Linux x86_64) Firefox/112.0"
        );
        assert_eq!(client.location, "unknown");
    }

    #[test]
    fn client_info_defaults_when_headers_missing() {
        let client = ClientInfo::from_headers(&HeaderMap::new());
        assert_eq!(client.ip, "unknown");
        assert_eq!(client.user_agent, "unknown");
    }
}
