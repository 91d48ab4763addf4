//! Database helpers for users, MFA state, language preference, and access
//! history.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Row};
use tracing::Instrument;
use uuid::Uuid;

/// Closed set of roles carried in the session claim.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Role {
    Admin,
    Doctor,
    Receptionist,
    User,
}

impl Role {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Doctor => "doctor",
            Self::Receptionist => "receptionist",
            Self::User => "user",
        }
    }

    pub(crate) fn from_str(value: &str) -> Option<Self> {
        match value.trim() {
            "admin" => Some(Self::Admin),
            "doctor" => Some(Self::Doctor),
            "receptionist" => Some(Self::Receptionist),
            "user" => Some(Self::User),
            _ => None,
        }
    }
}

/// Full user record, used internally by the auth flow. Never serialized to
/// clients as-is.
#[derive(Clone, Debug)]
pub(crate) struct UserRecord {
    pub(crate) id: Uuid,
    pub(crate) email: String,
    pub(crate) name: String,
    pub(crate) password_hash: Option<String>,
    pub(crate) role: Role,
    pub(crate) mfa_enabled: bool,
    pub(crate) mfa_secret: Option<String>,
    pub(crate) language: Option<String>,
}

/// One row of the access-history audit trail.
#[derive(Clone, Debug)]
pub(crate) struct AccessEntry {
    pub(crate) id: Uuid,
    pub(crate) created_at: DateTime<Utc>,
    pub(crate) ip: String,
    pub(crate) user_agent: String,
    pub(crate) location: String,
}

fn user_from_row(row: &sqlx::postgres::PgRow) -> UserRecord {
    let role: String = row.get("role");
    UserRecord {
        id: row.get("id"),
        email: row.get("email"),
        name: row.get("name"),
        password_hash: row.get("password_hash"),
        // Unknown role values fall back to the least-privileged role.
        role: Role::from_str(&role).unwrap_or(Role::User),
        mfa_enabled: row.get("mfa_enabled"),
        mfa_secret: row.get("mfa_secret"),
        language: row.get("language"),
    }
}

/// Look up a user by email, case-insensitively.
pub(crate) async fn lookup_user_by_email(
    pool: &PgPool,
    email: &str,
) -> Result<Option<UserRecord>> {
    let query = r"
        SELECT id, email, name, password_hash, role, mfa_enabled, mfa_secret, language
        FROM users
        WHERE lower(email) = lower($1)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(email)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by email")?;
    Ok(row.as_ref().map(user_from_row))
}

pub(crate) async fn lookup_user_by_id(pool: &PgPool, user_id: Uuid) -> Result<Option<UserRecord>> {
    let query = r"
        SELECT id, email, name, password_hash, role, mfa_enabled, mfa_secret, language
        FROM users
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to lookup user by id")?;
    Ok(row.as_ref().map(user_from_row))
}

/// Enable MFA: the flag and the secret are written in one statement so
/// readers never observe `mfa_enabled` without a secret or the reverse.
pub(crate) async fn enable_mfa(pool: &PgPool, user_id: Uuid, secret: &str) -> Result<bool> {
    let query = r"
        UPDATE users
        SET mfa_enabled = TRUE,
            mfa_secret = $2
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(secret)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to enable MFA")?;
    Ok(result.rows_affected() > 0)
}

/// Disable MFA, clearing both columns atomically.
pub(crate) async fn disable_mfa(pool: &PgPool, user_id: Uuid) -> Result<bool> {
    let query = r"
        UPDATE users
        SET mfa_enabled = FALSE,
            mfa_secret = NULL
        WHERE id = $1
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to disable MFA")?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn get_language(pool: &PgPool, user_id: Uuid) -> Result<Option<Option<String>>> {
    let query = "SELECT language FROM users WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let row = sqlx::query(query)
        .bind(user_id)
        .fetch_optional(pool)
        .instrument(span)
        .await
        .context("failed to get language preference")?;
    Ok(row.map(|row| row.get("language")))
}

pub(crate) async fn set_language(pool: &PgPool, user_id: Uuid, language: &str) -> Result<bool> {
    let query = "UPDATE users SET language = $2 WHERE id = $1";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "UPDATE",
        db.statement = query
    );
    let result = sqlx::query(query)
        .bind(user_id)
        .bind(language)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to set language preference")?;
    Ok(result.rows_affected() > 0)
}

/// Append one access-history row. Timestamps come from the database clock
/// and are stored as UTC instants.
pub(crate) async fn insert_access_entry(
    pool: &PgPool,
    user_id: Uuid,
    ip: &str,
    user_agent: &str,
    location: &str,
) -> Result<()> {
    let query = r"
        INSERT INTO access_history (user_id, created_at, ip, user_agent, location)
        VALUES ($1, NOW(), $2, $3, $4)
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "INSERT",
        db.statement = query
    );
    sqlx::query(query)
        .bind(user_id)
        .bind(ip)
        .bind(user_agent)
        .bind(location)
        .execute(pool)
        .instrument(span)
        .await
        .context("failed to insert access history entry")?;
    Ok(())
}

/// List the most recent access-history rows for `owner`, newest first.
/// Callers must pass the authenticated principal's own id; this function is
/// the only read path for history.
pub(crate) async fn list_access_entries(
    pool: &PgPool,
    owner: Uuid,
    limit: i64,
) -> Result<Vec<AccessEntry>> {
    let query = r"
        SELECT id, created_at, ip, user_agent, location
        FROM access_history
        WHERE user_id = $1
        ORDER BY created_at DESC
        LIMIT $2
    ";
    let span = tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = "SELECT",
        db.statement = query
    );
    let rows = sqlx::query(query)
        .bind(owner)
        .bind(limit)
        .fetch_all(pool)
        .instrument(span)
        .await
        .context("failed to list access history")?;

    Ok(rows
        .iter()
        .map(|row| AccessEntry {
            id: row.get("id"),
            created_at: row.get("created_at"),
            ip: row.get("ip"),
            user_agent: row.get("user_agent"),
            location: row.get("location"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::{Role, UserRecord};
    use uuid::Uuid;

    #[test]
    fn role_round_trips() {
        for role in [Role::Admin, Role::Doctor, Role::Receptionist, Role::User] {
            assert_eq!(Role::from_str(role.as_str()), Some(role));
        }
    }

    #[test]
    fn unknown_role_is_rejected() {
        assert_eq!(Role::from_str("superuser"), None);
        assert_eq!(Role::from_str(""), None);
    }

    #[test]
    fn role_parse_trims_whitespace() {
        assert_eq!(Role::from_str(" admin "), Some(Role::Admin));
    }

    #[test]
    fn user_record_holds_values() {
        let record = UserRecord {
            id: Uuid::nil(),
            email: "admin@clinica.com".to_string(),
            name: "Administrador".to_string(),
            password_hash: Some("$2b$12$hash".to_string()),
            role: Role::Admin,
            mfa_enabled: false,
            mfa_secret: None,
            language: None,
        };
        assert_eq!(record.role, Role::Admin);
        assert!(!record.mfa_enabled);
        assert!(record.mfa_secret.is_none());
    }
}
