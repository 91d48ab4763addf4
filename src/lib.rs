//! # Clinica Auth
//!
//! `clinica-auth` is the authentication service for the Clinica
//! clinic-management platform. It owns credential login, optional TOTP-based
//! multi-factor authentication, signed session claims, per-user language
//! preference, and access-history logging.
//!
//! ## Login flow
//!
//! 1) Credentials are validated against the stored bcrypt hash.
//! 2) When the account has MFA enabled, the client receives an opaque
//!    challenge id instead of a session; the TOTP secret is resolved
//!    server-side when the challenge is completed and never travels to the
//!    client.
//! 3) A signed session claim (user id + role) is issued once every required
//!    factor has passed. Sessions have a fixed maximum age; renewal re-reads
//!    the role from the database but never extends the expiry.
//!
//! ## Security boundaries
//!
//! - Authentication failures are reported to clients as generic messages;
//!   the reason a login failed stays in server logs.
//! - Access-history writes are best-effort and detached from the response
//!   path; a failed write never fails the login that produced it.
//! - MFA state (`mfa_enabled` + `mfa_secret`) is updated in a single
//!   statement so readers never observe a half-updated pair.

pub mod api;
pub mod cli;
pub mod totp;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_git_commit_hash_format() {
        if GIT_COMMIT_HASH == "unknown" {
            // Acceptable in non-git build environments
            return;
        }
        assert!(
            GIT_COMMIT_HASH.chars().all(|c| c.is_ascii_hexdigit()),
            "GIT_COMMIT_HASH should be a hex string, got: {GIT_COMMIT_HASH}"
        );
        assert!(
            GIT_COMMIT_HASH.len() >= 7,
            "GIT_COMMIT_HASH should be at least 7 characters long, got: {GIT_COMMIT_HASH}"
        );
    }

    #[test]
    fn test_app_user_agent_format() {
        assert!(APP_USER_AGENT.starts_with(env!("CARGO_PKG_NAME")));
        assert!(APP_USER_AGENT.contains(env!("CARGO_PKG_VERSION")));
    }
}
