//! TOTP engine: secret provisioning, enrollment URIs, and code verification.
//!
//! Codes follow the RFC 6238 defaults (SHA-1, 6 digits, 30-second step) with
//! a skew allowance of one step either side to tolerate small clock drift.
//! Code format is validated before any cryptographic work so malformed input
//! is rejected cheaply and uniformly.

use anyhow::{Context, Result, anyhow};
use rand::{RngCore, rngs::OsRng};
use totp_rs::{Algorithm, Secret, TOTP};

const DIGITS: usize = 6;
const STEP_SECONDS: u64 = 30;
const SKEW_STEPS: u8 = 1;
// 20 random bytes encode to a 32-character base32 secret.
const SECRET_BYTES: usize = 20;

/// Generate a new base32-encoded TOTP secret.
///
/// # Errors
/// Returns an error if the system random source fails.
pub fn generate_secret() -> Result<String> {
    let mut bytes = vec![0u8; SECRET_BYTES];
    OsRng
        .try_fill_bytes(&mut bytes)
        .context("failed to generate TOTP secret")?;
    Ok(Secret::Raw(bytes).to_encoded().to_string())
}

/// Build the `otpauth://` URI presented as a QR code during enrollment.
///
/// # Errors
/// Returns an error if the secret is not valid base32 or the TOTP parameters
/// are rejected.
pub fn enrollment_uri(secret: &str, account: &str, issuer: &str) -> Result<String> {
    let totp = build(secret, account, issuer)?;
    Ok(totp.get_url())
}

/// A code is well-formed only when it is exactly six ASCII digits.
#[must_use]
pub fn valid_code_format(code: &str) -> bool {
    code.len() == DIGITS && code.bytes().all(|b| b.is_ascii_digit())
}

/// Verify a submitted code against a base32 secret.
///
/// Malformed codes are a verification failure, not an error: they return
/// `Ok(false)` without reaching the cryptographic check.
///
/// # Errors
/// Returns an error if the secret cannot be decoded.
pub fn verify_code(secret: &str, code: &str) -> Result<bool> {
    if !valid_code_format(code) {
        return Ok(false);
    }
    let totp = build(secret, "user", "clinica")?;
    Ok(totp.check_current(code).unwrap_or(false))
}

fn build(secret: &str, account: &str, issuer: &str) -> Result<TOTP> {
    let secret_bytes = Secret::Encoded(secret.to_string())
        .to_bytes()
        .map_err(|e| anyhow!("invalid TOTP secret: {e:?}"))?;
    TOTP::new(
        Algorithm::SHA1,
        DIGITS,
        SKEW_STEPS,
        STEP_SECONDS,
        secret_bytes,
        Some(issuer.to_string()),
        account.to_string(),
    )
    .map_err(|e| anyhow!("TOTP init error: {e}"))
}
