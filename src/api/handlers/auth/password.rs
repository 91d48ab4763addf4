//! Password verification against stored bcrypt hashes.

use anyhow::{Context, Result};

/// Minimum accepted password length, enforced before any storage lookup.
pub(super) const MIN_PASSWORD_LEN: usize = 6;

/// Verify a plaintext password against a stored bcrypt hash.
///
/// `Ok(false)` is a mismatch; `Err` means the stored hash is malformed.
/// Callers must map both outcomes to the same client-visible failure.
///
/// # Errors
/// Returns an error if the stored hash cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
    bcrypt::verify(password, hash).context("failed to verify password hash")
}

/// Hash a password for storage.
///
/// # Errors
/// Returns an error if hashing fails.
pub fn hash_password(password: &str) -> Result<String> {
    bcrypt::hash(password, bcrypt::DEFAULT_COST).context("failed to hash password")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn correct_password_matches() -> Result<()> {
        let hash = hash_password("admin123")?;
        assert!(hash.starts_with("$2"));
        assert!(verify_password("admin123", &hash)?);
        Ok(())
    }

    #[test]
    fn wrong_password_does_not_match() -> Result<()> {
        let hash = hash_password("admin123")?;
        assert!(!verify_password("admin124", &hash)?);
        Ok(())
    }

    #[test]
    fn same_password_hashes_differently() -> Result<()> {
        // Salted hashes must not repeat.
        assert_ne!(hash_password("admin123")?, hash_password("admin123")?);
        Ok(())
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("admin123", "not-a-bcrypt-hash").is_err());
    }
}
