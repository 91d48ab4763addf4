//! Auth configuration and shared state.

use secrecy::SecretString;
use std::time::Duration;

use super::challenge::ChallengeStore;

const DEFAULT_SESSION_TTL_SECONDS: i64 = 8 * 60 * 60;
const DEFAULT_CHALLENGE_TTL_SECONDS: u64 = 5 * 60;
const DEFAULT_HISTORY_LIMIT: i64 = 10;
const DEFAULT_ISSUER: &str = "Clinica";

#[derive(Clone, Debug)]
pub struct AuthConfig {
    frontend_base_url: String,
    issuer: String,
    session_key: SecretString,
    session_ttl_seconds: i64,
    challenge_ttl_seconds: u64,
    history_limit: i64,
}

impl AuthConfig {
    #[must_use]
    pub fn new(frontend_base_url: String, session_key: SecretString) -> Self {
        Self {
            frontend_base_url,
            issuer: DEFAULT_ISSUER.to_string(),
            session_key,
            session_ttl_seconds: DEFAULT_SESSION_TTL_SECONDS,
            challenge_ttl_seconds: DEFAULT_CHALLENGE_TTL_SECONDS,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }

    #[must_use]
    pub fn with_issuer(mut self, issuer: String) -> Self {
        self.issuer = issuer;
        self
    }

    #[must_use]
    pub fn with_session_ttl_seconds(mut self, seconds: i64) -> Self {
        self.session_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_challenge_ttl_seconds(mut self, seconds: u64) -> Self {
        self.challenge_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_history_limit(mut self, limit: i64) -> Self {
        self.history_limit = limit;
        self
    }

    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub(crate) fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    pub(crate) fn session_key(&self) -> &SecretString {
        &self.session_key
    }

    pub(super) fn session_ttl_seconds(&self) -> i64 {
        self.session_ttl_seconds
    }

    pub(super) fn challenge_ttl_seconds(&self) -> u64 {
        self.challenge_ttl_seconds
    }

    pub(crate) fn history_limit(&self) -> i64 {
        self.history_limit
    }

    pub(super) fn session_cookie_secure(&self) -> bool {
        self.frontend_base_url.starts_with("https://")
    }
}

pub struct AuthState {
    config: AuthConfig,
    challenges: ChallengeStore,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        let challenges =
            ChallengeStore::new(Duration::from_secs(config.challenge_ttl_seconds()));
        Self { config, challenges }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub(super) fn challenges(&self) -> &ChallengeStore {
        &self.challenges
    }
}

#[cfg(test)]
mod tests {
    use super::{AuthConfig, AuthState};
    use secrecy::SecretString;

    fn config() -> AuthConfig {
        AuthConfig::new(
            "https://clinica.dev".to_string(),
            SecretString::from("test-session-key"),
        )
    }

    #[test]
    fn auth_config_defaults_and_overrides() {
        let config = config();

        assert_eq!(config.frontend_base_url(), "https://clinica.dev");
        assert_eq!(config.issuer(), super::DEFAULT_ISSUER);
        assert_eq!(
            config.session_ttl_seconds(),
            super::DEFAULT_SESSION_TTL_SECONDS
        );
        assert_eq!(
            config.challenge_ttl_seconds(),
            super::DEFAULT_CHALLENGE_TTL_SECONDS
        );
        assert_eq!(config.history_limit(), super::DEFAULT_HISTORY_LIMIT);
        assert!(config.session_cookie_secure());

        let config = config
            .with_issuer("Clinica Test".to_string())
            .with_session_ttl_seconds(60)
            .with_challenge_ttl_seconds(10)
            .with_history_limit(5);

        assert_eq!(config.issuer(), "Clinica Test");
        assert_eq!(config.session_ttl_seconds(), 60);
        assert_eq!(config.challenge_ttl_seconds(), 10);
        assert_eq!(config.history_limit(), 5);
    }

    #[test]
    fn cookie_secure_follows_frontend_scheme() {
        let config = AuthConfig::new(
            "http://localhost:3000".to_string(),
            SecretString::from("key"),
        );
        assert!(!config.session_cookie_secure());
    }

    #[test]
    fn auth_state_exposes_config() {
        let state = AuthState::new(config().with_issuer("Clinica".to_string()));
        assert_eq!(state.config().issuer(), "Clinica");
    }
}
