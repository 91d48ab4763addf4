use anyhow::{Context, Result};
use clap::{Arg, ArgMatches, Command};

pub const ARG_SESSION_KEY: &str = "session-key";
pub const ARG_ISSUER: &str = "issuer";
pub const ARG_SESSION_TTL_SECONDS: &str = "session-ttl-seconds";
pub const ARG_CHALLENGE_TTL_SECONDS: &str = "challenge-ttl-seconds";
pub const ARG_HISTORY_LIMIT: &str = "history-limit";
pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";

/// Parsed auth arguments, consumed by dispatch.
#[derive(Debug)]
pub struct Options {
    pub session_key: String,
    pub issuer: String,
    pub session_ttl_seconds: i64,
    pub challenge_ttl_seconds: u64,
    pub history_limit: i64,
    pub frontend_base_url: String,
}

impl Options {
    /// Extract auth options from parsed matches.
    ///
    /// # Errors
    /// Returns an error if a required argument is missing.
    pub fn parse(matches: &ArgMatches) -> Result<Self> {
        Ok(Self {
            session_key: matches
                .get_one::<String>(ARG_SESSION_KEY)
                .cloned()
                .context("missing required argument: --session-key")?,
            issuer: matches
                .get_one::<String>(ARG_ISSUER)
                .cloned()
                .unwrap_or_else(|| "Clinica".to_string()),
            session_ttl_seconds: matches
                .get_one::<i64>(ARG_SESSION_TTL_SECONDS)
                .copied()
                .unwrap_or(28_800),
            challenge_ttl_seconds: matches
                .get_one::<u64>(ARG_CHALLENGE_TTL_SECONDS)
                .copied()
                .unwrap_or(300),
            history_limit: matches
                .get_one::<i64>(ARG_HISTORY_LIMIT)
                .copied()
                .unwrap_or(10),
            frontend_base_url: matches
                .get_one::<String>(ARG_FRONTEND_BASE_URL)
                .cloned()
                .unwrap_or_else(|| "https://clinica.localhost".to_string()),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_SESSION_KEY)
                .long(ARG_SESSION_KEY)
                .help("Secret key used to sign session claims")
                .env("CLINICA_SESSION_KEY")
                .required(true),
        )
        .arg(
            Arg::new(ARG_ISSUER)
                .long(ARG_ISSUER)
                .help("Issuer name embedded in session claims and enrollment URIs")
                .env("CLINICA_ISSUER")
                .default_value("Clinica"),
        )
        .arg(
            Arg::new(ARG_SESSION_TTL_SECONDS)
                .long(ARG_SESSION_TTL_SECONDS)
                .help("Fixed session lifetime in seconds")
                .env("CLINICA_SESSION_TTL_SECONDS")
                .default_value("28800")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_CHALLENGE_TTL_SECONDS)
                .long(ARG_CHALLENGE_TTL_SECONDS)
                .help("TTL for pending MFA challenges in seconds")
                .env("CLINICA_CHALLENGE_TTL_SECONDS")
                .default_value("300")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_HISTORY_LIMIT)
                .long(ARG_HISTORY_LIMIT)
                .help("Maximum access-history entries returned per request")
                .env("CLINICA_HISTORY_LIMIT")
                .default_value("10")
                .value_parser(clap::value_parser!(i64)),
        )
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL used for CORS and cookie security")
                .env("CLINICA_FRONTEND_BASE_URL")
                .default_value("https://clinica.localhost"),
        )
}
