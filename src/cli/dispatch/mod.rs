//! Command-line argument dispatch and server initialization.
//!
//! This module parses validated CLI arguments and maps them to the appropriate
//! action, such as starting the API server with its full configuration state.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::auth;
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let auth_opts = auth::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        session_key: auth_opts.session_key,
        issuer: auth_opts.issuer,
        session_ttl_seconds: auth_opts.session_ttl_seconds,
        challenge_ttl_seconds: auth_opts.challenge_ttl_seconds,
        history_limit: auth_opts.history_limit,
        frontend_base_url: auth_opts.frontend_base_url,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_action_carries_auth_options() {
        temp_env::with_vars(
            [
                ("CLINICA_DSN", Some("postgres://localhost:5432/clinica")),
                ("CLINICA_SESSION_KEY", Some("dispatch-session-key")),
                ("CLINICA_SESSION_TTL_SECONDS", Some("7200")),
                ("CLINICA_FRONTEND_BASE_URL", Some("http://localhost:3000")),
            ],
            || {
                let command = crate::cli::commands::new();
                let matches = command.get_matches_from(vec!["clinica-auth"]);
                let action = handler(&matches).expect("valid action");
                let Action::Server(args) = action;
                assert_eq!(args.port, 8080);
                assert_eq!(args.dsn, "postgres://localhost:5432/clinica");
                assert_eq!(args.session_key, "dispatch-session-key");
                assert_eq!(args.session_ttl_seconds, 7200);
                assert_eq!(args.frontend_base_url, "http://localhost:3000");
            },
        );
    }
}
