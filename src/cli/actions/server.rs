use crate::api;
use crate::api::handlers::auth::AuthConfig;
use anyhow::Result;
use secrecy::SecretString;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub dsn: String,
    pub session_key: String,
    pub issuer: String,
    pub session_ttl_seconds: i64,
    pub challenge_ttl_seconds: u64,
    pub history_limit: i64,
    pub frontend_base_url: String,
}

/// Execute the server action.
///
/// # Errors
/// Returns an error if the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let auth_config = AuthConfig::new(
        args.frontend_base_url,
        SecretString::from(args.session_key),
    )
    .with_issuer(args.issuer)
    .with_session_ttl_seconds(args.session_ttl_seconds)
    .with_challenge_ttl_seconds(args.challenge_ttl_seconds)
    .with_history_limit(args.history_limit);

    api::new(args.port, args.dsn, auth_config).await?;

    Ok(())
}
