use crate::api::handlers::{auth, health, profile};
use utoipa::openapi::{InfoBuilder, OpenApiBuilder, Tag};
use utoipa_axum::{router::OpenApiRouter, routes};

#[must_use]
pub fn openapi() -> utoipa::openapi::OpenApi {
    // Reuse the same router wiring and only return the generated OpenAPI spec.
    let (_router, openapi) = api_router().split_for_parts();
    openapi
}

/// Build the router that also drives the `OpenAPI` document.
///
/// Add new endpoints here via `.routes(routes!(...))` so they are both served
/// and included in the generated `OpenAPI` spec.
pub(crate) fn api_router() -> OpenApiRouter {
    // `routes!` reads #[utoipa::path] to bind HTTP method + path and add the route to OpenAPI.
    // Tags are seeded on the base OpenAPI (see `cargo_openapi`); `.routes()` only touches
    // `paths`/`components`, so the top-level tags flow through unchanged.
    OpenApiRouter::with_openapi(cargo_openapi())
        .routes(routes!(health::health))
        .routes(routes!(auth::login))
        .routes(routes!(auth::mfa_verify))
        .routes(routes!(auth::session::session))
        .routes(routes!(auth::session::logout))
        .routes(routes!(auth::mfa::enroll_start))
        .routes(routes!(auth::mfa::enroll_finish))
        .routes(routes!(auth::mfa::disable))
        .routes(routes!(profile::get_language, profile::put_language))
        .routes(routes!(profile::access_history))
}

fn cargo_openapi() -> utoipa::openapi::OpenApi {
    // Use Cargo.toml metadata instead of the utoipa-axum crate info defaults.
    let info = InfoBuilder::new()
        .title(env!("CARGO_PKG_NAME"))
        .version(env!("CARGO_PKG_VERSION"))
        .description(Some(env!("CARGO_PKG_DESCRIPTION")))
        .build();

    let mut auth_tag = Tag::new("auth");
    auth_tag.description = Some("Login, MFA, and session management".to_string());
    let mut profile_tag = Tag::new("profile");
    profile_tag.description = Some("Language preference and access history".to_string());

    OpenApiBuilder::new()
        .info(info)
        .tags(Some(vec![auth_tag, profile_tag]))
        .build()
}
