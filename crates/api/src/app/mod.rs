//! HTTP application wiring (axum router + service construction).
//!
//! - `services.rs`: backend selection and domain service wiring
//! - `routes/`: HTTP routes + handlers (one file per domain area)
//! - `dto.rs`: request DTOs and JSON mapping helpers
//! - `errors.rs`: the domain-error-to-wire mapping

use std::sync::Arc;

use axum::{routing::get, Extension, Router};
use tower::ServiceBuilder;

use tillworks_auth::Hs256JwtValidator;
use tillworks_core::DomainResult;

use crate::config::ApiConfig;
use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full application for `main.rs`: wire the backend from
/// configuration and seed the master role before serving.
pub async fn build_app(config: &ApiConfig) -> DomainResult<Router> {
    let services = Arc::new(services::build_services(config.database_url.as_deref()).await?);
    services.roles.seed_master().await?;

    let jwt = Hs256JwtValidator::new(&config.jwt_secret);
    Ok(app_with(services, jwt))
}

/// Assemble the router around prebuilt services. Black-box tests come in
/// here so they can share the backend with the server they spawn.
pub fn app_with(services: Arc<services::AppServices>, jwt: Hs256JwtValidator) -> Router {
    let auth_state = middleware::AuthState {
        jwt,
        services: services.clone(),
    };

    // Protected routes: bearer token -> actor -> scope.
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/healthz", get(routes::system::healthz))
        .merge(protected)
        .layer(ServiceBuilder::new())
}
