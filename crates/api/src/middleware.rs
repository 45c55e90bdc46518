use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::Response,
};
use chrono::Utc;

use tillworks_auth::Hs256JwtValidator;
use tillworks_core::DomainError;

use crate::app::services::AppServices;
use crate::context::RequestContext;

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Hs256JwtValidator,
    pub services: Arc<AppServices>,
}

/// Bearer token -> actor -> scope. Every protected route runs behind this;
/// handlers can rely on a `RequestContext` extension being present.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let token = extract_bearer(req.headers())?;

    let claims = state
        .jwt
        .validate(token, Utc::now())
        .map_err(|_e| StatusCode::UNAUTHORIZED)?;

    let actor = match state.services.users.resolve_actor(claims.sub).await {
        Ok(actor) => actor,
        Err(DomainError::Internal(message)) => {
            tracing::error!(%message, "actor resolution failed");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
        Err(_) => return Err(StatusCode::UNAUTHORIZED),
    };

    let scope = match state.services.scope.scope_for(&actor).await {
        Ok(scope) => scope,
        Err(error) => {
            tracing::error!(%error, "scope resolution failed");
            return Err(StatusCode::INTERNAL_SERVER_ERROR);
        }
    };

    req.extensions_mut().insert(RequestContext::new(actor, scope));

    Ok(next.run(req).await)
}

fn extract_bearer(headers: &HeaderMap) -> Result<&str, StatusCode> {
    let header = headers
        .get(axum::http::header::AUTHORIZATION)
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;

    let header = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let token = header.trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(token)
}
