use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use tillworks_auth::{Action, Category, Level, NewRole, RolePatch};
use tillworks_core::RoleId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_roles).post(create_role))
        .route("/:id", get(get_role).put(update_role).delete(delete_role))
}

pub async fn list_roles(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Users, Action::Role, Level::ReadOnly)
    {
        return errors::domain_error_to_response(e);
    }

    match services.roles.list(ctx.actor(), ctx.scope()).await {
        Ok(roles) => (StatusCode::OK, Json(serde_json::json!({ "items": roles }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewRole>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Users, Action::Role, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }

    match services.roles.create(ctx.actor(), ctx.scope(), body).await {
        Ok(role) => (StatusCode::CREATED, Json(role)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Users, Action::Role, Level::ReadOnly)
    {
        return errors::domain_error_to_response(e);
    }
    let id: RoleId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.roles.get(ctx.actor(), ctx.scope(), id).await {
        Ok(role) => (StatusCode::OK, Json(role)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<RolePatch>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Users, Action::Role, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }
    let id: RoleId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.roles.update(ctx.actor(), ctx.scope(), id, body).await {
        Ok(role) => (StatusCode::OK, Json(role)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_role(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Query(query): Query<dto::VersionQuery>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Users, Action::Role, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }
    let id: RoleId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };
    let Some(version) = query.version else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation_error",
            "version query parameter is required",
        );
    };

    match services
        .roles
        .deactivate(ctx.actor(), ctx.scope(), id, version)
        .await
    {
        Ok(role) => (StatusCode::OK, Json(role)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
