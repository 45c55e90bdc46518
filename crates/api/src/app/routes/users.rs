use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use tillworks_auth::{Action, Category, Level, NewUser, UserPatch};
use tillworks_core::UserId;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_users).post(create_user))
        .route("/:id", get(get_user).put(update_user).delete(delete_user))
}

pub async fn list_users(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Users, Action::Users, Level::ReadOnly)
    {
        return errors::domain_error_to_response(e);
    }

    match services.users.list(ctx.actor(), ctx.scope()).await {
        Ok(users) => {
            let items = users.iter().map(dto::user_to_json).collect::<Vec<_>>();
            (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewUser>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Users, Action::Users, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }

    match services.users.create(ctx.actor(), ctx.scope(), body).await {
        Ok(user) => (StatusCode::CREATED, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Users, Action::Users, Level::ReadOnly)
    {
        return errors::domain_error_to_response(e);
    }
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.users.get(ctx.actor(), ctx.scope(), id).await {
        Ok(user) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<UserPatch>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Users, Action::Users, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.users.update(ctx.actor(), ctx.scope(), id, body).await {
        Ok(user) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_user(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Users, Action::Users, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }
    let id: UserId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.users.deactivate(ctx.actor(), ctx.scope(), id).await {
        Ok(user) => (StatusCode::OK, Json(dto::user_to_json(&user))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
