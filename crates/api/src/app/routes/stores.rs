use std::sync::Arc;

use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    routing::get,
    Json, Router,
};

use tillworks_auth::{Action, Category, Level};
use tillworks_core::StoreId;
use tillworks_stores::{NewStore, StorePatch};

use crate::app::errors;
use crate::app::services::AppServices;
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_stores).post(create_store))
        .route("/:id", get(get_store).put(update_store).delete(delete_store))
}

pub async fn list_stores(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::StoreManagement, Action::StoreList, Level::ReadOnly)
    {
        return errors::domain_error_to_response(e);
    }

    match services.stores.list(ctx.scope()).await {
        Ok(stores) => (StatusCode::OK, Json(serde_json::json!({ "items": stores }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_store(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<NewStore>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::StoreManagement, Action::AddStore, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }
    // Attaching under a parent is a separate grant.
    if body.parent.is_some() {
        if let Err(e) = ctx.actor().require_capability(
            Category::StoreManagement,
            Action::AddChildStore,
            Level::ReadWrite,
        ) {
            return errors::domain_error_to_response(e);
        }
    }

    match services.stores.create(ctx.actor(), ctx.scope(), body).await {
        Ok(store) => (StatusCode::CREATED, Json(store)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_store(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::StoreManagement, Action::StoreList, Level::ReadOnly)
    {
        return errors::domain_error_to_response(e);
    }
    let id: StoreId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.stores.get(ctx.scope(), id).await {
        Ok(store) => (StatusCode::OK, Json(store)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_store(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<StorePatch>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::StoreManagement, Action::EditStore, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }
    let id: StoreId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.stores.update(ctx.actor(), ctx.scope(), id, body).await {
        Ok(store) => (StatusCode::OK, Json(store)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_store(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = ctx.actor().require_capability(
        Category::StoreManagement,
        Action::DeleteStore,
        Level::ReadWrite,
    ) {
        return errors::domain_error_to_response(e);
    }
    let id: StoreId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.stores.deactivate(ctx.actor(), ctx.scope(), id).await {
        Ok(store) => (StatusCode::OK, Json(store)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
