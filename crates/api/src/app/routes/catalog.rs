use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, put},
    Json, Router,
};

use tillworks_auth::{Action, Category, Level};
use tillworks_catalog::{
    CategoryPatch, EntryKind, EntryPatch, ItemPatch, NewCategory, NewEntry, NewItem,
};
use tillworks_core::{CategoryId, EntryId, ItemId};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/items", get(list_items).post(create_item))
        .route("/items/:id", put(update_item).delete(delete_item))
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/:id", put(update_category).delete(delete_category))
        .route("/catalog/:kind", get(list_entries).post(create_entry))
        .route("/catalog/:kind/:id", put(update_entry).delete(delete_entry))
}

/// Store-management action behind each configurable entry kind.
fn entry_action(kind: EntryKind) -> Action {
    match kind {
        EntryKind::Taxes => Action::TaxInfo,
        EntryKind::Discounts => Action::Discount,
        EntryKind::OrderTypes => Action::OrderType,
        EntryKind::PaymentTypes => Action::PaymentType,
        EntryKind::StoreConfiguration => Action::StoreConfig,
    }
}

fn parse_entry_kind(raw: &str) -> Result<EntryKind, axum::response::Response> {
    EntryKind::from_key(raw).ok_or_else(|| {
        errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_kind",
            "kind must be one of: taxes, discounts, order-types, payment-types, store-configuration",
        )
    })
}

// ----- items -----

pub async fn list_items(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::StoreQuery>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Items, Action::ItemMaster, Level::ReadOnly)
    {
        return errors::domain_error_to_response(e);
    }

    match services
        .catalog
        .list_items(ctx.actor(), ctx.scope(), query.store)
        .await
    {
        Ok(items) => (StatusCode::OK, Json(serde_json::json!({ "items": items }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::StoreQuery>,
    Json(body): Json<NewItem>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Items, Action::ItemMaster, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }

    match services
        .catalog
        .create_item(ctx.actor(), ctx.scope(), query.store, body)
        .await
    {
        Ok(item) => (StatusCode::CREATED, Json(item)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<ItemPatch>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Items, Action::ItemMaster, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }
    let id: ItemId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .catalog
        .update_item(ctx.actor(), ctx.scope(), id, body)
        .await
    {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Items, Action::ItemMaster, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }
    let id: ItemId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .catalog
        .deactivate_item(ctx.actor(), ctx.scope(), id)
        .await
    {
        Ok(item) => (StatusCode::OK, Json(item)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

// ----- categories -----

pub async fn list_categories(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::StoreQuery>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Items, Action::Categories, Level::ReadOnly)
    {
        return errors::domain_error_to_response(e);
    }

    match services
        .catalog
        .list_categories(ctx.actor(), ctx.scope(), query.store)
        .await
    {
        Ok(categories) => (
            StatusCode::OK,
            Json(serde_json::json!({ "items": categories })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::StoreQuery>,
    Json(body): Json<NewCategory>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Items, Action::Categories, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }

    match services
        .catalog
        .create_category(ctx.actor(), ctx.scope(), query.store, body)
        .await
    {
        Ok(category) => (StatusCode::CREATED, Json(category)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<CategoryPatch>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Items, Action::Categories, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }
    let id: CategoryId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .catalog
        .update_category(ctx.actor(), ctx.scope(), id, body)
        .await
    {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_category(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Items, Action::Categories, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }
    let id: CategoryId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .catalog
        .deactivate_category(ctx.actor(), ctx.scope(), id)
        .await
    {
        Ok(category) => (StatusCode::OK, Json(category)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

// ----- configurable entries (taxes, discounts, order/payment types, store config) -----

pub async fn list_entries(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(kind): Path<String>,
    Query(query): Query<dto::StoreQuery>,
) -> axum::response::Response {
    let kind = match parse_entry_kind(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    if let Err(e) = ctx.actor().require_capability(
        Category::StoreManagement,
        entry_action(kind),
        Level::ReadOnly,
    ) {
        return errors::domain_error_to_response(e);
    }

    match services
        .catalog
        .list_entries(ctx.actor(), ctx.scope(), kind, query.store)
        .await
    {
        Ok(entries) => {
            (StatusCode::OK, Json(serde_json::json!({ "items": entries }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn create_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(kind): Path<String>,
    Query(query): Query<dto::StoreQuery>,
    Json(body): Json<NewEntry>,
) -> axum::response::Response {
    let kind = match parse_entry_kind(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    if let Err(e) = ctx.actor().require_capability(
        Category::StoreManagement,
        entry_action(kind),
        Level::ReadWrite,
    ) {
        return errors::domain_error_to_response(e);
    }

    match services
        .catalog
        .create_entry(ctx.actor(), ctx.scope(), kind, query.store, body)
        .await
    {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn update_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path((kind, id)): Path<(String, String)>,
    Json(body): Json<EntryPatch>,
) -> axum::response::Response {
    let kind = match parse_entry_kind(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    if let Err(e) = ctx.actor().require_capability(
        Category::StoreManagement,
        entry_action(kind),
        Level::ReadWrite,
    ) {
        return errors::domain_error_to_response(e);
    }
    let id: EntryId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .catalog
        .update_entry(ctx.actor(), ctx.scope(), kind, id, body)
        .await
    {
        Ok(entry) => (StatusCode::OK, Json(entry)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_entry(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path((kind, id)): Path<(String, String)>,
) -> axum::response::Response {
    let kind = match parse_entry_kind(&kind) {
        Ok(kind) => kind,
        Err(resp) => return resp,
    };
    if let Err(e) = ctx.actor().require_capability(
        Category::StoreManagement,
        entry_action(kind),
        Level::ReadWrite,
    ) {
        return errors::domain_error_to_response(e);
    }
    let id: EntryId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .catalog
        .deactivate_entry(ctx.actor(), ctx.scope(), kind, id)
        .await
    {
        Ok(entry) => (StatusCode::OK, Json(entry)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
