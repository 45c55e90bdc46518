use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{delete, get, put},
    Json, Router,
};

use tillworks_auth::{Action, Category, Level};
use tillworks_core::{MovementId, PartyId};
use tillworks_inventory::{BalanceWindow, MovementKind, NewPurchase, NewWastage};
use tillworks_parties::{NewParty, PartyKind, PartyPatch};

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/suppliers", get(list_suppliers).post(create_supplier))
        .route("/suppliers/:id", put(update_supplier).delete(delete_supplier))
        .route("/buyers", get(list_buyers).post(create_buyer))
        .route("/buyers/:id", put(update_buyer).delete(delete_buyer))
        .route("/purchases", get(list_purchases).post(record_purchase))
        .route("/wastage", get(list_wastage).post(record_wastage))
        .route("/sold", get(list_sold))
        .route("/stock-report", get(stock_report))
        .route("/:kind/:id", delete(delete_movement))
}

/// Movement kinds addressable from the wire, with the action that gates
/// their removal. SOLD rows cap at read-only in the schema, so deleting one
/// is reserved for the master bypass.
fn movement_kind(raw: &str) -> Option<(MovementKind, Action)> {
    match raw {
        "purchases" => Some((MovementKind::Purchase, Action::StockPurchase)),
        "wastage" => Some((MovementKind::Wastage, Action::Wastage)),
        "sold" => Some((MovementKind::Sold, Action::StockSold)),
        _ => None,
    }
}

// ----- suppliers / buyers -----

async fn list_parties(
    services: &AppServices,
    ctx: &RequestContext,
    kind: PartyKind,
    action: Action,
    store: Option<tillworks_core::StoreId>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Inventory, action, Level::ReadOnly)
    {
        return errors::domain_error_to_response(e);
    }

    match services
        .parties
        .list(ctx.actor(), ctx.scope(), kind, store)
        .await
    {
        Ok(parties) => {
            (StatusCode::OK, Json(serde_json::json!({ "items": parties }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

async fn create_party(
    services: &AppServices,
    ctx: &RequestContext,
    kind: PartyKind,
    action: Action,
    store: Option<tillworks_core::StoreId>,
    body: NewParty,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Inventory, action, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }

    match services
        .parties
        .create(ctx.actor(), ctx.scope(), kind, store, body)
        .await
    {
        Ok(party) => (StatusCode::CREATED, Json(party)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

async fn update_party(
    services: &AppServices,
    ctx: &RequestContext,
    kind: PartyKind,
    action: Action,
    id: String,
    body: PartyPatch,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Inventory, action, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }
    let id: PartyId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .parties
        .update(ctx.actor(), ctx.scope(), kind, id, body)
        .await
    {
        Ok(party) => (StatusCode::OK, Json(party)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

async fn delete_party(
    services: &AppServices,
    ctx: &RequestContext,
    kind: PartyKind,
    action: Action,
    id: String,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Inventory, action, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }
    let id: PartyId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .parties
        .deactivate(ctx.actor(), ctx.scope(), kind, id)
        .await
    {
        Ok(party) => (StatusCode::OK, Json(party)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_suppliers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::StoreQuery>,
) -> axum::response::Response {
    list_parties(&services, &ctx, PartyKind::Supplier, Action::Suppliers, query.store).await
}

pub async fn create_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::StoreQuery>,
    Json(body): Json<NewParty>,
) -> axum::response::Response {
    create_party(
        &services,
        &ctx,
        PartyKind::Supplier,
        Action::Suppliers,
        query.store,
        body,
    )
    .await
}

pub async fn update_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<PartyPatch>,
) -> axum::response::Response {
    update_party(&services, &ctx, PartyKind::Supplier, Action::Suppliers, id, body).await
}

pub async fn delete_supplier(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    delete_party(&services, &ctx, PartyKind::Supplier, Action::Suppliers, id).await
}

pub async fn list_buyers(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::StoreQuery>,
) -> axum::response::Response {
    list_parties(&services, &ctx, PartyKind::Buyer, Action::Buyers, query.store).await
}

pub async fn create_buyer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::StoreQuery>,
    Json(body): Json<NewParty>,
) -> axum::response::Response {
    create_party(
        &services,
        &ctx,
        PartyKind::Buyer,
        Action::Buyers,
        query.store,
        body,
    )
    .await
}

pub async fn update_buyer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
    Json(body): Json<PartyPatch>,
) -> axum::response::Response {
    update_party(&services, &ctx, PartyKind::Buyer, Action::Buyers, id, body).await
}

pub async fn delete_buyer(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    delete_party(&services, &ctx, PartyKind::Buyer, Action::Buyers, id).await
}

// ----- stock movements -----

pub async fn list_purchases(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::StoreQuery>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Inventory, Action::StockPurchase, Level::ReadOnly)
    {
        return errors::domain_error_to_response(e);
    }

    match services
        .stock
        .list(ctx.actor(), ctx.scope(), MovementKind::Purchase, query.store)
        .await
    {
        Ok(movements) => {
            (StatusCode::OK, Json(serde_json::json!({ "items": movements }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn record_purchase(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::StoreQuery>,
    Json(body): Json<NewPurchase>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Inventory, Action::StockPurchase, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }

    match services
        .stock
        .record_purchase(ctx.actor(), ctx.scope(), query.store, body)
        .await
    {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn list_wastage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::StoreQuery>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Inventory, Action::Wastage, Level::ReadOnly)
    {
        return errors::domain_error_to_response(e);
    }

    match services
        .stock
        .list(ctx.actor(), ctx.scope(), MovementKind::Wastage, query.store)
        .await
    {
        Ok(movements) => {
            (StatusCode::OK, Json(serde_json::json!({ "items": movements }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn record_wastage(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::StoreQuery>,
    Json(body): Json<NewWastage>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Inventory, Action::Wastage, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }

    match services
        .stock
        .record_wastage(ctx.actor(), ctx.scope(), query.store, body)
        .await
    {
        Ok(movement) => (StatusCode::CREATED, Json(movement)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// SOLD rows are written by invoice issuance only; this view is read-only.
pub async fn list_sold(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::StoreQuery>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Inventory, Action::StockSold, Level::ReadOnly)
    {
        return errors::domain_error_to_response(e);
    }

    match services
        .stock
        .list(ctx.actor(), ctx.scope(), MovementKind::Sold, query.store)
        .await
    {
        Ok(movements) => {
            (StatusCode::OK, Json(serde_json::json!({ "items": movements }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn delete_movement(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path((kind, id)): Path<(String, String)>,
) -> axum::response::Response {
    let Some((kind, action)) = movement_kind(&kind) else {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "invalid_kind",
            "kind must be one of: purchases, wastage, sold",
        );
    };
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Inventory, action, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }
    let id: MovementId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services
        .stock
        .deactivate(ctx.actor(), ctx.scope(), kind, id)
        .await
    {
        Ok(()) => (StatusCode::OK, Json(serde_json::json!({ "deleted": true }))).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn stock_report(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::ReportQuery>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Inventory, Action::StockReport, Level::Show)
    {
        return errors::domain_error_to_response(e);
    }

    let window = BalanceWindow {
        from: query.from,
        to: query.to,
    };

    match services
        .stock
        .report(ctx.actor(), ctx.scope(), query.store, window)
        .await
    {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
