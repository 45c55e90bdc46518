use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};

use tillworks_auth::{Action, Category, Level};
use tillworks_core::InvoiceId;
use tillworks_invoicing::InvoiceStatus;

use crate::app::services::AppServices;
use crate::app::{dto, errors};
use crate::context::RequestContext;

pub fn router() -> Router {
    Router::new()
        .route("/", get(list_invoices).post(create_invoice))
        .route("/:id", get(get_invoice))
        .route("/:id/cancel", post(cancel_invoice))
}

pub async fn list_invoices(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<dto::StoreQuery>,
) -> axum::response::Response {
    if let Err(e) = ctx.actor().require_capability(
        Category::StoreManagement,
        Action::InvoiceList,
        Level::ReadOnly,
    ) {
        return errors::domain_error_to_response(e);
    }

    match services
        .invoices
        .list(ctx.actor(), ctx.scope(), query.store)
        .await
    {
        Ok(invoices) => {
            (StatusCode::OK, Json(serde_json::json!({ "items": invoices }))).into_response()
        }
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Issue (default) or draft an invoice. Issuing posts SOLD rows to the
/// stock ledger in the same commit; a draft touches nothing but the invoice.
pub async fn create_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Json(body): Json<dto::CreateInvoiceRequest>,
) -> axum::response::Response {
    let action = match body.status {
        InvoiceStatus::Draft => Action::SaveDraft,
        _ => Action::QuickBill,
    };
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::StoreManagement, action, Level::ReadWrite)
    {
        return errors::domain_error_to_response(e);
    }

    match services
        .invoices
        .create(ctx.actor(), ctx.scope(), body.status, body.invoice)
        .await
    {
        Ok((invoice, posting)) => (
            StatusCode::CREATED,
            Json(serde_json::json!({
                "invoice": invoice,
                "posting": posting,
            })),
        )
            .into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

pub async fn get_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = ctx.actor().require_capability(
        Category::StoreManagement,
        Action::InvoiceList,
        Level::ReadOnly,
    ) {
        return errors::domain_error_to_response(e);
    }
    let id: InvoiceId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.invoices.get(ctx.scope(), id).await {
        Ok(invoice) => (StatusCode::OK, Json(invoice)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}

/// Cancellation marks the invoice; posted SOLD rows stay in the ledger.
pub async fn cancel_invoice(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<String>,
) -> axum::response::Response {
    if let Err(e) = ctx.actor().require_capability(
        Category::StoreManagement,
        Action::QuickBill,
        Level::ReadWrite,
    ) {
        return errors::domain_error_to_response(e);
    }
    let id: InvoiceId = match id.parse() {
        Ok(v) => v,
        Err(e) => return errors::domain_error_to_response(e),
    };

    match services.invoices.cancel(ctx.actor(), ctx.scope(), id).await {
        Ok(invoice) => (StatusCode::OK, Json(invoice)).into_response(),
        Err(e) => errors::domain_error_to_response(e),
    }
}
