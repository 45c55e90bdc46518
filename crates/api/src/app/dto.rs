use chrono::{DateTime, Utc};
use serde::Deserialize;

use tillworks_auth::{PermissionSchema, User};
use tillworks_core::StoreId;
use tillworks_invoicing::{InvoiceStatus, NewInvoice};

// -------------------------
// Request DTOs
// -------------------------

/// `?store=` selector used by store-scoped lists and creates. Omitting it
/// falls back to the actor's home store.
#[derive(Debug, Default, Deserialize)]
pub struct StoreQuery {
    #[serde(default)]
    pub store: Option<StoreId>,
}

/// Stock report window. Bounds are RFC3339 timestamps; either may be open.
#[derive(Debug, Default, Deserialize)]
pub struct ReportQuery {
    #[serde(default)]
    pub store: Option<StoreId>,
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

/// Version token accompanying role mutations that arrive without a body.
#[derive(Debug, Default, Deserialize)]
pub struct VersionQuery {
    #[serde(default)]
    pub version: Option<u64>,
}

/// Invoice creation payload: the domain input plus the status to create in.
/// The default is an immediate issue (quick bill); `"status": "DRAFT"`
/// saves without touching stock.
#[derive(Debug, Deserialize)]
pub struct CreateInvoiceRequest {
    #[serde(default = "default_invoice_status")]
    pub status: InvoiceStatus,
    #[serde(flatten)]
    pub invoice: NewInvoice,
}

fn default_invoice_status() -> InvoiceStatus {
    InvoiceStatus::Issued
}

// -------------------------
// Response mapping
// -------------------------

/// Users cross the wire through this mapping only: the stored password hash
/// never leaves the process.
pub fn user_to_json(user: &User) -> serde_json::Value {
    serde_json::json!({
        "id": user.id,
        "name": user.name,
        "email": user.email,
        "role": user.role,
        "store": user.store,
        "is_master_admin": user.is_master_admin,
        "is_parent_admin": user.is_parent_admin,
        "accessible_stores": user.accessible_stores,
        "status": user.status,
        "last_login_at": user.last_login_at,
        "created_at": user.created_at,
        "updated_at": user.updated_at,
    })
}

/// The full capability schema, grouped by category, as role editors consume
/// it: which actions exist, the levels each accepts, and the defaults.
pub fn schema_to_json(schema: &PermissionSchema) -> serde_json::Value {
    let categories = schema
        .categories()
        .map(|(category, specs)| {
            serde_json::json!({
                "key": category.as_str(),
                "label": category.label(),
                "actions": specs
                    .iter()
                    .map(|spec| {
                        serde_json::json!({
                            "key": spec.action.as_str(),
                            "label": spec.label,
                            "levels": spec.levels.iter().map(|level| level.as_str()).collect::<Vec<_>>(),
                            "default_level": spec.default_level.as_str(),
                        })
                    })
                    .collect::<Vec<_>>(),
            })
        })
        .collect::<Vec<_>>();

    serde_json::json!({ "categories": categories })
}
