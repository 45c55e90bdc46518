use axum::{extract::Extension, http::StatusCode, response::IntoResponse, Json};

use tillworks_auth::{Action, Category, Level, PermissionSchema};

use crate::app::{dto, errors};
use crate::context::RequestContext;

pub async fn healthz() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(Extension(ctx): Extension<RequestContext>) -> impl IntoResponse {
    let actor = ctx.actor();
    Json(serde_json::json!({
        "user_id": actor.user_id,
        "name": actor.name,
        "role": actor.role,
        "store": actor.store,
        "is_master_admin": actor.is_master_admin,
        "scope": ctx.scope(),
    }))
}

/// Capability schema for role editors: categories, actions, allowed levels.
pub async fn permission_schema(
    Extension(ctx): Extension<RequestContext>,
) -> axum::response::Response {
    if let Err(e) = ctx
        .actor()
        .require_capability(Category::Users, Action::Role, Level::ReadOnly)
    {
        return errors::domain_error_to_response(e);
    }

    let schema = PermissionSchema::retail();
    (StatusCode::OK, Json(dto::schema_to_json(&schema))).into_response()
}
