use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use tillworks_core::{ConflictKind, DomainError};

/// One mapping from domain failures to the wire contract. Internal errors
/// are logged and masked; everything else carries its message through.
pub fn domain_error_to_response(err: DomainError) -> axum::response::Response {
    match err {
        DomainError::Validation(message) => {
            json_error(StatusCode::BAD_REQUEST, "validation_error", message)
        }
        DomainError::InvalidId(message) => json_error(StatusCode::BAD_REQUEST, "invalid_id", message),
        DomainError::Unauthorized => {
            json_error(StatusCode::UNAUTHORIZED, "unauthorized", "unauthorized")
        }
        DomainError::Forbidden(message) => json_error(StatusCode::FORBIDDEN, "forbidden", message),
        DomainError::NotFound => json_error(StatusCode::NOT_FOUND, "not_found", "not found"),
        DomainError::Conflict { kind, message } => {
            let code = match kind {
                ConflictKind::DuplicateKey => "duplicate_key",
                ConflictKind::StaleVersion => "stale_version",
            };
            json_error(StatusCode::CONFLICT, code, message)
        }
        DomainError::Internal(message) => {
            tracing::error!(%message, "internal error reached the API boundary");
            json_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "internal error",
            )
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": {
                "code": code,
                "message": message.into(),
            },
        })),
    )
        .into_response()
}
