use axum::{routing::get, Router};

pub mod catalog;
pub mod inventory;
pub mod invoices;
pub mod roles;
pub mod stores;
pub mod system;
pub mod users;

/// Router for all authenticated endpoints.
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/permission-schema", get(system::permission_schema))
        .nest("/stores", stores::router())
        .nest("/roles", roles::router())
        .nest("/users", users::router())
        .merge(catalog::router())
        .nest("/inventory", inventory::router())
        .nest("/invoices", invoices::router())
}
