//! Application services.
//!
//! Each service owns one slice of the back office and is handed its
//! repositories as `Arc<dyn Trait>`, so the HTTP layer can wire the same
//! service against the in-memory backend or Postgres. Capability checks
//! stay at the route layer; services enforce scope, referential rules and
//! record keeping.

mod audit;
mod catalog;
mod invoices;
mod parties;
mod roles;
mod scope;
mod stock;
mod stores;
mod users;

pub use audit::AuditService;
pub use catalog::{CatalogService, ItemListing};
pub use invoices::InvoiceService;
pub use parties::PartyService;
pub use roles::RoleService;
pub use scope::ScopeService;
pub use stock::StockService;
pub use stores::{STORE_ADMIN_ROLE_NAME, StoreService, store_admin_matrix};
pub use users::UserService;
