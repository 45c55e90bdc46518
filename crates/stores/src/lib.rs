//! `tillworks-stores` — the store forest and the scope it induces.
//!
//! Stores form a parent/child forest; an actor's reach over that forest is
//! the single tenant-isolation boundary for every store-owned entity.

pub mod scope;
pub mod store;
pub mod tree;

pub use scope::{resolve_access_scope, resolve_store_id};
pub use store::{NewStore, Store, StorePatch};
pub use tree::StoreTree;
