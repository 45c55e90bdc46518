//! Repository traits over the persistence layer.
//!
//! Every trait speaks `DomainResult` directly: unique-key rejections come
//! back as `Conflict(DuplicateKey)`, optimistic-concurrency misses as
//! `Conflict(StaleVersion)`, so services can pattern-match on `ConflictKind`
//! instead of inspecting backend error strings.
//!
//! `MemoryBackend` implements all of them and is the default wiring;
//! `PostgresStockLedger` implements the ledger and invoice traits over sqlx
//! for durable deployments.

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillworks_auth::{Role, RoleScope, User};
use tillworks_catalog::{CatalogEntry, Category, EntryKind, Item};
use tillworks_core::{
    AuditId, CategoryId, DomainResult, EntryId, InvoiceId, ItemId, MovementId, PartyId, RoleId,
    StoreId, UserId,
};
use tillworks_inventory::{MovementKind, StockMovement};
use tillworks_invoicing::Invoice;
use tillworks_parties::{Party, PartyKind};
use tillworks_stores::Store;

pub use memory::MemoryBackend;
pub use postgres::PostgresStockLedger;

#[async_trait]
pub trait StoreRepo: Send + Sync {
    /// Inserts a store; duplicate code → `Conflict(DuplicateKey)`.
    async fn insert(&self, store: Store) -> DomainResult<Store>;
    async fn update(&self, store: Store) -> DomainResult<Store>;
    async fn get(&self, id: StoreId) -> DomainResult<Option<Store>>;
    async fn list(&self) -> DomainResult<Vec<Store>>;
}

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Inserts a user; duplicate email → `Conflict(DuplicateKey)`.
    async fn insert(&self, user: User) -> DomainResult<User>;
    async fn update(&self, user: User) -> DomainResult<User>;
    async fn get(&self, id: UserId) -> DomainResult<Option<User>>;
    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>>;
    async fn list(&self) -> DomainResult<Vec<User>>;
}

#[async_trait]
pub trait RoleRepo: Send + Sync {
    /// Inserts a role; duplicate (name, scope, store) → `Conflict(DuplicateKey)`.
    async fn insert(&self, role: Role) -> DomainResult<Role>;
    /// Version-checked write. The stored version must equal
    /// `expected_version`, otherwise `Conflict(StaleVersion)`; on success the
    /// persisted role carries `expected_version + 1`.
    async fn update(&self, role: Role, expected_version: u64) -> DomainResult<Role>;
    async fn get(&self, id: RoleId) -> DomainResult<Option<Role>>;
    /// Lookup by the unique (name, scope, store) key.
    async fn find_by_key(
        &self,
        name: &str,
        scope: RoleScope,
        store: Option<StoreId>,
    ) -> DomainResult<Option<Role>>;
    async fn list(&self) -> DomainResult<Vec<Role>>;
}

#[async_trait]
pub trait ItemRepo: Send + Sync {
    async fn insert(&self, item: Item) -> DomainResult<Item>;
    async fn update(&self, item: Item) -> DomainResult<Item>;
    async fn get(&self, id: ItemId) -> DomainResult<Option<Item>>;
    async fn list_by_store(&self, store: StoreId) -> DomainResult<Vec<Item>>;
    /// Rewrites the denormalized category name on every item referencing
    /// `category`; returns how many rows changed.
    async fn rename_category(&self, category: CategoryId, name: &str) -> DomainResult<u64>;
}

#[async_trait]
pub trait CategoryRepo: Send + Sync {
    /// Inserts a category; duplicate (store, name) → `Conflict(DuplicateKey)`.
    async fn insert(&self, category: Category) -> DomainResult<Category>;
    async fn update(&self, category: Category) -> DomainResult<Category>;
    async fn get(&self, id: CategoryId) -> DomainResult<Option<Category>>;
    async fn list_by_store(&self, store: StoreId) -> DomainResult<Vec<Category>>;
}

#[async_trait]
pub trait PartyRepo: Send + Sync {
    /// Inserts a party; duplicate (store, kind, name) → `Conflict(DuplicateKey)`.
    async fn insert(&self, party: Party) -> DomainResult<Party>;
    async fn update(&self, party: Party) -> DomainResult<Party>;
    async fn get(&self, id: PartyId) -> DomainResult<Option<Party>>;
    async fn list(&self, store: StoreId, kind: PartyKind) -> DomainResult<Vec<Party>>;
}

#[async_trait]
pub trait CatalogRepo: Send + Sync {
    /// Inserts an entry; duplicate (kind, store, name) → `Conflict(DuplicateKey)`.
    async fn insert(&self, entry: CatalogEntry) -> DomainResult<CatalogEntry>;
    async fn update(&self, entry: CatalogEntry) -> DomainResult<CatalogEntry>;
    async fn get(&self, id: EntryId) -> DomainResult<Option<CatalogEntry>>;
    async fn list(&self, store: StoreId, kind: EntryKind) -> DomainResult<Vec<CatalogEntry>>;
}

#[async_trait]
pub trait InvoiceRepo: Send + Sync {
    /// Inserts an invoice; duplicate (store, number) → `Conflict(DuplicateKey)`.
    async fn insert(&self, invoice: Invoice) -> DomainResult<Invoice>;
    async fn update(&self, invoice: Invoice) -> DomainResult<Invoice>;
    async fn get(&self, id: InvoiceId) -> DomainResult<Option<Invoice>>;
    /// All invoices, newest first. Scope filtering happens in the service.
    async fn list(&self) -> DomainResult<Vec<Invoice>>;
}

/// Outcome of a batch SOLD posting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SalePosting {
    pub posted: u32,
    pub duplicates: u32,
}

#[async_trait]
pub trait StockLedger: Send + Sync {
    /// Appends one movement. An active SOLD row with the same
    /// (store, invoice, item) already present → `Conflict(DuplicateKey)`.
    async fn append(&self, movement: StockMovement) -> DomainResult<StockMovement>;
    async fn get(&self, id: MovementId) -> DomainResult<Option<StockMovement>>;
    /// Soft-delete: flips `is_active` so the row leaves every projection.
    async fn deactivate(&self, id: MovementId) -> DomainResult<()>;
    /// Active movements of one kind for a store, newest first.
    async fn list(&self, store: StoreId, kind: MovementKind) -> DomainResult<Vec<StockMovement>>;
    /// All active movements for a store, for balance projection.
    async fn movements(&self, store: StoreId) -> DomainResult<Vec<StockMovement>>;
    /// Persists an issued invoice together with its SOLD postings.
    ///
    /// Duplicate-key rejections are swallowed per row and counted; any other
    /// failure aborts the whole posting. Durable backends commit the invoice
    /// and the surviving rows in a single transaction.
    async fn post_invoice_sale(
        &self,
        invoice: Invoice,
        movements: Vec<StockMovement>,
    ) -> DomainResult<(Invoice, SalePosting)>;
}

/// One audit trail record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub id: AuditId,
    pub actor: Option<UserId>,
    pub action: String,
    pub entity_type: String,
    pub entity_id: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        actor: Option<UserId>,
        action: impl Into<String>,
        entity_type: impl Into<String>,
        entity_id: impl ToString,
        metadata: serde_json::Value,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: AuditId::new(),
            actor,
            action: action.into(),
            entity_type: entity_type.into(),
            entity_id: entity_id.to_string(),
            metadata,
            created_at: now,
        }
    }
}

#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, entry: AuditEntry) -> DomainResult<()>;
    async fn list(&self) -> DomainResult<Vec<AuditEntry>>;
}
