//! Service construction: one backend choice, one service set.

use std::sync::Arc;

use sqlx::PgPool;

use tillworks_auth::PermissionSchema;
use tillworks_core::{DomainError, DomainResult};
use tillworks_infra::repo::{InvoiceRepo, MemoryBackend, PostgresStockLedger, StockLedger};
use tillworks_infra::services::{
    AuditService, CatalogService, InvoiceService, PartyService, RoleService, ScopeService,
    StockService, StoreService, UserService,
};

/// Every domain service the handlers reach for, wired over one backend.
pub struct AppServices {
    pub stores: StoreService,
    pub roles: RoleService,
    pub users: UserService,
    pub catalog: CatalogService,
    pub parties: PartyService,
    pub stock: StockService,
    pub invoices: InvoiceService,
    pub scope: ScopeService,
    pub audit: AuditService,
}

/// Wire the service set. Directory data (stores, roles, users, catalog,
/// parties) always lives in memory; `DATABASE_URL` moves the stock ledger,
/// and the invoices committed in the same transaction, onto Postgres.
pub async fn build_services(database_url: Option<&str>) -> DomainResult<AppServices> {
    let backend = Arc::new(MemoryBackend::new());

    match database_url {
        Some(url) => {
            let pool = PgPool::connect(url)
                .await
                .map_err(|e| DomainError::internal(format!("postgres connect failed: {e}")))?;
            let ledger = Arc::new(PostgresStockLedger::new(pool));
            ledger.migrate().await?;
            tracing::info!("stock ledger backed by postgres");
            Ok(wire(backend, ledger.clone(), ledger))
        }
        None => Ok(with_memory_backend(backend)),
    }
}

/// Wire everything over a shared in-memory backend. Black-box tests use
/// this to keep a seeding handle on the backend behind the server.
pub fn with_memory_backend(backend: Arc<MemoryBackend>) -> AppServices {
    wire(backend.clone(), backend.clone(), backend)
}

fn wire(
    backend: Arc<MemoryBackend>,
    ledger: Arc<dyn StockLedger>,
    invoices: Arc<dyn InvoiceRepo>,
) -> AppServices {
    let schema = PermissionSchema::retail();
    let scope = ScopeService::new(backend.clone());
    let audit = AuditService::new(backend.clone());

    AppServices {
        stores: StoreService::new(
            backend.clone(),
            backend.clone(),
            scope.clone(),
            schema.clone(),
            audit.clone(),
        ),
        roles: RoleService::new(backend.clone(), scope.clone(), schema.clone(), audit.clone()),
        users: UserService::new(
            backend.clone(),
            backend.clone(),
            scope.clone(),
            schema.clone(),
            audit.clone(),
        ),
        catalog: CatalogService::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            ledger.clone(),
            scope.clone(),
            audit.clone(),
        ),
        parties: PartyService::new(backend.clone(), scope.clone(), audit.clone()),
        stock: StockService::new(
            ledger.clone(),
            backend.clone(),
            backend.clone(),
            scope.clone(),
            audit.clone(),
        ),
        invoices: InvoiceService::new(
            invoices,
            ledger,
            backend.clone(),
            backend,
            scope.clone(),
            audit.clone(),
        ),
        scope,
        audit,
    }
}
