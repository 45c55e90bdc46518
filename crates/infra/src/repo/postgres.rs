//! Postgres-backed stock ledger (and the invoices it commits with).
//!
//! The SOLD uniqueness invariant lives in the schema: a partial unique index
//! over active SOLD rows. Violations surface as SQLSTATE 23505 and are mapped
//! to `Conflict(DuplicateKey)`, which batch posting swallows per row inside
//! one outer transaction (savepoint per row), so the invoice and its
//! surviving postings commit together.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{Acquire, FromRow, PgPool, Postgres, Row};
use tracing::instrument;
use uuid::Uuid;

use tillworks_core::{
    ConflictKind, DomainError, DomainResult, InvoiceId, ItemId, MovementId, PartyId, StoreId,
    UserId,
};
use tillworks_inventory::{MovementDetail, MovementKind, StockMovement};
use tillworks_invoicing::{Invoice, InvoiceStatus};

use super::{InvoiceRepo, SalePosting, StockLedger};

#[derive(Debug, Clone)]
pub struct PostgresStockLedger {
    pool: Arc<PgPool>,
}

impl PostgresStockLedger {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Applies the ledger schema. Idempotent.
    pub async fn migrate(&self) -> DomainResult<()> {
        sqlx::raw_sql(include_str!("../../migrations/0001_ledger.sql"))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }
}

/// Map sqlx errors onto the domain taxonomy. 23505 (unique violation) is the
/// one code callers branch on; everything else is an internal fault.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> DomainError {
    match err {
        sqlx::Error::Database(db_err) => {
            let message = format!("database error in {operation}: {}", db_err.message());
            if db_err.code().as_deref() == Some("23505") {
                DomainError::duplicate_key(message)
            } else {
                DomainError::internal(message)
            }
        }
        other => DomainError::internal(format!("sqlx error in {operation}: {other}")),
    }
}

fn status_str(status: InvoiceStatus) -> &'static str {
    match status {
        InvoiceStatus::Draft => "DRAFT",
        InvoiceStatus::Issued => "ISSUED",
        InvoiceStatus::Cancelled => "CANCELLED",
    }
}

async fn insert_movement<'c, E>(executor: E, movement: &StockMovement) -> DomainResult<()>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let (supplier, unit_cost, invoice, buyer, buyer_name, unit_price, reason_code) =
        match &movement.detail {
            MovementDetail::Purchase { supplier, unit_cost } => (
                supplier.map(Uuid::from),
                Some(*unit_cost),
                None,
                None,
                "",
                None,
                "",
            ),
            MovementDetail::Sold {
                invoice,
                buyer,
                buyer_name,
                unit_price,
            } => (
                None,
                None,
                Some(Uuid::from(*invoice)),
                buyer.map(Uuid::from),
                buyer_name.as_str(),
                Some(*unit_price),
                "",
            ),
            MovementDetail::Wastage { reason_code } => {
                (None, None, None, None, "", None, reason_code.as_str())
            }
        };

    sqlx::query(
        r#"
        INSERT INTO stock_movements (
            id, store_id, item_id, kind, quantity,
            supplier_id, unit_cost,
            invoice_id, buyer_id, buyer_name, unit_price,
            reason_code, notes, occurred_at, is_active, created_by, created_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
        "#,
    )
    .bind(Uuid::from(movement.id))
    .bind(Uuid::from(movement.store))
    .bind(Uuid::from(movement.item))
    .bind(movement.kind().as_str())
    .bind(movement.quantity)
    .bind(supplier)
    .bind(unit_cost)
    .bind(invoice)
    .bind(buyer)
    .bind(buyer_name)
    .bind(unit_price)
    .bind(reason_code)
    .bind(&movement.notes)
    .bind(movement.occurred_at)
    .bind(movement.is_active)
    .bind(movement.created_by.map(Uuid::from))
    .bind(movement.created_at)
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("insert_movement", e))?;

    Ok(())
}

const SELECT_MOVEMENT: &str = r#"
    SELECT
        id, store_id, item_id, kind, quantity,
        supplier_id, unit_cost,
        invoice_id, buyer_id, buyer_name, unit_price,
        reason_code, notes, occurred_at, is_active, created_by, created_at
    FROM stock_movements
"#;

#[async_trait]
impl StockLedger for PostgresStockLedger {
    #[instrument(skip(self, movement), fields(movement_id = %movement.id, kind = %movement.kind()), err)]
    async fn append(&self, movement: StockMovement) -> DomainResult<StockMovement> {
        insert_movement(&*self.pool, &movement).await?;
        Ok(movement)
    }

    async fn get(&self, id: MovementId) -> DomainResult<Option<StockMovement>> {
        let row = sqlx::query(&format!("{SELECT_MOVEMENT} WHERE id = $1"))
            .bind(Uuid::from(id))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_movement", e))?;

        row.map(|r| {
            MovementRow::from_row(&r)
                .map_err(|e| DomainError::internal(format!("malformed movement row: {e}")))
                .and_then(StockMovement::try_from)
        })
        .transpose()
    }

    #[instrument(skip(self), fields(movement_id = %id), err)]
    async fn deactivate(&self, id: MovementId) -> DomainResult<()> {
        let result = sqlx::query("UPDATE stock_movements SET is_active = FALSE WHERE id = $1")
            .bind(Uuid::from(id))
            .execute(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("deactivate_movement", e))?;
        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(())
    }

    async fn list(&self, store: StoreId, kind: MovementKind) -> DomainResult<Vec<StockMovement>> {
        let rows = sqlx::query(&format!(
            "{SELECT_MOVEMENT} WHERE store_id = $1 AND kind = $2 AND is_active ORDER BY occurred_at DESC"
        ))
        .bind(Uuid::from(store))
        .bind(kind.as_str())
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("list_movements", e))?;

        rows.iter()
            .map(|r| {
                MovementRow::from_row(r)
                    .map_err(|e| DomainError::internal(format!("malformed movement row: {e}")))
                    .and_then(StockMovement::try_from)
            })
            .collect()
    }

    async fn movements(&self, store: StoreId) -> DomainResult<Vec<StockMovement>> {
        let rows = sqlx::query(&format!(
            "{SELECT_MOVEMENT} WHERE store_id = $1 AND is_active ORDER BY occurred_at ASC"
        ))
        .bind(Uuid::from(store))
        .fetch_all(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("store_movements", e))?;

        rows.iter()
            .map(|r| {
                MovementRow::from_row(r)
                    .map_err(|e| DomainError::internal(format!("malformed movement row: {e}")))
                    .and_then(StockMovement::try_from)
            })
            .collect()
    }

    #[instrument(
        skip(self, invoice, movements),
        fields(invoice_id = %invoice.id, line_count = movements.len()),
        err
    )]
    async fn post_invoice_sale(
        &self,
        invoice: Invoice,
        movements: Vec<StockMovement>,
    ) -> DomainResult<(Invoice, SalePosting)> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| map_sqlx_error("begin_posting", e))?;

        insert_invoice(&mut *tx, &invoice).await?;

        let mut posting = SalePosting::default();
        for movement in &movements {
            // Savepoint per row: a duplicate-key rejection rolls back only
            // this insert, keeping the invoice and sibling rows committable.
            let mut sp = tx
                .begin()
                .await
                .map_err(|e| map_sqlx_error("begin_savepoint", e))?;
            match insert_movement(&mut *sp, movement).await {
                Ok(()) => {
                    sp.commit()
                        .await
                        .map_err(|e| map_sqlx_error("commit_savepoint", e))?;
                    posting.posted += 1;
                }
                Err(DomainError::Conflict {
                    kind: ConflictKind::DuplicateKey,
                    ..
                }) => {
                    sp.rollback()
                        .await
                        .map_err(|e| map_sqlx_error("rollback_savepoint", e))?;
                    posting.duplicates += 1;
                }
                Err(other) => return Err(other),
            }
        }

        tx.commit()
            .await
            .map_err(|e| map_sqlx_error("commit_posting", e))?;
        Ok((invoice, posting))
    }
}

async fn insert_invoice<'c, E>(executor: E, invoice: &Invoice) -> DomainResult<()>
where
    E: sqlx::Executor<'c, Database = Postgres>,
{
    let payload = serde_json::to_value(invoice)
        .map_err(|e| DomainError::internal(format!("invoice serialization failed: {e}")))?;

    sqlx::query(
        r#"
        INSERT INTO invoices (id, number, store_id, status, payload, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(Uuid::from(invoice.id))
    .bind(&invoice.number)
    .bind(Uuid::from(invoice.store))
    .bind(status_str(invoice.status))
    .bind(payload)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .execute(executor)
    .await
    .map_err(|e| map_sqlx_error("insert_invoice", e))?;

    Ok(())
}

#[async_trait]
impl InvoiceRepo for PostgresStockLedger {
    async fn insert(&self, invoice: Invoice) -> DomainResult<Invoice> {
        insert_invoice(&*self.pool, &invoice).await?;
        Ok(invoice)
    }

    async fn update(&self, invoice: Invoice) -> DomainResult<Invoice> {
        let payload = serde_json::to_value(&invoice)
            .map_err(|e| DomainError::internal(format!("invoice serialization failed: {e}")))?;

        let result = sqlx::query(
            "UPDATE invoices SET status = $2, payload = $3, updated_at = $4 WHERE id = $1",
        )
        .bind(Uuid::from(invoice.id))
        .bind(status_str(invoice.status))
        .bind(payload)
        .bind(invoice.updated_at)
        .execute(&*self.pool)
        .await
        .map_err(|e| map_sqlx_error("update_invoice", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::NotFound);
        }
        Ok(invoice)
    }

    async fn get(&self, id: InvoiceId) -> DomainResult<Option<Invoice>> {
        let row = sqlx::query("SELECT payload FROM invoices WHERE id = $1")
            .bind(Uuid::from(id))
            .fetch_optional(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("get_invoice", e))?;

        row.map(decode_invoice).transpose()
    }

    async fn list(&self) -> DomainResult<Vec<Invoice>> {
        let rows = sqlx::query("SELECT payload FROM invoices ORDER BY created_at DESC")
            .fetch_all(&*self.pool)
            .await
            .map_err(|e| map_sqlx_error("list_invoices", e))?;

        rows.into_iter().map(decode_invoice).collect()
    }
}

fn decode_invoice(row: sqlx::postgres::PgRow) -> DomainResult<Invoice> {
    let payload: serde_json::Value = row
        .try_get("payload")
        .map_err(|e| DomainError::internal(format!("failed to read invoice payload: {e}")))?;
    serde_json::from_value(payload)
        .map_err(|e| DomainError::internal(format!("malformed invoice payload: {e}")))
}

#[derive(Debug)]
struct MovementRow {
    id: Uuid,
    store_id: Uuid,
    item_id: Uuid,
    kind: String,
    quantity: i64,
    supplier_id: Option<Uuid>,
    unit_cost: Option<Decimal>,
    invoice_id: Option<Uuid>,
    buyer_id: Option<Uuid>,
    buyer_name: String,
    unit_price: Option<Decimal>,
    reason_code: String,
    notes: String,
    occurred_at: DateTime<Utc>,
    is_active: bool,
    created_by: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, sqlx::postgres::PgRow> for MovementRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(MovementRow {
            id: row.try_get("id")?,
            store_id: row.try_get("store_id")?,
            item_id: row.try_get("item_id")?,
            kind: row.try_get("kind")?,
            quantity: row.try_get("quantity")?,
            supplier_id: row.try_get("supplier_id")?,
            unit_cost: row.try_get("unit_cost")?,
            invoice_id: row.try_get("invoice_id")?,
            buyer_id: row.try_get("buyer_id")?,
            buyer_name: row.try_get("buyer_name")?,
            unit_price: row.try_get("unit_price")?,
            reason_code: row.try_get("reason_code")?,
            notes: row.try_get("notes")?,
            occurred_at: row.try_get("occurred_at")?,
            is_active: row.try_get("is_active")?,
            created_by: row.try_get("created_by")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = DomainError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let detail = match row.kind.as_str() {
            "PURCHASE" => MovementDetail::Purchase {
                supplier: row.supplier_id.map(PartyId::from_uuid),
                unit_cost: row.unit_cost.unwrap_or_default(),
            },
            "SOLD" => MovementDetail::Sold {
                invoice: row
                    .invoice_id
                    .map(InvoiceId::from_uuid)
                    .ok_or_else(|| DomainError::internal("SOLD row without invoice_id"))?,
                buyer: row.buyer_id.map(PartyId::from_uuid),
                buyer_name: row.buyer_name,
                unit_price: row.unit_price.unwrap_or_default(),
            },
            "WASTAGE" => MovementDetail::Wastage {
                reason_code: row.reason_code,
            },
            other => {
                return Err(DomainError::internal(format!(
                    "unknown movement kind '{other}'"
                )));
            }
        };

        Ok(StockMovement {
            id: MovementId::from_uuid(row.id),
            store: StoreId::from_uuid(row.store_id),
            item: ItemId::from_uuid(row.item_id),
            quantity: row.quantity,
            detail,
            notes: row.notes,
            occurred_at: row.occurred_at,
            is_active: row.is_active,
            created_by: row.created_by.map(UserId::from_uuid),
            created_at: row.created_at,
        })
    }
}
