//! Invoice creation, the SOLD posting path and cancellation.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::instrument;

use tillworks_auth::{AccessScope, Actor};
use tillworks_catalog::{CatalogEntry, EntryKind};
use tillworks_core::{DomainError, DomainResult, EntryId, InvoiceId, ItemId, StoreId};
use tillworks_inventory::StockMovement;
use tillworks_invoicing::{CatalogNames, Invoice, InvoiceStatus, NewInvoice};

use crate::repo::{CatalogRepo, InvoiceRepo, ItemRepo, SalePosting, StockLedger};
use crate::services::{AuditService, ScopeService};

pub struct InvoiceService {
    invoices: Arc<dyn InvoiceRepo>,
    ledger: Arc<dyn StockLedger>,
    items: Arc<dyn ItemRepo>,
    entries: Arc<dyn CatalogRepo>,
    scope: ScopeService,
    audit: AuditService,
}

impl InvoiceService {
    pub fn new(
        invoices: Arc<dyn InvoiceRepo>,
        ledger: Arc<dyn StockLedger>,
        items: Arc<dyn ItemRepo>,
        entries: Arc<dyn CatalogRepo>,
        scope: ScopeService,
        audit: AuditService,
    ) -> Self {
        Self {
            invoices,
            ledger,
            items,
            entries,
            scope,
            audit,
        }
    }

    /// Creates an invoice as `Draft` or `Issued`.
    ///
    /// Issuing builds one SOLD movement per item-bearing line with
    /// quantity > 0 and hands invoice and movements to the ledger in a single
    /// posting, so the invoice row and its stock effects land together.
    /// Drafts only persist the invoice. Re-posted lines come back as
    /// duplicates in the returned `SalePosting`, never as an error.
    #[instrument(skip(self, actor, scope, input), fields(actor = %actor.user_id, status = ?status), err)]
    pub async fn create(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        status: InvoiceStatus,
        input: NewInvoice,
    ) -> DomainResult<(Invoice, SalePosting)> {
        if status == InvoiceStatus::Cancelled {
            return Err(DomainError::validation("invoice cannot be created cancelled"));
        }
        let store = self.scope.resolve_store(actor, scope, input.store).await?;

        let order_type = match input.order_type {
            Some(id) => Some(self.entry_of(store.id, EntryKind::OrderTypes, id).await?),
            None => None,
        };
        let payment_type = match input.payment_type {
            Some(id) => Some(self.entry_of(store.id, EntryKind::PaymentTypes, id).await?),
            None => None,
        };
        let discount = match input.discount {
            Some(id) => Some(self.entry_of(store.id, EntryKind::Discounts, id).await?),
            None => None,
        };
        for line in &input.lines {
            if let Some(item) = line.item {
                self.check_item(store.id, item).await?;
            }
        }

        // An explicit percentage wins; otherwise the referenced discount
        // entry supplies it.
        let discount_value = input
            .discount_value
            .or_else(|| discount.as_ref().map(|entry| entry.value))
            .unwrap_or(Decimal::ZERO);
        let names = CatalogNames {
            order_type: order_type.map(|entry| entry.name).unwrap_or_default(),
            payment_type: payment_type.map(|entry| entry.name).unwrap_or_default(),
            discount: discount.map(|entry| entry.name).unwrap_or_default(),
        };

        let now = Utc::now();
        let issued_by = (status == InvoiceStatus::Issued).then_some(actor.user_id);
        let invoice = Invoice::create(input, store.id, status, names, discount_value, issued_by, now)?;

        let (invoice, posting) = match status {
            InvoiceStatus::Issued => {
                let mut movements = Vec::new();
                for line in invoice.sale_lines() {
                    movements.push(StockMovement::sale(
                        line,
                        invoice.store,
                        invoice.id,
                        None,
                        invoice.customer_name.clone(),
                        invoice.issued_at,
                        Some(actor.user_id),
                        now,
                    )?);
                }
                self.ledger.post_invoice_sale(invoice, movements).await?
            }
            _ => (self.invoices.insert(invoice).await?, SalePosting::default()),
        };

        let action = match status {
            InvoiceStatus::Issued => "invoice.issue",
            _ => "invoice.create",
        };
        self.audit
            .record(
                Some(actor.user_id),
                action,
                "invoice",
                invoice.id,
                serde_json::json!({
                    "number": invoice.number,
                    "total": invoice.totals.total,
                    "posted": posting.posted,
                    "duplicates": posting.duplicates,
                }),
            )
            .await;
        Ok((invoice, posting))
    }

    /// Cancellation never compensates the ledger; SOLD rows stay active and
    /// are removed through the movement screens if the stock really came
    /// back.
    #[instrument(skip(self, actor, scope), fields(actor = %actor.user_id, invoice = %id), err)]
    pub async fn cancel(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        id: InvoiceId,
    ) -> DomainResult<Invoice> {
        let mut invoice = self.visible_invoice(scope, id).await?;
        invoice.cancel(Utc::now())?;
        let invoice = self.invoices.update(invoice).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "invoice.cancel",
                "invoice",
                invoice.id,
                serde_json::json!({ "number": invoice.number }),
            )
            .await;
        Ok(invoice)
    }

    pub async fn get(&self, scope: &AccessScope, id: InvoiceId) -> DomainResult<Invoice> {
        self.visible_invoice(scope, id).await
    }

    /// Invoices the scope can see, newest first. Naming a store narrows the
    /// listing to it after the usual scope check.
    pub async fn list(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        store: Option<StoreId>,
    ) -> DomainResult<Vec<Invoice>> {
        let invoices = self.invoices.list().await?;
        match store {
            Some(_) => {
                let store = self.scope.resolve_store(actor, scope, store).await?;
                Ok(invoices
                    .into_iter()
                    .filter(|invoice| invoice.store == store.id)
                    .collect())
            }
            None => Ok(invoices
                .into_iter()
                .filter(|invoice| scope.allows(invoice.store))
                .collect()),
        }
    }

    async fn visible_invoice(&self, scope: &AccessScope, id: InvoiceId) -> DomainResult<Invoice> {
        let invoice = self.invoices.get(id).await?.ok_or(DomainError::NotFound)?;
        if !scope.allows(invoice.store) {
            return Err(DomainError::NotFound);
        }
        Ok(invoice)
    }

    async fn entry_of(
        &self,
        store: StoreId,
        kind: EntryKind,
        id: EntryId,
    ) -> DomainResult<CatalogEntry> {
        let entry = self
            .entries
            .get(id)
            .await?
            .filter(|entry| entry.kind == kind)
            .ok_or_else(|| DomainError::validation(format!("Invalid {kind} entry")))?;
        if entry.store != store {
            return Err(DomainError::validation(format!(
                "{kind} entry does not belong to store"
            )));
        }
        Ok(entry)
    }

    async fn check_item(&self, store: StoreId, id: ItemId) -> DomainResult<()> {
        let item = self
            .items
            .get(id)
            .await?
            .ok_or_else(|| DomainError::validation("Invalid item"))?;
        if item.store != store {
            return Err(DomainError::validation("Item does not belong to store"));
        }
        Ok(())
    }
}
