use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use tillworks_core::{
    DomainError, DomainResult, EntryId, InvoiceId, ItemId, StoreId, UserId,
};
use tillworks_inventory::SaleLine;

use crate::totals::{self, InvoiceTotals};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum InvoiceStatus {
    Draft,
    Issued,
    Cancelled,
}

/// One persisted invoice line. `line_total` is computed at creation and
/// stored, never recomputed on read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvoiceLine {
    pub item: Option<ItemId>,
    pub description: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub tax_rate: Decimal,
    pub discount: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewInvoiceLine {
    #[serde(default)]
    pub item: Option<ItemId>,
    #[serde(default)]
    pub description: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
    #[serde(default)]
    pub unit_price: Decimal,
    #[serde(default)]
    pub tax_rate: Decimal,
    #[serde(default)]
    pub discount: Decimal,
}

fn default_quantity() -> i64 {
    1
}

/// Creation payload. Catalog references are ids only; the service resolves
/// them, validates kind and store ownership, and supplies denormalized
/// names to `Invoice::create`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewInvoice {
    #[serde(default)]
    pub store: Option<StoreId>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub customer_email: String,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub order_type: Option<EntryId>,
    #[serde(default)]
    pub payment_type: Option<EntryId>,
    #[serde(default)]
    pub discount: Option<EntryId>,
    #[serde(default)]
    pub discount_value: Option<Decimal>,
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub lines: Vec<NewInvoiceLine>,
}

/// Denormalized catalog names resolved by the service for one invoice.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CatalogNames {
    pub order_type: String,
    pub payment_type: String,
    pub discount: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: InvoiceId,
    pub number: String,
    pub store: StoreId,
    pub status: InvoiceStatus,
    pub customer_name: String,
    pub customer_email: String,
    pub currency: String,
    pub order_type: Option<EntryId>,
    pub order_type_name: String,
    pub payment_type: Option<EntryId>,
    pub payment_type_name: String,
    pub discount: Option<EntryId>,
    pub discount_name: String,
    pub discount_value: Decimal,
    pub totals: InvoiceTotals,
    pub lines: Vec<InvoiceLine>,
    pub issued_by: Option<UserId>,
    pub issued_at: DateTime<Utc>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Human-readable invoice number, unique per store in practice and backed
/// by a (store, number) unique constraint in the repository.
pub fn invoice_number() -> String {
    let hex = Uuid::new_v4().simple().to_string();
    format!("INV-{}", hex[..8].to_uppercase())
}

impl Invoice {
    /// Builds the invoice record with totals computed from its lines.
    ///
    /// `discount_value` is the invoice-level percentage; when the payload
    /// does not carry one explicitly, the service passes the referenced
    /// discount entry's value.
    pub fn create(
        input: NewInvoice,
        store: StoreId,
        status: InvoiceStatus,
        names: CatalogNames,
        discount_value: Decimal,
        issued_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        for line in &input.lines {
            if line.quantity < 0 {
                return Err(DomainError::validation("line quantity must not be negative"));
            }
        }
        let totals = totals::calculate_totals(&input.lines, discount_value);
        let lines = input
            .lines
            .iter()
            .map(|line| InvoiceLine {
                item: line.item,
                description: line.description.clone(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                tax_rate: line.tax_rate,
                discount: line.discount,
                line_total: totals::line_total(line),
            })
            .collect();

        Ok(Self {
            id: InvoiceId::new(),
            number: invoice_number(),
            store,
            status,
            customer_name: input.customer_name,
            customer_email: input.customer_email,
            currency: input.currency.unwrap_or_else(|| "INR".to_string()),
            order_type: input.order_type,
            order_type_name: names.order_type,
            payment_type: input.payment_type,
            payment_type_name: names.payment_type,
            discount: input.discount,
            discount_name: names.discount,
            discount_value,
            totals,
            lines,
            issued_by,
            issued_at: now,
            notes: input.notes,
            created_at: now,
            updated_at: now,
        })
    }

    /// Lines that should reach the stock ledger: item-bearing, quantity > 0.
    pub fn sale_lines(&self) -> Vec<SaleLine> {
        self.lines
            .iter()
            .filter_map(|line| {
                let item = line.item?;
                (line.quantity > 0).then_some(SaleLine {
                    item,
                    quantity: line.quantity,
                    unit_price: line.unit_price,
                })
            })
            .collect()
    }

    /// Cancelled is terminal; everything else may move there.
    pub fn cancel(&mut self, now: DateTime<Utc>) -> DomainResult<()> {
        if self.status == InvoiceStatus::Cancelled {
            return Err(DomainError::validation("invoice is already cancelled"));
        }
        self.status = InvoiceStatus::Cancelled;
        self.updated_at = now;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_invoice(lines: Vec<NewInvoiceLine>) -> NewInvoice {
        NewInvoice {
            store: None,
            customer_name: "Walk-in".into(),
            customer_email: String::new(),
            currency: None,
            order_type: None,
            payment_type: None,
            discount: None,
            discount_value: None,
            notes: String::new(),
            lines,
        }
    }

    fn simple_line(item: Option<ItemId>, qty: i64, price: i64) -> NewInvoiceLine {
        NewInvoiceLine {
            item,
            description: String::new(),
            quantity: qty,
            unit_price: Decimal::from(price),
            tax_rate: Decimal::ZERO,
            discount: Decimal::ZERO,
        }
    }

    #[test]
    fn invoice_number_has_expected_shape() {
        let number = invoice_number();
        assert!(number.starts_with("INV-"));
        assert_eq!(number.len(), 12);
        assert!(number[4..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn create_computes_totals_and_defaults_currency() {
        let item = ItemId::new();
        let invoice = Invoice::create(
            new_invoice(vec![simple_line(Some(item), 2, 100)]),
            StoreId::new(),
            InvoiceStatus::Issued,
            CatalogNames::default(),
            Decimal::ZERO,
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(invoice.currency, "INR");
        assert_eq!(invoice.totals.total, Decimal::from(200));
        assert_eq!(invoice.lines[0].line_total, Decimal::from(200));
    }

    #[test]
    fn sale_lines_skip_itemless_and_zero_quantity_lines() {
        let item = ItemId::new();
        let invoice = Invoice::create(
            new_invoice(vec![
                simple_line(Some(item), 2, 100),
                simple_line(None, 3, 50),
                simple_line(Some(ItemId::new()), 0, 10),
            ]),
            StoreId::new(),
            InvoiceStatus::Issued,
            CatalogNames::default(),
            Decimal::ZERO,
            None,
            Utc::now(),
        )
        .unwrap();
        let sale = invoice.sale_lines();
        assert_eq!(sale.len(), 1);
        assert_eq!(sale[0].item, item);
        assert_eq!(sale[0].quantity, 2);
    }

    #[test]
    fn cancel_is_terminal() {
        let mut invoice = Invoice::create(
            new_invoice(vec![]),
            StoreId::new(),
            InvoiceStatus::Draft,
            CatalogNames::default(),
            Decimal::ZERO,
            None,
            Utc::now(),
        )
        .unwrap();
        invoice.cancel(Utc::now()).unwrap();
        assert_eq!(invoice.status, InvoiceStatus::Cancelled);
        assert!(matches!(
            invoice.cancel(Utc::now()),
            Err(DomainError::Validation(_))
        ));
    }

    #[test]
    fn rejects_negative_line_quantity() {
        let err = Invoice::create(
            new_invoice(vec![simple_line(None, -2, 100)]),
            StoreId::new(),
            InvoiceStatus::Draft,
            CatalogNames::default(),
            Decimal::ZERO,
            None,
            Utc::now(),
        );
        assert!(matches!(err, Err(DomainError::Validation(_))));
    }
}
