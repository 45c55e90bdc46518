use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillworks_core::{
    DomainError, DomainResult, InvoiceId, ItemId, MovementId, PartyId, StoreId, UserId,
};

/// Ledger event type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum MovementKind {
    Purchase,
    Sold,
    Wastage,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Purchase => "PURCHASE",
            MovementKind::Sold => "SOLD",
            MovementKind::Wastage => "WASTAGE",
        }
    }
}

impl core::fmt::Display for MovementKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind-specific metadata. Each variant carries only the fields that make
/// sense for its movement type, so a SOLD row cannot end up with a supplier
/// or a purchase with an invoice reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "UPPERCASE")]
pub enum MovementDetail {
    Purchase {
        supplier: Option<PartyId>,
        unit_cost: Decimal,
    },
    Sold {
        invoice: InvoiceId,
        buyer: Option<PartyId>,
        buyer_name: String,
        unit_price: Decimal,
    },
    Wastage {
        reason_code: String,
    },
}

impl MovementDetail {
    pub fn kind(&self) -> MovementKind {
        match self {
            MovementDetail::Purchase { .. } => MovementKind::Purchase,
            MovementDetail::Sold { .. } => MovementKind::Sold,
            MovementDetail::Wastage { .. } => MovementKind::Wastage,
        }
    }
}

/// One immutable stock ledger event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: MovementId,
    pub store: StoreId,
    pub item: ItemId,
    pub quantity: i64,
    pub detail: MovementDetail,
    pub notes: String,
    pub occurred_at: DateTime<Utc>,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
}

/// Identity of a SOLD posting. Among active rows at most one movement may
/// carry a given key; the ledger enforces this and reports violations as
/// duplicate-key conflicts, which batch posting treats as already-done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SoldKey {
    pub store: StoreId,
    pub invoice: InvoiceId,
    pub item: ItemId,
}

/// Input for a manual purchase entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewPurchase {
    pub item: ItemId,
    pub quantity: i64,
    #[serde(default)]
    pub supplier: Option<PartyId>,
    #[serde(default)]
    pub unit_cost: Option<Decimal>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Input for a manual wastage entry.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewWastage {
    pub item: ItemId,
    pub quantity: i64,
    #[serde(default)]
    pub reason_code: Option<String>,
    #[serde(default)]
    pub occurred_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// One invoice line destined for the ledger as a SOLD event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleLine {
    pub item: ItemId,
    pub quantity: i64,
    pub unit_price: Decimal,
}

fn check_quantity(quantity: i64) -> DomainResult<i64> {
    if quantity < 0 {
        return Err(DomainError::validation("quantity must not be negative"));
    }
    Ok(quantity)
}

impl StockMovement {
    pub fn purchase(
        input: NewPurchase,
        store: StoreId,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: MovementId::new(),
            store,
            item: input.item,
            quantity: check_quantity(input.quantity)?,
            detail: MovementDetail::Purchase {
                supplier: input.supplier,
                unit_cost: input.unit_cost.unwrap_or_default(),
            },
            notes: input.notes.unwrap_or_default(),
            occurred_at: input.occurred_at.unwrap_or(now),
            is_active: true,
            created_by,
            created_at: now,
        })
    }

    pub fn wastage(
        input: NewWastage,
        store: StoreId,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: MovementId::new(),
            store,
            item: input.item,
            quantity: check_quantity(input.quantity)?,
            detail: MovementDetail::Wastage {
                reason_code: input.reason_code.unwrap_or_default(),
            },
            notes: input.notes.unwrap_or_default(),
            occurred_at: input.occurred_at.unwrap_or(now),
            is_active: true,
            created_by,
            created_at: now,
        })
    }

    #[allow(clippy::too_many_arguments)]
    pub fn sale(
        line: SaleLine,
        store: StoreId,
        invoice: InvoiceId,
        buyer: Option<PartyId>,
        buyer_name: String,
        occurred_at: DateTime<Utc>,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        Ok(Self {
            id: MovementId::new(),
            store,
            item: line.item,
            quantity: check_quantity(line.quantity)?,
            detail: MovementDetail::Sold {
                invoice,
                buyer,
                buyer_name,
                unit_price: line.unit_price,
            },
            notes: String::new(),
            occurred_at,
            is_active: true,
            created_by,
            created_at: now,
        })
    }

    pub fn kind(&self) -> MovementKind {
        self.detail.kind()
    }

    /// The uniqueness key for a SOLD posting, `None` for other kinds.
    pub fn sold_key(&self) -> Option<SoldKey> {
        match &self.detail {
            MovementDetail::Sold { invoice, .. } => Some(SoldKey {
                store: self.store,
                invoice: *invoice,
                item: self.item,
            }),
            _ => None,
        }
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn purchase_defaults_cost_and_timestamp() {
        let now = Utc::now();
        let movement = StockMovement::purchase(
            NewPurchase {
                item: ItemId::new(),
                quantity: 12,
                supplier: None,
                unit_cost: None,
                occurred_at: None,
                notes: None,
            },
            StoreId::new(),
            None,
            now,
        )
        .unwrap();
        assert_eq!(movement.kind(), MovementKind::Purchase);
        assert_eq!(movement.occurred_at, now);
        assert_eq!(movement.sold_key(), None);
        assert!(matches!(
            movement.detail,
            MovementDetail::Purchase { unit_cost, .. } if unit_cost == Decimal::ZERO
        ));
    }

    #[test]
    fn rejects_negative_quantity() {
        let err = StockMovement::wastage(
            NewWastage {
                item: ItemId::new(),
                quantity: -1,
                reason_code: None,
                occurred_at: None,
                notes: None,
            },
            StoreId::new(),
            None,
            Utc::now(),
        );
        assert!(matches!(err, Err(DomainError::Validation(_))));
    }

    #[test]
    fn sold_key_identifies_invoice_line() {
        let store = StoreId::new();
        let invoice = InvoiceId::new();
        let item = ItemId::new();
        let movement = StockMovement::sale(
            SaleLine {
                item,
                quantity: 3,
                unit_price: Decimal::from(40),
            },
            store,
            invoice,
            None,
            "Walk-in".into(),
            Utc::now(),
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(
            movement.sold_key(),
            Some(SoldKey {
                store,
                invoice,
                item
            })
        );
    }
}
