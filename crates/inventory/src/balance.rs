//! Balance projection over the stock ledger.
//!
//! Quantities are summed twice per query: everything strictly before the
//! window start becomes the opening balance, everything inside the window
//! (inclusive on both ends) becomes the in-window activity. Closing is then
//! `opening + purchased - sold - wasted`. Closing may go negative when sales
//! or wastage outrun recorded purchases; the projector surfaces that as-is.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillworks_core::{ItemId, StoreId};

use crate::movement::{MovementKind, StockMovement};

/// Optional date window. `None` bounds are open-ended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct BalanceWindow {
    #[serde(default)]
    pub from: Option<DateTime<Utc>>,
    #[serde(default)]
    pub to: Option<DateTime<Utc>>,
}

impl BalanceWindow {
    fn is_before(&self, at: DateTime<Utc>) -> bool {
        match self.from {
            Some(from) => at < from,
            None => false,
        }
    }

    fn contains(&self, at: DateTime<Utc>) -> bool {
        if let Some(from) = self.from {
            if at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if at > to {
                return false;
            }
        }
        true
    }
}

/// Per-item quantity sums over one phase of the projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MovementSums {
    pub purchased: i64,
    pub sold: i64,
    pub wasted: i64,
}

impl MovementSums {
    fn absorb(&mut self, kind: MovementKind, quantity: i64) {
        match kind {
            MovementKind::Purchase => self.purchased += quantity,
            MovementKind::Sold => self.sold += quantity,
            MovementKind::Wastage => self.wasted += quantity,
        }
    }

    pub fn net(&self) -> i64 {
        self.purchased - self.sold - self.wasted
    }
}

/// One line of the balance report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceRow {
    pub item: ItemId,
    pub item_name: String,
    pub opening: i64,
    pub purchased: i64,
    pub sold: i64,
    pub wasted: i64,
    pub closing: i64,
}

/// Full report returned by the stock report endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    pub store: StoreId,
    pub store_name: String,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub rows: Vec<BalanceRow>,
}

/// Projects per-item balances from ledger events.
///
/// Soft-deleted rows never contribute. Items with no active movement in
/// either phase are omitted; items whose movements cancel out to zero still
/// appear. `item_names` supplies display names; a missing entry renders as
/// `"-"` so a deleted item does not break the report.
pub fn project_balances(
    movements: &[StockMovement],
    window: BalanceWindow,
    item_names: &BTreeMap<ItemId, String>,
) -> Vec<BalanceRow> {
    let mut opening: BTreeMap<ItemId, MovementSums> = BTreeMap::new();
    let mut in_range: BTreeMap<ItemId, MovementSums> = BTreeMap::new();

    for movement in movements {
        if !movement.is_active {
            continue;
        }
        if window.is_before(movement.occurred_at) {
            opening
                .entry(movement.item)
                .or_default()
                .absorb(movement.kind(), movement.quantity);
        } else if window.contains(movement.occurred_at) {
            in_range
                .entry(movement.item)
                .or_default()
                .absorb(movement.kind(), movement.quantity);
        }
    }

    let mut items: Vec<ItemId> = opening.keys().chain(in_range.keys()).copied().collect();
    items.sort_unstable();
    items.dedup();

    let mut rows: Vec<BalanceRow> = items
        .into_iter()
        .map(|item| {
            let open = opening.get(&item).map(MovementSums::net).unwrap_or(0);
            let range = in_range.get(&item).copied().unwrap_or_default();
            BalanceRow {
                item,
                item_name: item_names.get(&item).cloned().unwrap_or_else(|| "-".into()),
                opening: open,
                purchased: range.purchased,
                sold: range.sold,
                wasted: range.wasted,
                closing: open + range.net(),
            }
        })
        .collect();

    rows.sort_by(|a, b| {
        a.item_name
            .to_lowercase()
            .cmp(&b.item_name.to_lowercase())
            .then_with(|| a.item.cmp(&b.item))
    });
    rows
}

/// All-time net on hand per item: the projection with no bounds at all.
/// Item listings use this to attach an on-hand quantity.
pub fn current_stock(movements: &[StockMovement]) -> BTreeMap<ItemId, i64> {
    let mut sums: BTreeMap<ItemId, MovementSums> = BTreeMap::new();
    for movement in movements {
        if !movement.is_active {
            continue;
        }
        sums.entry(movement.item)
            .or_default()
            .absorb(movement.kind(), movement.quantity);
    }
    sums.into_iter().map(|(item, s)| (item, s.net())).collect()
}
