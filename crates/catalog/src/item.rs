//! Catalog items.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillworks_core::{CategoryId, DomainError, DomainResult, EntryId, ItemId, StoreId};

/// A sellable item.
///
/// `category_name` and `tax_name`/`tax_rate` are denormalized from their
/// referenced records on write; category renames rewrite them in bulk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    pub store: StoreId,
    pub category: Option<CategoryId>,
    pub category_name: String,
    pub tax: Option<EntryId>,
    pub tax_name: String,
    pub tax_rate: Decimal,
    pub description: String,
    pub default_price: Decimal,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating an item. Category and tax references are resolved and
/// validated by the catalog service before the record is built.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewItem {
    pub name: String,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub tax: Option<EntryId>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_price: Option<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ItemPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub category: Option<Option<CategoryId>>,
    #[serde(default)]
    pub tax: Option<Option<EntryId>>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub default_price: Option<Decimal>,
}

impl Item {
    pub fn create(
        input: NewItem,
        store: StoreId,
        category_name: String,
        tax_name: String,
        tax_rate: Decimal,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("item name must not be empty"));
        }
        let default_price = input.default_price.unwrap_or_default();
        if default_price < Decimal::ZERO {
            return Err(DomainError::validation("item price must not be negative"));
        }
        Ok(Self {
            id: ItemId::new(),
            name,
            store,
            category: input.category,
            category_name,
            tax: input.tax,
            tax_name,
            tax_rate,
            description: input.description.unwrap_or_default(),
            default_price,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }
}
