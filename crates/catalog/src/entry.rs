//! Store catalog entries: taxes, discounts, order/payment types, configuration.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use tillworks_core::{DomainError, DomainResult, EntryId, StoreId, UserId};

/// The closed set of catalog entry kinds. Each kind is guarded by its own
/// permission action at the HTTP boundary and checked again when an invoice
/// references an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntryKind {
    Taxes,
    Discounts,
    OrderTypes,
    PaymentTypes,
    StoreConfiguration,
}

impl EntryKind {
    pub fn as_str(self) -> &'static str {
        match self {
            EntryKind::Taxes => "taxes",
            EntryKind::Discounts => "discounts",
            EntryKind::OrderTypes => "order-types",
            EntryKind::PaymentTypes => "payment-types",
            EntryKind::StoreConfiguration => "store-configuration",
        }
    }

    pub fn from_key(key: &str) -> Option<Self> {
        match key {
            "taxes" => Some(EntryKind::Taxes),
            "discounts" => Some(EntryKind::Discounts),
            "order-types" => Some(EntryKind::OrderTypes),
            "payment-types" => Some(EntryKind::PaymentTypes),
            "store-configuration" => Some(EntryKind::StoreConfiguration),
            _ => None,
        }
    }
}

impl core::fmt::Display for EntryKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One catalog entry, unique by (kind, store, name).
///
/// `value` carries the numeric payload (tax rate percent, discount amount);
/// `config` is free-form per-kind configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: EntryId,
    pub kind: EntryKind,
    pub name: String,
    pub code: String,
    pub store: StoreId,
    pub value: Decimal,
    pub config: serde_json::Value,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewEntry {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct EntryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub value: Option<Decimal>,
    #[serde(default)]
    pub config: Option<serde_json::Value>,
}

impl CatalogEntry {
    pub fn create(
        input: NewEntry,
        kind: EntryKind,
        store: StoreId,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("catalog entry name must not be empty"));
        }
        Ok(Self {
            id: EntryId::new(),
            kind,
            name,
            code: input.code.unwrap_or_default().trim().to_string(),
            store,
            value: input.value.unwrap_or_default(),
            config: input.config.unwrap_or_else(|| serde_json::json!({})),
            is_active: true,
            created_by,
            created_at: now,
            updated_at: now,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_keys_round_trip() {
        for kind in [
            EntryKind::Taxes,
            EntryKind::Discounts,
            EntryKind::OrderTypes,
            EntryKind::PaymentTypes,
            EntryKind::StoreConfiguration,
        ] {
            assert_eq!(EntryKind::from_key(kind.as_str()), Some(kind));
        }
        assert_eq!(EntryKind::from_key("coupons"), None);
    }

    #[test]
    fn create_defaults_value_and_config() {
        let entry = CatalogEntry::create(
            NewEntry {
                name: "GST 5%".into(),
                code: None,
                value: Some(Decimal::from(5)),
                config: None,
            },
            EntryKind::Taxes,
            StoreId::new(),
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(entry.value, Decimal::from(5));
        assert_eq!(entry.config, serde_json::json!({}));
        assert!(entry.is_active);
    }
}
