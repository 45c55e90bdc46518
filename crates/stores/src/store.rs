//! Store records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillworks_core::{DomainError, DomainResult, StoreId, UserId};

/// A store: the unit of tenancy.
///
/// `parent` links stores into a forest. Soft-deleted rows keep their place in
/// the hierarchy so historic ledger data stays attributable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Store {
    pub id: StoreId,
    pub name: String,
    pub code: String,
    pub parent: Option<StoreId>,
    pub store_type: String,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a store.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewStore {
    pub name: String,
    pub code: String,
    #[serde(default)]
    pub parent: Option<StoreId>,
    #[serde(default)]
    pub store_type: Option<String>,
}

/// Partial update for a store. Re-parenting goes through the cycle guard in
/// the store service.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct StorePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub parent: Option<Option<StoreId>>,
    #[serde(default)]
    pub store_type: Option<String>,
}

impl Store {
    pub fn create(
        input: NewStore,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("store name must not be empty"));
        }
        let code = input.code.trim().to_uppercase();
        if code.is_empty() {
            return Err(DomainError::validation("store code must not be empty"));
        }
        Ok(Self {
            id: StoreId::new(),
            name,
            code,
            parent: input.parent,
            store_type: input
                .store_type
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| "Individual".to_string()),
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
    fn normalizes_code_and_defaults_type() {
        let store = Store::create(
            NewStore {
                name: " Main Street ".into(),
                code: " main ".into(),
                parent: None,
                store_type: None,
            },
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(store.name, "Main Street");
        assert_eq!(store.code, "MAIN");
        assert_eq!(store.store_type, "Individual");
        assert!(store.is_active);
    }

    #[test]
    fn rejects_blank_fields() {
        let err = Store::create(
            NewStore {
                name: "".into(),
                code: "A1".into(),
                parent: None,
                store_type: None,
            },
            None,
            Utc::now(),
        );
        assert!(matches!(err, Err(DomainError::Validation(_))));
    }
}
