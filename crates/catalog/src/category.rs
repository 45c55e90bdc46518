//! Item categories, unique by (store, name).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillworks_core::{CategoryId, DomainError, DomainResult, StoreId, UserId};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub code: String,
    pub store: StoreId,
    pub is_active: bool,
    pub created_by: Option<UserId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewCategory {
    pub name: String,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CategoryPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

impl Category {
    pub fn create(
        input: NewCategory,
        store: StoreId,
        created_by: Option<UserId>,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = input.name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("category name must not be empty"));
        }
        Ok(Self {
            id: CategoryId::new(),
            name,
            code: input.code.unwrap_or_default().trim().to_string(),
            store,
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
    fn trims_name_and_defaults_code() {
        let category = Category::create(
            NewCategory {
                name: " Beverages ".into(),
                code: None,
            },
            StoreId::new(),
            None,
            Utc::now(),
        )
        .unwrap();
        assert_eq!(category.name, "Beverages");
        assert_eq!(category.code, "");
        assert!(category.is_active);
    }

    #[test]
    fn rejects_blank_name() {
        let err = Category::create(
            NewCategory {
                name: "  ".into(),
                code: None,
            },
            StoreId::new(),
            None,
            Utc::now(),
        );
        assert!(matches!(err, Err(DomainError::Validation(_))));
    }
}
