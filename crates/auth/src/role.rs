//! Role records: a named, store- or globally-scoped permission bundle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tillworks_core::{DomainError, DomainResult, RoleId, StoreId};

use crate::matrix::PermissionMatrix;

/// Reserved name of the single system master role.
pub const MASTER_ROLE_NAME: &str = "Master Admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RoleScope {
    Global,
    Store,
}

/// A role as persisted and served to callers.
///
/// `is_system` marks the immutable master role; mutation guards branch on the
/// flag, never on the name. `version` is the optimistic-concurrency token
/// checked on every write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    pub id: RoleId,
    pub name: String,
    pub description: Option<String>,
    pub scope: RoleScope,
    pub store: Option<StoreId>,
    pub permissions: PermissionMatrix,
    pub is_system: bool,
    pub is_active: bool,
    pub version: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a role. `permissions` arrive raw and are sanitized by
/// the role service before they reach [`Role::create`].
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct NewRole {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub scope: RoleScope,
    #[serde(default)]
    pub store: Option<StoreId>,
    #[serde(default)]
    pub permissions: serde_json::Value,
}

/// Partial update for a role. `version` must match the stored record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RolePatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub permissions: Option<serde_json::Value>,
    #[serde(default)]
    pub is_active: Option<bool>,
    pub version: u64,
}

impl Role {
    /// Build a non-system role. The (scope, store) pairing is enforced here;
    /// scope/delegation checks belong to the role service.
    pub fn create(
        name: String,
        description: Option<String>,
        scope: RoleScope,
        store: Option<StoreId>,
        permissions: PermissionMatrix,
        now: DateTime<Utc>,
    ) -> DomainResult<Self> {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(DomainError::validation("role name must not be empty"));
        }
        match (scope, store) {
            (RoleScope::Store, None) => {
                return Err(DomainError::validation("store-scoped roles require a store"));
            }
            (RoleScope::Global, Some(_)) => {
                return Err(DomainError::validation("global roles cannot reference a store"));
            }
            _ => {}
        }
        Ok(Self {
            id: RoleId::new(),
            name,
            description,
            scope,
            store,
            permissions,
            is_system: false,
            is_active: true,
            version: 1,
            created_at: now,
            updated_at: now,
        })
    }

    /// The seeded system master role. Its authority comes from the user-level
    /// master flag; the matrix stays empty on purpose.
    pub fn master(now: DateTime<Utc>) -> Self {
        Self {
            id: RoleId::new(),
            name: MASTER_ROLE_NAME.to_string(),
            description: Some("System master role".to_string()),
            scope: RoleScope::Global,
            store: None,
            permissions: PermissionMatrix::new(),
            is_system: true,
            is_active: true,
            version: 1,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_master(&self) -> bool {
        self.is_system && self.scope == RoleScope::Global
    }

    /// True when `name` collides with the reserved master role name.
    pub fn uses_reserved_name(name: &str) -> bool {
        name.trim().eq_ignore_ascii_case(MASTER_ROLE_NAME)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_store_pairing_is_enforced() {
        let now = Utc::now();
        let err = Role::create(
            "Cashier".into(),
            None,
            RoleScope::Store,
            None,
            PermissionMatrix::new(),
            now,
        );
        assert!(matches!(err, Err(DomainError::Validation(_))));

        let err = Role::create(
            "Auditor".into(),
            None,
            RoleScope::Global,
            Some(StoreId::new()),
            PermissionMatrix::new(),
            now,
        );
        assert!(matches!(err, Err(DomainError::Validation(_))));
    }

    #[test]
    fn reserved_name_is_case_insensitive() {
        assert!(Role::uses_reserved_name("Master Admin"));
        assert!(Role::uses_reserved_name("  master admin "));
        assert!(!Role::uses_reserved_name("Store Admin"));
    }

    #[test]
    fn master_role_is_system_and_global() {
        let master = Role::master(Utc::now());
        assert!(master.is_master());
        assert!(master.permissions.is_empty());
        assert_eq!(master.version, 1);
    }
}
