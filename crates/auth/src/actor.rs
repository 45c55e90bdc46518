//! The resolved actor: identity flags plus a sanitized permission matrix.

use serde::{Deserialize, Serialize};

use tillworks_core::{DomainError, DomainResult, RoleId, StoreId, UserId};

use crate::level::Level;
use crate::matrix::PermissionMatrix;
use crate::schema::{Action, Category};
use crate::user::User;

/// An authenticated principal, ready for authorization decisions.
///
/// Built once per request from the stored user and its role's sanitized
/// matrix. Master admins bypass the matrix here, at the decision point, so
/// the matrix itself stays a pure lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    pub user_id: UserId,
    pub name: String,
    pub role: Option<RoleId>,
    pub store: Option<StoreId>,
    pub is_master_admin: bool,
    pub is_parent_admin: bool,
    pub accessible_stores: Vec<StoreId>,
    pub permissions: PermissionMatrix,
}

impl Actor {
    /// Resolve a user into an actor. Inactive users never become actors.
    pub fn for_user(user: &User, permissions: PermissionMatrix) -> DomainResult<Self> {
        if !user.is_active() {
            return Err(DomainError::Unauthorized);
        }
        Ok(Self {
            user_id: user.id,
            name: user.name.clone(),
            role: user.role,
            store: user.store,
            is_master_admin: user.is_master_admin,
            is_parent_admin: user.is_parent_admin,
            accessible_stores: user.accessible_stores.clone(),
            permissions,
        })
    }

    pub fn has_capability(&self, category: Category, action: Action, required: Level) -> bool {
        self.is_master_admin || self.permissions.grants(category, action, required)
    }

    /// Guard form of [`has_capability`](Self::has_capability).
    pub fn require_capability(
        &self,
        category: Category,
        action: Action,
        required: Level,
    ) -> DomainResult<()> {
        if self.has_capability(category, action, required) {
            Ok(())
        } else {
            tracing::warn!(
                user = %self.user_id,
                category = %category,
                action = %action,
                required = %required,
                "capability check failed"
            );
            Err(DomainError::forbidden("Insufficient permissions"))
        }
    }

    pub fn require_master_admin(&self) -> DomainResult<()> {
        if self.is_master_admin {
            Ok(())
        } else {
            Err(DomainError::forbidden("Master admin required"))
        }
    }
}
