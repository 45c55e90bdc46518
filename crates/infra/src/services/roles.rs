//! Role lifecycle: seeding, delegation-checked creation, versioned updates.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use tillworks_auth::{
    AccessScope, Actor, MASTER_ROLE_NAME, NewRole, PermissionMatrix, PermissionSchema, Role,
    RolePatch, RoleScope, assert_not_above,
};
use tillworks_core::{DomainError, DomainResult, RoleId};

use crate::repo::RoleRepo;
use crate::services::{AuditService, ScopeService};

pub struct RoleService {
    roles: Arc<dyn RoleRepo>,
    scope: ScopeService,
    schema: PermissionSchema,
    audit: AuditService,
}

impl RoleService {
    pub fn new(
        roles: Arc<dyn RoleRepo>,
        scope: ScopeService,
        schema: PermissionSchema,
        audit: AuditService,
    ) -> Self {
        Self {
            roles,
            scope,
            schema,
            audit,
        }
    }

    /// Idempotently seed the system master role at startup.
    pub async fn seed_master(&self) -> DomainResult<Role> {
        if let Some(master) = self
            .roles
            .find_by_key(MASTER_ROLE_NAME, RoleScope::Global, None)
            .await?
        {
            return Ok(master);
        }
        let master = self.roles.insert(Role::master(Utc::now())).await?;
        tracing::info!(role = %master.id, "seeded master role");
        Ok(master)
    }

    #[instrument(skip(self, actor, scope, input), fields(actor = %actor.user_id), err)]
    pub async fn create(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        input: NewRole,
    ) -> DomainResult<Role> {
        if Role::uses_reserved_name(&input.name) {
            return Err(DomainError::forbidden("role name is reserved"));
        }
        let permissions = PermissionMatrix::sanitize(&input.permissions, &self.schema);
        if !actor.is_master_admin {
            assert_not_above(&permissions, &actor.permissions)?;
        }
        let store = match input.scope {
            RoleScope::Global => {
                actor.require_master_admin()?;
                None
            }
            RoleScope::Store => Some(self.scope.resolve_store(actor, scope, input.store).await?.id),
        };
        let role = Role::create(
            input.name,
            input.description,
            input.scope,
            store,
            permissions,
            Utc::now(),
        )?;
        let role = self.roles.insert(role).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "role.create",
                "role",
                role.id,
                serde_json::json!({ "name": role.name, "scope": role.scope }),
            )
            .await;
        Ok(role)
    }

    #[instrument(skip(self, actor, scope, patch), fields(actor = %actor.user_id, role = %id), err)]
    pub async fn update(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        id: RoleId,
        patch: RolePatch,
    ) -> DomainResult<Role> {
        let mut role = self.visible_role(actor, scope, id).await?;
        if role.is_system {
            return Err(DomainError::forbidden("system roles cannot be modified"));
        }
        let expected_version = patch.version;
        if let Some(name) = patch.name {
            if Role::uses_reserved_name(&name) {
                return Err(DomainError::forbidden("role name is reserved"));
            }
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("role name must not be empty"));
            }
            role.name = name;
        }
        if let Some(description) = patch.description {
            role.description = Some(description).filter(|d| !d.trim().is_empty());
        }
        if let Some(raw) = patch.permissions {
            let permissions = PermissionMatrix::sanitize(&raw, &self.schema);
            if !actor.is_master_admin {
                assert_not_above(&permissions, &actor.permissions)?;
            }
            role.permissions = permissions;
        }
        if let Some(is_active) = patch.is_active {
            role.is_active = is_active;
        }
        role.updated_at = Utc::now();
        let role = self.roles.update(role, expected_version).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "role.update",
                "role",
                role.id,
                serde_json::json!({ "name": role.name, "version": role.version }),
            )
            .await;
        Ok(role)
    }

    /// Soft delete, still guarded by the version token.
    #[instrument(skip(self, actor, scope), fields(actor = %actor.user_id, role = %id), err)]
    pub async fn deactivate(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        id: RoleId,
        version: u64,
    ) -> DomainResult<Role> {
        let mut role = self.visible_role(actor, scope, id).await?;
        if role.is_system {
            return Err(DomainError::forbidden("system roles cannot be modified"));
        }
        role.is_active = false;
        role.updated_at = Utc::now();
        let role = self.roles.update(role, version).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "role.delete",
                "role",
                role.id,
                serde_json::json!({ "name": role.name }),
            )
            .await;
        Ok(role)
    }

    pub async fn get(&self, actor: &Actor, scope: &AccessScope, id: RoleId) -> DomainResult<Role> {
        self.visible_role(actor, scope, id).await
    }

    /// Master admins see every role; everyone else sees store roles within
    /// their scope. The global master role never shows up for them.
    pub async fn list(&self, actor: &Actor, scope: &AccessScope) -> DomainResult<Vec<Role>> {
        let roles = self.roles.list().await?;
        if actor.is_master_admin {
            return Ok(roles);
        }
        Ok(roles
            .into_iter()
            .filter(|role| {
                role.scope == RoleScope::Store
                    && role.store.is_some_and(|store| scope.allows(store))
            })
            .collect())
    }

    async fn visible_role(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        id: RoleId,
    ) -> DomainResult<Role> {
        let role = self.roles.get(id).await?.ok_or(DomainError::NotFound)?;
        if actor.is_master_admin {
            return Ok(role);
        }
        let in_scope = role.scope == RoleScope::Store
            && role.store.is_some_and(|store| scope.allows(store));
        if !in_scope {
            return Err(DomainError::NotFound);
        }
        Ok(role)
    }
}
