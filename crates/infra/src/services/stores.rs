//! Store lifecycle, including admin-role provisioning.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::instrument;

use tillworks_auth::{
    AccessScope, Action, Actor, Category, Level, PermissionMatrix, PermissionSchema, Role,
    RoleScope,
};
use tillworks_core::{DomainError, DomainResult, StoreId};
use tillworks_stores::{NewStore, Store, StorePatch};

use crate::repo::{RoleRepo, StoreRepo};
use crate::services::{AuditService, ScopeService};

/// Name of the admin role provisioned alongside every store.
pub const STORE_ADMIN_ROLE_NAME: &str = "Store Admin";

/// Default grant set for a store admin: the top declared level of every
/// action in the schema (read/write where the action writes, download for
/// report-style actions, read-only where issuance owns the writes). The
/// legacy SKU screen is the one exception and stays at show.
pub fn store_admin_matrix(schema: &PermissionSchema) -> PermissionMatrix {
    let mut matrix = PermissionMatrix::new();
    for (category, specs) in schema.categories() {
        for spec in specs {
            if let Some(level) = spec.levels.last() {
                matrix.set(category, spec.action, *level);
            }
        }
    }
    matrix.set(Category::Inventory, Action::Skus, Level::Show);
    matrix
}

pub struct StoreService {
    stores: Arc<dyn StoreRepo>,
    roles: Arc<dyn RoleRepo>,
    scope: ScopeService,
    schema: PermissionSchema,
    audit: AuditService,
}

impl StoreService {
    pub fn new(
        stores: Arc<dyn StoreRepo>,
        roles: Arc<dyn RoleRepo>,
        scope: ScopeService,
        schema: PermissionSchema,
        audit: AuditService,
    ) -> Self {
        Self {
            stores,
            roles,
            scope,
            schema,
            audit,
        }
    }

    #[instrument(skip(self, actor, scope, input), fields(actor = %actor.user_id), err)]
    pub async fn create(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        input: NewStore,
    ) -> DomainResult<Store> {
        if let Some(parent) = input.parent {
            if !scope.allows(parent) {
                return Err(DomainError::access_denied());
            }
            if self.stores.get(parent).await?.is_none() {
                return Err(DomainError::validation("Invalid parent store"));
            }
        }
        let now = Utc::now();
        let store = Store::create(input, Some(actor.user_id), now)?;
        let store = self.stores.insert(store).await?;
        self.ensure_store_admin(&store, now).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "store.create",
                "store",
                store.id,
                serde_json::json!({ "name": store.name, "code": store.code }),
            )
            .await;
        Ok(store)
    }

    #[instrument(skip(self, actor, scope, patch), fields(actor = %actor.user_id, store = %id), err)]
    pub async fn update(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        id: StoreId,
        patch: StorePatch,
    ) -> DomainResult<Store> {
        let mut store = self.visible_store(scope, id).await?;
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("store name must not be empty"));
            }
            store.name = name;
        }
        if let Some(code) = patch.code {
            let code = code.trim().to_uppercase();
            if code.is_empty() {
                return Err(DomainError::validation("store code must not be empty"));
            }
            store.code = code;
        }
        if let Some(parent) = patch.parent {
            if let Some(new_parent) = parent {
                if !scope.allows(new_parent) {
                    return Err(DomainError::access_denied());
                }
                if self.stores.get(new_parent).await?.is_none() {
                    return Err(DomainError::validation("Invalid parent store"));
                }
                let tree = self.scope.tree().await?;
                if tree.would_create_cycle(store.id, new_parent) {
                    return Err(DomainError::validation(
                        "store cannot be moved under itself or its descendants",
                    ));
                }
            }
            store.parent = parent;
        }
        if let Some(store_type) = patch.store_type {
            let store_type = store_type.trim().to_string();
            if !store_type.is_empty() {
                store.store_type = store_type;
            }
        }
        store.updated_at = Utc::now();
        let store = self.stores.update(store).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "store.update",
                "store",
                store.id,
                serde_json::json!({ "name": store.name }),
            )
            .await;
        Ok(store)
    }

    /// Soft delete. The row keeps its place in the hierarchy so scope
    /// resolution and historic ledger data stay intact.
    #[instrument(skip(self, actor, scope), fields(actor = %actor.user_id, store = %id), err)]
    pub async fn deactivate(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        id: StoreId,
    ) -> DomainResult<Store> {
        let mut store = self.visible_store(scope, id).await?;
        store.is_active = false;
        store.updated_at = Utc::now();
        let store = self.stores.update(store).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "store.delete",
                "store",
                store.id,
                serde_json::json!({ "name": store.name }),
            )
            .await;
        Ok(store)
    }

    pub async fn get(&self, scope: &AccessScope, id: StoreId) -> DomainResult<Store> {
        self.visible_store(scope, id).await
    }

    /// Active stores inside the caller's scope.
    pub async fn list(&self, scope: &AccessScope) -> DomainResult<Vec<Store>> {
        let stores = self.stores.list().await?;
        Ok(stores
            .into_iter()
            .filter(|store| store.is_active && scope.allows(store.id))
            .collect())
    }

    async fn visible_store(&self, scope: &AccessScope, id: StoreId) -> DomainResult<Store> {
        let store = self.stores.get(id).await?.ok_or(DomainError::NotFound)?;
        if !scope.allows(store.id) {
            return Err(DomainError::access_denied());
        }
        Ok(store)
    }

    /// Provision the store's admin role. A child store inherits the parent
    /// admin's grants where those exceed the defaults, and a role that
    /// already exists is upgraded in place instead of duplicated.
    async fn ensure_store_admin(&self, store: &Store, now: DateTime<Utc>) -> DomainResult<Role> {
        let mut matrix = store_admin_matrix(&self.schema);
        if let Some(parent) = store.parent {
            if let Some(parent_admin) = self
                .roles
                .find_by_key(STORE_ADMIN_ROLE_NAME, RoleScope::Store, Some(parent))
                .await?
            {
                matrix = matrix.merge_max(&parent_admin.permissions);
            }
        }
        if let Some(existing) = self
            .roles
            .find_by_key(STORE_ADMIN_ROLE_NAME, RoleScope::Store, Some(store.id))
            .await?
        {
            let version = existing.version;
            let mut upgraded = existing;
            upgraded.permissions = upgraded.permissions.merge_max(&matrix);
            upgraded.is_active = true;
            upgraded.updated_at = now;
            return self.roles.update(upgraded, version).await;
        }
        let role = Role::create(
            STORE_ADMIN_ROLE_NAME.to_string(),
            Some(format!("Administrator role for {}", store.name)),
            RoleScope::Store,
            Some(store.id),
            matrix,
            now,
        )?;
        let role = self.roles.insert(role).await?;
        tracing::info!(store = %store.id, role = %role.id, "store admin role provisioned");
        Ok(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::MemoryBackend;
    use tillworks_auth::{NewUser, User};

    fn master_actor() -> Actor {
        let user = User::create(
            NewUser {
                name: "Master".into(),
                email: "master@example.com".into(),
                password_hash: "hash".into(),
                role: None,
                store: None,
                is_master_admin: true,
                is_parent_admin: false,
                accessible_stores: vec![],
            },
            Utc::now(),
        )
        .unwrap();
        Actor::for_user(&user, PermissionMatrix::new()).unwrap()
    }

    fn service(backend: &Arc<MemoryBackend>) -> StoreService {
        StoreService::new(
            backend.clone(),
            backend.clone(),
            ScopeService::new(backend.clone()),
            PermissionSchema::retail(),
            AuditService::new(backend.clone()),
        )
    }

    fn new_store(name: &str, parent: Option<StoreId>) -> NewStore {
        NewStore {
            name: name.into(),
            code: name.to_uppercase(),
            parent,
            store_type: None,
        }
    }

    #[test]
    fn admin_matrix_grants_the_expected_defaults() {
        let matrix = store_admin_matrix(&PermissionSchema::retail());
        assert_eq!(
            matrix.level(Category::Items, Action::ItemMaster),
            Some(Level::ReadWrite)
        );
        assert_eq!(
            matrix.level(Category::Reports, Action::SalesReport),
            Some(Level::Download)
        );
        assert_eq!(
            matrix.level(Category::Inventory, Action::StockSold),
            Some(Level::ReadOnly)
        );
        assert_eq!(
            matrix.level(Category::Inventory, Action::Skus),
            Some(Level::Show)
        );
    }

    #[tokio::test]
    async fn create_provisions_a_store_admin_role() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let actor = master_actor();
        let scope = AccessScope::unrestricted();

        let store = service
            .create(&actor, &scope, new_store("main", None))
            .await
            .unwrap();

        let admin = RoleRepo::find_by_key(
            backend.as_ref(),
            STORE_ADMIN_ROLE_NAME,
            RoleScope::Store,
            Some(store.id),
        )
        .await
        .unwrap()
        .expect("admin role");
        assert!(!admin.is_system);
        assert_eq!(
            admin.permissions.level(Category::Users, Action::Role),
            Some(Level::ReadWrite)
        );
    }

    #[tokio::test]
    async fn child_store_admin_inherits_parent_grants() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let actor = master_actor();
        let scope = AccessScope::unrestricted();

        let parent = service
            .create(&actor, &scope, new_store("parent", None))
            .await
            .unwrap();

        // Extend the parent admin beyond the defaults, then provision a child.
        let parent_admin = RoleRepo::find_by_key(
            backend.as_ref(),
            STORE_ADMIN_ROLE_NAME,
            RoleScope::Store,
            Some(parent.id),
        )
        .await
        .unwrap()
        .unwrap();
        let version = parent_admin.version;
        let mut extended = parent_admin;
        extended
            .permissions
            .set(Category::Inventory, Action::Skus, Level::ReadWrite);
        RoleRepo::update(backend.as_ref(), extended, version)
            .await
            .unwrap();

        let child = service
            .create(&actor, &scope, new_store("child", Some(parent.id)))
            .await
            .unwrap();
        let child_admin = RoleRepo::find_by_key(
            backend.as_ref(),
            STORE_ADMIN_ROLE_NAME,
            RoleScope::Store,
            Some(child.id),
        )
        .await
        .unwrap()
        .unwrap();
        assert_eq!(
            child_admin.permissions.level(Category::Inventory, Action::Skus),
            Some(Level::ReadWrite)
        );
    }

    #[tokio::test]
    async fn reparenting_under_a_descendant_is_rejected() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let actor = master_actor();
        let scope = AccessScope::unrestricted();

        let top = service
            .create(&actor, &scope, new_store("top", None))
            .await
            .unwrap();
        let mid = service
            .create(&actor, &scope, new_store("mid", Some(top.id)))
            .await
            .unwrap();

        let patch = StorePatch {
            parent: Some(Some(mid.id)),
            ..StorePatch::default()
        };
        let err = service.update(&actor, &scope, top.id, patch).await.unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn stores_outside_scope_are_denied_not_hidden() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let actor = master_actor();

        let store = service
            .create(&actor, &AccessScope::unrestricted(), new_store("main", None))
            .await
            .unwrap();

        let foreign = AccessScope::stores([StoreId::new()]);
        let err = service.get(&foreign, store.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }
}
