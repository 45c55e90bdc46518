//! Store scope resolution shared by every service.

use std::sync::Arc;

use tillworks_auth::{AccessScope, Actor};
use tillworks_core::{DomainError, DomainResult, StoreId};
use tillworks_stores::{Store, StoreTree, resolve_access_scope, resolve_store_id};

use crate::repo::StoreRepo;

/// Resolves actor reach over the store forest and pins requests to a store.
///
/// Cheap to clone; the tree is rebuilt from the store list on every call so
/// re-parenting takes effect immediately.
#[derive(Clone)]
pub struct ScopeService {
    stores: Arc<dyn StoreRepo>,
}

impl ScopeService {
    pub fn new(stores: Arc<dyn StoreRepo>) -> Self {
        Self { stores }
    }

    /// Snapshot of the store forest, soft-deleted stores included so
    /// descendants of a deactivated parent stay reachable.
    pub async fn tree(&self) -> DomainResult<StoreTree> {
        let stores = self.stores.list().await?;
        Ok(StoreTree::from_edges(
            stores.into_iter().map(|store| (store.id, store.parent)),
        ))
    }

    /// The set of stores the actor may touch.
    pub async fn scope_for(&self, actor: &Actor) -> DomainResult<AccessScope> {
        if actor.is_master_admin {
            return Ok(AccessScope::unrestricted());
        }
        Ok(resolve_access_scope(actor, &self.tree().await?))
    }

    /// Pick the store a request operates on and require a row behind the id.
    pub async fn resolve_store(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        requested: Option<StoreId>,
    ) -> DomainResult<Store> {
        let id = resolve_store_id(actor, scope, requested)?;
        self.stores
            .get(id)
            .await?
            .ok_or_else(|| DomainError::validation("Invalid store"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::MemoryBackend;
    use chrono::Utc;
    use tillworks_auth::{NewUser, PermissionMatrix, User};
    use tillworks_stores::NewStore;

    fn actor_for(store: Option<StoreId>, parent_admin: bool) -> Actor {
        let user = User::create(
            NewUser {
                name: "Scope Tester".into(),
                email: "scope@example.com".into(),
                password_hash: "hash".into(),
                role: None,
                store,
                is_master_admin: false,
                is_parent_admin: parent_admin,
                accessible_stores: vec![],
            },
            Utc::now(),
        )
        .unwrap();
        Actor::for_user(&user, PermissionMatrix::new()).unwrap()
    }

    async fn seed_store(backend: &Arc<MemoryBackend>, name: &str, parent: Option<StoreId>) -> Store {
        let store = Store::create(
            NewStore {
                name: name.into(),
                code: name.to_uppercase(),
                parent,
                store_type: None,
            },
            None,
            Utc::now(),
        )
        .unwrap();
        StoreRepo::insert(backend.as_ref(), store).await.unwrap()
    }

    #[tokio::test]
    async fn parent_admin_scope_covers_the_subtree() {
        let backend = Arc::new(MemoryBackend::new());
        let root = seed_store(&backend, "root", None).await;
        let child = seed_store(&backend, "child", Some(root.id)).await;
        let stranger = seed_store(&backend, "stranger", None).await;

        let service = ScopeService::new(backend);
        let actor = actor_for(Some(root.id), true);
        let scope = service.scope_for(&actor).await.unwrap();

        assert!(scope.allows(root.id));
        assert!(scope.allows(child.id));
        assert!(!scope.allows(stranger.id));
    }

    #[tokio::test]
    async fn resolve_store_requires_a_backing_row() {
        let backend = Arc::new(MemoryBackend::new());
        let home = seed_store(&backend, "home", None).await;
        let service = ScopeService::new(backend);
        let actor = actor_for(Some(home.id), false);
        let scope = service.scope_for(&actor).await.unwrap();

        let resolved = service.resolve_store(&actor, &scope, None).await.unwrap();
        assert_eq!(resolved.id, home.id);

        let ghost = StoreId::new();
        let phantom = AccessScope::stores([ghost]);
        let err = service
            .resolve_store(&actor, &phantom, Some(ghost))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }
}
