//! User accounts and actor resolution.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use tillworks_auth::{
    AccessScope, Actor, NewUser, PermissionMatrix, PermissionSchema, User, UserPatch, UserStatus,
};
use tillworks_core::{DomainError, DomainResult, UserId};

use crate::repo::{RoleRepo, UserRepo};
use crate::services::{AuditService, ScopeService};

pub struct UserService {
    users: Arc<dyn UserRepo>,
    roles: Arc<dyn RoleRepo>,
    scope: ScopeService,
    schema: PermissionSchema,
    audit: AuditService,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        roles: Arc<dyn RoleRepo>,
        scope: ScopeService,
        schema: PermissionSchema,
        audit: AuditService,
    ) -> Self {
        Self {
            users,
            roles,
            scope,
            schema,
            audit,
        }
    }

    /// Rebuild the caller's [`Actor`] from storage for an authenticated
    /// request. The effective matrix comes from the user's role, sanitized
    /// against the current schema; a missing or deactivated role grants
    /// nothing.
    pub async fn resolve_actor(&self, id: UserId) -> DomainResult<Actor> {
        let user = self.users.get(id).await?.ok_or(DomainError::Unauthorized)?;
        let permissions = match user.role {
            Some(role_id) => match self.roles.get(role_id).await? {
                Some(role) if role.is_active => sanitize_stored(&role.permissions, &self.schema)?,
                _ => PermissionMatrix::new(),
            },
            None => PermissionMatrix::new(),
        };
        Actor::for_user(&user, permissions)
    }

    #[instrument(skip(self, actor, scope, input), fields(actor = %actor.user_id), err)]
    pub async fn create(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        input: NewUser,
    ) -> DomainResult<User> {
        if input.is_master_admin && !actor.is_master_admin {
            return Err(DomainError::forbidden(
                "only a master admin may grant master admin",
            ));
        }
        let store = match input.store {
            Some(requested) => Some(
                self.scope
                    .resolve_store(actor, scope, Some(requested))
                    .await?
                    .id,
            ),
            None if actor.is_master_admin => None,
            None => actor.store,
        };
        for grant in &input.accessible_stores {
            if !scope.allows(*grant) {
                return Err(DomainError::access_denied());
            }
        }
        if let Some(role_id) = input.role {
            if self.roles.get(role_id).await?.is_none() {
                return Err(DomainError::validation("Invalid role"));
            }
        }
        let input = NewUser { store, ..input };
        let user = User::create(input, Utc::now())?;
        let user = self.users.insert(user).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "user.create",
                "user",
                user.id,
                serde_json::json!({ "email": user.email }),
            )
            .await;
        Ok(user)
    }

    #[instrument(skip(self, actor, scope, patch), fields(actor = %actor.user_id, user = %id), err)]
    pub async fn update(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        id: UserId,
        patch: UserPatch,
    ) -> DomainResult<User> {
        let mut user = self.visible_user(actor, scope, id).await?;
        if !actor.is_master_admin && (user.is_master_admin || patch.is_master_admin == Some(true)) {
            return Err(DomainError::forbidden(
                "only a master admin may modify a master admin",
            ));
        }
        if let Some(Some(store)) = patch.store {
            self.scope.resolve_store(actor, scope, Some(store)).await?;
        }
        if let Some(grants) = &patch.accessible_stores {
            for grant in grants {
                if !scope.allows(*grant) {
                    return Err(DomainError::access_denied());
                }
            }
        }
        if let Some(Some(role_id)) = patch.role {
            if self.roles.get(role_id).await?.is_none() {
                return Err(DomainError::validation("Invalid role"));
            }
        }
        user.apply(patch, Utc::now())?;
        let user = self.users.update(user).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "user.update",
                "user",
                user.id,
                serde_json::json!({ "email": user.email }),
            )
            .await;
        Ok(user)
    }

    /// Soft delete: the account stays for attribution but can no longer
    /// authenticate.
    #[instrument(skip(self, actor, scope), fields(actor = %actor.user_id, user = %id), err)]
    pub async fn deactivate(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        id: UserId,
    ) -> DomainResult<User> {
        let mut user = self.visible_user(actor, scope, id).await?;
        if user.is_master_admin && !actor.is_master_admin {
            return Err(DomainError::forbidden(
                "only a master admin may modify a master admin",
            ));
        }
        user.status = UserStatus::Inactive;
        user.updated_at = Utc::now();
        let user = self.users.update(user).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "user.delete",
                "user",
                user.id,
                serde_json::json!({ "email": user.email }),
            )
            .await;
        Ok(user)
    }

    pub async fn get(&self, actor: &Actor, scope: &AccessScope, id: UserId) -> DomainResult<User> {
        self.visible_user(actor, scope, id).await
    }

    /// Master admins see everyone. Everyone else sees users homed at a store
    /// within their scope; store-less accounts stay invisible to them.
    pub async fn list(&self, actor: &Actor, scope: &AccessScope) -> DomainResult<Vec<User>> {
        let users = self.users.list().await?;
        if actor.is_master_admin {
            return Ok(users);
        }
        Ok(users
            .into_iter()
            .filter(|user| user.store.is_some_and(|store| scope.allows(store)))
            .collect())
    }

    async fn visible_user(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        id: UserId,
    ) -> DomainResult<User> {
        let user = self.users.get(id).await?.ok_or(DomainError::NotFound)?;
        if actor.is_master_admin {
            return Ok(user);
        }
        if !user.store.is_some_and(|store| scope.allows(store)) {
            return Err(DomainError::NotFound);
        }
        Ok(user)
    }
}

fn sanitize_stored(
    matrix: &PermissionMatrix,
    schema: &PermissionSchema,
) -> DomainResult<PermissionMatrix> {
    let raw = serde_json::to_value(matrix)
        .map_err(|err| DomainError::internal(format!("stored matrix is unserializable: {err}")))?;
    Ok(PermissionMatrix::sanitize(&raw, schema))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{MemoryBackend, StoreRepo};
    use tillworks_auth::{Action, Category, Level, Role, RoleScope};
    use tillworks_core::StoreId;
    use tillworks_stores::{NewStore, Store};

    fn actor(store: Option<StoreId>, master: bool) -> Actor {
        let user = User::create(
            NewUser {
                name: "User Admin".into(),
                email: "admin@example.com".into(),
                password_hash: "hash".into(),
                role: None,
                store,
                is_master_admin: master,
                is_parent_admin: false,
                accessible_stores: vec![],
            },
            Utc::now(),
        )
        .unwrap();
        Actor::for_user(&user, PermissionMatrix::new()).unwrap()
    }

    fn service(backend: &Arc<MemoryBackend>) -> UserService {
        UserService::new(
            backend.clone(),
            backend.clone(),
            ScopeService::new(backend.clone()),
            PermissionSchema::retail(),
            AuditService::new(backend.clone()),
        )
    }

    async fn seed_store(backend: &Arc<MemoryBackend>, name: &str) -> Store {
        let store = Store::create(
            NewStore {
                name: name.into(),
                code: name.to_uppercase(),
                parent: None,
                store_type: None,
            },
            None,
            Utc::now(),
        )
        .unwrap();
        StoreRepo::insert(backend.as_ref(), store).await.unwrap()
    }

    fn new_user(email: &str, store: Option<StoreId>) -> NewUser {
        NewUser {
            name: "Clerk".into(),
            email: email.into(),
            password_hash: "hash".into(),
            role: None,
            store,
            is_master_admin: false,
            is_parent_admin: false,
            accessible_stores: vec![],
        }
    }

    #[tokio::test]
    async fn only_masters_mint_masters() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let store = seed_store(&backend, "main").await;
        let scope = AccessScope::stores([store.id]);

        let mut input = new_user("mini-me@example.com", Some(store.id));
        input.is_master_admin = true;
        let err = service
            .create(&actor(Some(store.id), false), &scope, input)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn non_master_creation_lands_in_own_store() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let store = seed_store(&backend, "main").await;
        let scope = AccessScope::stores([store.id]);

        let created = service
            .create(
                &actor(Some(store.id), false),
                &scope,
                new_user("clerk@example.com", None),
            )
            .await
            .unwrap();
        assert_eq!(created.store, Some(store.id));
    }

    #[tokio::test]
    async fn foreign_users_read_as_missing() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let home = seed_store(&backend, "home").await;
        let away = seed_store(&backend, "away").await;
        let master = actor(None, true);

        let foreign = service
            .create(
                &master,
                &AccessScope::unrestricted(),
                new_user("away@example.com", Some(away.id)),
            )
            .await
            .unwrap();

        let clerk = actor(Some(home.id), false);
        let scope = AccessScope::stores([home.id]);
        let err = service.get(&clerk, &scope, foreign.id).await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
        assert!(service.list(&clerk, &scope).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn resolve_actor_sanitizes_the_stored_matrix() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let store = seed_store(&backend, "main").await;

        // Role granting read_write on a view-only action: sanitization must
        // pull it down when the actor is rebuilt.
        let role = Role::create(
            "Overreach".into(),
            None,
            RoleScope::Store,
            Some(store.id),
            PermissionMatrix::new().with(Category::Inventory, Action::StockSold, Level::ReadWrite),
            Utc::now(),
        )
        .unwrap();
        let role = RoleRepo::insert(backend.as_ref(), role).await.unwrap();

        let mut input = new_user("clerk@example.com", Some(store.id));
        input.role = Some(role.id);
        let user = service
            .create(&actor(None, true), &AccessScope::unrestricted(), input)
            .await
            .unwrap();

        let resolved = service.resolve_actor(user.id).await.unwrap();
        assert!(!resolved.has_capability(Category::Inventory, Action::StockSold, Level::ReadWrite));
        assert!(resolved.has_capability(Category::Inventory, Action::StockSold, Level::Show));
    }

    #[tokio::test]
    async fn inactive_users_cannot_resolve() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let store = seed_store(&backend, "main").await;
        let master = actor(None, true);
        let scope = AccessScope::unrestricted();

        let user = service
            .create(&master, &scope, new_user("gone@example.com", Some(store.id)))
            .await
            .unwrap();
        service.deactivate(&master, &scope, user.id).await.unwrap();

        let err = service.resolve_actor(user.id).await.unwrap_err();
        assert!(matches!(err, DomainError::Unauthorized));
    }

    #[tokio::test]
    async fn unknown_role_reference_is_invalid_input() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let store = seed_store(&backend, "main").await;

        let mut input = new_user("clerk@example.com", Some(store.id));
        input.role = Some(tillworks_core::RoleId::new());
        let err = service
            .create(&actor(None, true), &AccessScope::unrestricted(), input)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn update_revalidates_store_and_role() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let home = seed_store(&backend, "home").await;
        let away = seed_store(&backend, "away").await;
        let master = actor(None, true);

        let user = service
            .create(
                &master,
                &AccessScope::unrestricted(),
                new_user("clerk@example.com", Some(home.id)),
            )
            .await
            .unwrap();

        // A clerk scoped to home cannot move the user to away.
        let clerk = actor(Some(home.id), false);
        let scope = AccessScope::stores([home.id]);
        let patch = UserPatch {
            store: Some(Some(away.id)),
            ..UserPatch::default()
        };
        let err = service
            .update(&clerk, &scope, user.id, patch)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));

        let patch = UserPatch {
            name: Some("Senior Clerk".into()),
            ..UserPatch::default()
        };
        let updated = service.update(&clerk, &scope, user.id, patch).await.unwrap();
        assert_eq!(updated.name, "Senior Clerk");
    }
}
