//! Suppliers and buyers.

use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use tillworks_auth::{AccessScope, Actor};
use tillworks_core::{DomainError, DomainResult, PartyId, StoreId};
use tillworks_parties::{NewParty, Party, PartyKind, PartyPatch};

use crate::repo::PartyRepo;
use crate::services::{AuditService, ScopeService};

pub struct PartyService {
    parties: Arc<dyn PartyRepo>,
    scope: ScopeService,
    audit: AuditService,
}

impl PartyService {
    pub fn new(parties: Arc<dyn PartyRepo>, scope: ScopeService, audit: AuditService) -> Self {
        Self {
            parties,
            scope,
            audit,
        }
    }

    #[instrument(skip(self, actor, scope, input), fields(actor = %actor.user_id, kind = %kind), err)]
    pub async fn create(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        kind: PartyKind,
        store: Option<StoreId>,
        input: NewParty,
    ) -> DomainResult<Party> {
        let store = self.scope.resolve_store(actor, scope, store).await?;
        let party = Party::create(input, kind, store.id, Some(actor.user_id), Utc::now())?;
        let party = self.parties.insert(party).await?;
        self.audit
            .record(
                Some(actor.user_id),
                &format!("{}.create", kind.as_str()),
                kind.as_str(),
                party.id,
                serde_json::json!({ "name": party.name }),
            )
            .await;
        Ok(party)
    }

    #[instrument(skip(self, actor, scope, patch), fields(actor = %actor.user_id, kind = %kind, party = %id), err)]
    pub async fn update(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        kind: PartyKind,
        id: PartyId,
        patch: PartyPatch,
    ) -> DomainResult<Party> {
        let mut party = self.visible_party(scope, kind, id).await?;
        party.apply(patch, Some(actor.user_id), Utc::now())?;
        let party = self.parties.update(party).await?;
        self.audit
            .record(
                Some(actor.user_id),
                &format!("{}.update", kind.as_str()),
                kind.as_str(),
                party.id,
                serde_json::json!({ "name": party.name }),
            )
            .await;
        Ok(party)
    }

    #[instrument(skip(self, actor, scope), fields(actor = %actor.user_id, kind = %kind, party = %id), err)]
    pub async fn deactivate(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        kind: PartyKind,
        id: PartyId,
    ) -> DomainResult<Party> {
        let mut party = self.visible_party(scope, kind, id).await?;
        party.deactivate(Some(actor.user_id), Utc::now());
        let party = self.parties.update(party).await?;
        self.audit
            .record(
                Some(actor.user_id),
                &format!("{}.delete", kind.as_str()),
                kind.as_str(),
                party.id,
                serde_json::json!({ "name": party.name }),
            )
            .await;
        Ok(party)
    }

    pub async fn list(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        kind: PartyKind,
        store: Option<StoreId>,
    ) -> DomainResult<Vec<Party>> {
        let store = self.scope.resolve_store(actor, scope, store).await?;
        let parties = self.parties.list(store.id, kind).await?;
        Ok(parties.into_iter().filter(|party| party.is_active).collect())
    }

    /// A wrong-kind id reads as missing: `/suppliers/:id` never addresses a
    /// buyer.
    async fn visible_party(
        &self,
        scope: &AccessScope,
        kind: PartyKind,
        id: PartyId,
    ) -> DomainResult<Party> {
        let party = self.parties.get(id).await?.ok_or(DomainError::NotFound)?;
        if party.kind != kind || !scope.allows(party.store) {
            return Err(DomainError::NotFound);
        }
        Ok(party)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{MemoryBackend, StoreRepo};
    use tillworks_auth::{NewUser, PermissionMatrix, User};
    use tillworks_core::ConflictKind;
    use tillworks_parties::ContactInfo;
    use tillworks_stores::{NewStore, Store};

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

    fn service(backend: &Arc<MemoryBackend>) -> PartyService {
        PartyService::new(
            backend.clone(),
            ScopeService::new(backend.clone()),
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

    fn new_party(name: &str) -> NewParty {
        NewParty {
            name: name.into(),
            contact: ContactInfo::default(),
        }
    }

    #[tokio::test]
    async fn kinds_are_separate_namespaces() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let store = seed_store(&backend, "main").await;
        let actor = master_actor();
        let scope = AccessScope::unrestricted();

        service
            .create(&actor, &scope, PartyKind::Supplier, Some(store.id), new_party("Acme"))
            .await
            .unwrap();
        // Same name as a buyer is fine; same name as a second supplier is not.
        service
            .create(&actor, &scope, PartyKind::Buyer, Some(store.id), new_party("Acme"))
            .await
            .unwrap();
        let err = service
            .create(&actor, &scope, PartyKind::Supplier, Some(store.id), new_party("Acme"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DomainError::Conflict {
                kind: ConflictKind::DuplicateKey,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn wrong_kind_lookup_is_not_found() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let store = seed_store(&backend, "main").await;
        let actor = master_actor();
        let scope = AccessScope::unrestricted();

        let supplier = service
            .create(&actor, &scope, PartyKind::Supplier, Some(store.id), new_party("Acme"))
            .await
            .unwrap();
        let err = service
            .update(
                &actor,
                &scope,
                PartyKind::Buyer,
                supplier.id,
                PartyPatch::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound));
    }

    #[tokio::test]
    async fn deactivated_parties_leave_listings() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let store = seed_store(&backend, "main").await;
        let actor = master_actor();
        let scope = AccessScope::unrestricted();

        let supplier = service
            .create(&actor, &scope, PartyKind::Supplier, Some(store.id), new_party("Acme"))
            .await
            .unwrap();
        service
            .deactivate(&actor, &scope, PartyKind::Supplier, supplier.id)
            .await
            .unwrap();
        let listed = service
            .list(&actor, &scope, PartyKind::Supplier, Some(store.id))
            .await
            .unwrap();
        assert!(listed.is_empty());
    }
}
