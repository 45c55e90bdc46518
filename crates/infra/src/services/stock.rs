//! Stock movements and the balance report.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use tracing::instrument;

use tillworks_auth::{AccessScope, Actor};
use tillworks_core::{DomainError, DomainResult, ItemId, MovementId, PartyId, StoreId};
use tillworks_inventory::{
    BalanceReport, BalanceWindow, MovementKind, NewPurchase, NewWastage, StockMovement,
    project_balances,
};
use tillworks_parties::PartyKind;

use crate::repo::{ItemRepo, PartyRepo, StockLedger};
use crate::services::{AuditService, ScopeService};

pub struct StockService {
    ledger: Arc<dyn StockLedger>,
    items: Arc<dyn ItemRepo>,
    parties: Arc<dyn PartyRepo>,
    scope: ScopeService,
    audit: AuditService,
}

impl StockService {
    pub fn new(
        ledger: Arc<dyn StockLedger>,
        items: Arc<dyn ItemRepo>,
        parties: Arc<dyn PartyRepo>,
        scope: ScopeService,
        audit: AuditService,
    ) -> Self {
        Self {
            ledger,
            items,
            parties,
            scope,
            audit,
        }
    }

    #[instrument(skip(self, actor, scope, input), fields(actor = %actor.user_id), err)]
    pub async fn record_purchase(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        store: Option<StoreId>,
        input: NewPurchase,
    ) -> DomainResult<StockMovement> {
        let store = self.scope.resolve_store(actor, scope, store).await?;
        self.check_item(store.id, input.item).await?;
        if let Some(supplier) = input.supplier {
            self.check_party(store.id, PartyKind::Supplier, supplier)
                .await?;
        }
        let movement = StockMovement::purchase(input, store.id, Some(actor.user_id), Utc::now())?;
        let movement = self.ledger.append(movement).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "stock.purchase",
                "movement",
                movement.id,
                serde_json::json!({ "item": movement.item, "quantity": movement.quantity }),
            )
            .await;
        Ok(movement)
    }

    #[instrument(skip(self, actor, scope, input), fields(actor = %actor.user_id), err)]
    pub async fn record_wastage(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        store: Option<StoreId>,
        input: NewWastage,
    ) -> DomainResult<StockMovement> {
        let store = self.scope.resolve_store(actor, scope, store).await?;
        self.check_item(store.id, input.item).await?;
        let movement = StockMovement::wastage(input, store.id, Some(actor.user_id), Utc::now())?;
        let movement = self.ledger.append(movement).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "stock.wastage",
                "movement",
                movement.id,
                serde_json::json!({ "item": movement.item, "quantity": movement.quantity }),
            )
            .await;
        Ok(movement)
    }

    /// Active movements of one kind, newest first.
    pub async fn list(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        kind: MovementKind,
        store: Option<StoreId>,
    ) -> DomainResult<Vec<StockMovement>> {
        let store = self.scope.resolve_store(actor, scope, store).await?;
        self.ledger.list(store.id, kind).await
    }

    /// Soft-delete a movement so it leaves every projection. The route layer
    /// decides which kinds an actor may remove; here only the kind addressed
    /// by the request is accepted.
    #[instrument(skip(self, actor, scope), fields(actor = %actor.user_id, kind = %kind, movement = %id), err)]
    pub async fn deactivate(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        kind: MovementKind,
        id: MovementId,
    ) -> DomainResult<()> {
        let movement = self.ledger.get(id).await?.ok_or(DomainError::NotFound)?;
        if movement.kind() != kind || !scope.allows(movement.store) {
            return Err(DomainError::NotFound);
        }
        self.ledger.deactivate(id).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "stock.delete",
                "movement",
                id,
                serde_json::json!({ "kind": kind, "item": movement.item }),
            )
            .await;
        Ok(())
    }

    /// Opening balance, per-kind sums inside the window, and closing balance
    /// for every item that ever moved in the store.
    pub async fn report(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        store: Option<StoreId>,
        window: BalanceWindow,
    ) -> DomainResult<BalanceReport> {
        let store = self.scope.resolve_store(actor, scope, store).await?;
        let movements = self.ledger.movements(store.id).await?;
        let names: BTreeMap<ItemId, String> = self
            .items
            .list_by_store(store.id)
            .await?
            .into_iter()
            .map(|item| (item.id, item.name))
            .collect();
        let rows = project_balances(&movements, window, &names);
        tracing::debug!(store = %store.id, rows = rows.len(), "stock report projected");
        Ok(BalanceReport {
            store: store.id,
            store_name: store.name,
            from: window.from,
            to: window.to,
            rows,
        })
    }

    async fn check_item(&self, store: StoreId, id: ItemId) -> DomainResult<()> {
        let item = self
            .items
            .get(id)
            .await?
            .ok_or_else(|| DomainError::validation("Invalid item"))?;
        if item.store != store {
            return Err(DomainError::validation("Item does not belong to store"));
        }
        Ok(())
    }

    async fn check_party(&self, store: StoreId, kind: PartyKind, id: PartyId) -> DomainResult<()> {
        let party = self
            .parties
            .get(id)
            .await?
            .filter(|party| party.kind == kind)
            .ok_or_else(|| DomainError::validation(format!("Invalid {kind}")))?;
        if party.store != store {
            return Err(DomainError::validation(format!(
                "{kind} does not belong to store"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repo::{MemoryBackend, StoreRepo};
    use chrono::{Duration, Utc};
    use rust_decimal::Decimal;
    use tillworks_auth::{NewUser, PermissionMatrix, User};
    use tillworks_catalog::{Item, NewItem};
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

    fn service(backend: &Arc<MemoryBackend>) -> StockService {
        StockService::new(
            backend.clone(),
            backend.clone(),
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

    async fn seed_item(backend: &Arc<MemoryBackend>, store: StoreId, name: &str) -> Item {
        let item = Item::create(
            NewItem {
                name: name.into(),
                category: None,
                tax: None,
                description: None,
                default_price: Some(Decimal::from(100)),
            },
            store,
            String::new(),
            String::new(),
            Decimal::ZERO,
            Utc::now(),
        )
        .unwrap();
        ItemRepo::insert(backend.as_ref(), item).await.unwrap()
    }

    fn purchase_of(item: ItemId, quantity: i64) -> NewPurchase {
        NewPurchase {
            item,
            quantity,
            supplier: None,
            unit_cost: None,
            occurred_at: None,
            notes: None,
        }
    }

    #[tokio::test]
    async fn purchases_require_an_item_in_the_store() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let main = seed_store(&backend, "main").await;
        let other = seed_store(&backend, "other").await;
        let foreign_item = seed_item(&backend, other.id, "Espresso").await;
        let actor = master_actor();
        let scope = AccessScope::unrestricted();

        let err = service
            .record_purchase(
                &actor,
                &scope,
                Some(main.id),
                purchase_of(foreign_item.id, 10),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));

        let err = service
            .record_purchase(
                &actor,
                &scope,
                Some(main.id),
                purchase_of(ItemId::new(), 10),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn wrong_kind_deactivation_is_not_found() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let store = seed_store(&backend, "main").await;
        let item = seed_item(&backend, store.id, "Espresso").await;
        let actor = master_actor();
        let scope = AccessScope::unrestricted();

        let movement = service
            .record_purchase(&actor, &scope, Some(store.id), purchase_of(item.id, 10))
            .await
            .unwrap();
        let err = service
            .deactivate(&actor, &scope, MovementKind::Wastage, movement.id)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound));

        service
            .deactivate(&actor, &scope, MovementKind::Purchase, movement.id)
            .await
            .unwrap();
        let listed = service
            .list(&actor, &scope, MovementKind::Purchase, Some(store.id))
            .await
            .unwrap();
        assert!(listed.is_empty());
    }

    #[tokio::test]
    async fn report_buckets_by_window() {
        let backend = Arc::new(MemoryBackend::new());
        let service = service(&backend);
        let store = seed_store(&backend, "main").await;
        let item = seed_item(&backend, store.id, "Espresso").await;
        let actor = master_actor();
        let scope = AccessScope::unrestricted();

        let now = Utc::now();
        let mut early = purchase_of(item.id, 30);
        early.occurred_at = Some(now - Duration::days(10));
        service
            .record_purchase(&actor, &scope, Some(store.id), early)
            .await
            .unwrap();
        let mut inside = purchase_of(item.id, 12);
        inside.occurred_at = Some(now - Duration::days(2));
        service
            .record_purchase(&actor, &scope, Some(store.id), inside)
            .await
            .unwrap();

        let window = BalanceWindow {
            from: Some(now - Duration::days(5)),
            to: Some(now),
        };
        let report = service
            .report(&actor, &scope, Some(store.id), window)
            .await
            .unwrap();
        assert_eq!(report.rows.len(), 1);
        let row = &report.rows[0];
        assert_eq!(row.item_name, "Espresso");
        assert_eq!(row.opening, 30);
        assert_eq!(row.purchased, 12);
        assert_eq!(row.closing, 42);
    }
}
