//! Catalog management: items, categories and kinded entries.

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::instrument;

use tillworks_auth::{AccessScope, Actor};
use tillworks_catalog::{
    CatalogEntry, Category, CategoryPatch, EntryKind, EntryPatch, Item, ItemPatch, NewCategory,
    NewEntry, NewItem,
};
use tillworks_core::{CategoryId, DomainError, DomainResult, EntryId, ItemId, StoreId};
use tillworks_inventory::current_stock;

use crate::repo::{CatalogRepo, CategoryRepo, ItemRepo, StockLedger};
use crate::services::{AuditService, ScopeService};

/// An item with its current on-hand quantity attached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemListing {
    #[serde(flatten)]
    pub item: Item,
    pub on_hand: i64,
}

pub struct CatalogService {
    items: Arc<dyn ItemRepo>,
    categories: Arc<dyn CategoryRepo>,
    entries: Arc<dyn CatalogRepo>,
    ledger: Arc<dyn StockLedger>,
    scope: ScopeService,
    audit: AuditService,
}

impl CatalogService {
    pub fn new(
        items: Arc<dyn ItemRepo>,
        categories: Arc<dyn CategoryRepo>,
        entries: Arc<dyn CatalogRepo>,
        ledger: Arc<dyn StockLedger>,
        scope: ScopeService,
        audit: AuditService,
    ) -> Self {
        Self {
            items,
            categories,
            entries,
            ledger,
            scope,
            audit,
        }
    }

    #[instrument(skip(self, actor, scope, input), fields(actor = %actor.user_id), err)]
    pub async fn create_item(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        store: Option<StoreId>,
        input: NewItem,
    ) -> DomainResult<Item> {
        let store = self.scope.resolve_store(actor, scope, store).await?;
        let category_name = match input.category {
            Some(id) => self.category_name(store.id, id).await?,
            None => String::new(),
        };
        let (tax_name, tax_rate) = match input.tax {
            Some(id) => {
                let entry = self.tax_entry(store.id, id).await?;
                (entry.name, entry.value)
            }
            None => (String::new(), Decimal::ZERO),
        };
        let item = Item::create(input, store.id, category_name, tax_name, tax_rate, Utc::now())?;
        let item = self.items.insert(item).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "item.create",
                "item",
                item.id,
                serde_json::json!({ "name": item.name }),
            )
            .await;
        Ok(item)
    }

    #[instrument(skip(self, actor, scope, patch), fields(actor = %actor.user_id, item = %id), err)]
    pub async fn update_item(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        id: ItemId,
        patch: ItemPatch,
    ) -> DomainResult<Item> {
        let mut item = self.visible_item(scope, id).await?;
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("item name must not be empty"));
            }
            item.name = name;
        }
        if let Some(category) = patch.category {
            match category {
                Some(category_id) => {
                    item.category_name = self.category_name(item.store, category_id).await?;
                    item.category = Some(category_id);
                }
                None => {
                    item.category = None;
                    item.category_name = String::new();
                }
            }
        }
        if let Some(tax) = patch.tax {
            match tax {
                Some(entry_id) => {
                    let entry = self.tax_entry(item.store, entry_id).await?;
                    item.tax = Some(entry_id);
                    item.tax_name = entry.name;
                    item.tax_rate = entry.value;
                }
                None => {
                    item.tax = None;
                    item.tax_name = String::new();
                    item.tax_rate = Decimal::ZERO;
                }
            }
        }
        if let Some(description) = patch.description {
            item.description = description;
        }
        if let Some(price) = patch.default_price {
            if price < Decimal::ZERO {
                return Err(DomainError::validation("item price must not be negative"));
            }
            item.default_price = price;
        }
        item.updated_at = Utc::now();
        let item = self.items.update(item).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "item.update",
                "item",
                item.id,
                serde_json::json!({ "name": item.name }),
            )
            .await;
        Ok(item)
    }

    #[instrument(skip(self, actor, scope), fields(actor = %actor.user_id, item = %id), err)]
    pub async fn deactivate_item(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        id: ItemId,
    ) -> DomainResult<Item> {
        let mut item = self.visible_item(scope, id).await?;
        item.is_active = false;
        item.updated_at = Utc::now();
        let item = self.items.update(item).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "item.delete",
                "item",
                item.id,
                serde_json::json!({ "name": item.name }),
            )
            .await;
        Ok(item)
    }

    /// Active items for a store, each carrying its net on-hand quantity from
    /// the ledger.
    pub async fn list_items(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        store: Option<StoreId>,
    ) -> DomainResult<Vec<ItemListing>> {
        let store = self.scope.resolve_store(actor, scope, store).await?;
        let items = self.items.list_by_store(store.id).await?;
        let movements = self.ledger.movements(store.id).await?;
        let stock = current_stock(&movements);
        Ok(items
            .into_iter()
            .filter(|item| item.is_active)
            .map(|item| {
                let on_hand = stock.get(&item.id).copied().unwrap_or(0);
                ItemListing { item, on_hand }
            })
            .collect())
    }

    #[instrument(skip(self, actor, scope, input), fields(actor = %actor.user_id), err)]
    pub async fn create_category(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        store: Option<StoreId>,
        input: NewCategory,
    ) -> DomainResult<Category> {
        let store = self.scope.resolve_store(actor, scope, store).await?;
        let category = Category::create(input, store.id, Some(actor.user_id), Utc::now())?;
        let category = self.categories.insert(category).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "category.create",
                "category",
                category.id,
                serde_json::json!({ "name": category.name }),
            )
            .await;
        Ok(category)
    }

    /// Update a category. A rename rewrites the denormalized name on every
    /// item that references it.
    #[instrument(skip(self, actor, scope, patch), fields(actor = %actor.user_id, category = %id), err)]
    pub async fn update_category(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        id: CategoryId,
        patch: CategoryPatch,
    ) -> DomainResult<Category> {
        let mut category = self.visible_category(scope, id).await?;
        let mut renamed = false;
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("category name must not be empty"));
            }
            renamed = name != category.name;
            category.name = name;
        }
        if let Some(code) = patch.code {
            category.code = code.trim().to_string();
        }
        category.updated_at = Utc::now();
        let category = self.categories.update(category).await?;
        if renamed {
            let changed = self
                .items
                .rename_category(category.id, &category.name)
                .await?;
            tracing::info!(category = %category.id, items = changed, "category rename propagated");
        }
        self.audit
            .record(
                Some(actor.user_id),
                "category.update",
                "category",
                category.id,
                serde_json::json!({ "name": category.name }),
            )
            .await;
        Ok(category)
    }

    #[instrument(skip(self, actor, scope), fields(actor = %actor.user_id, category = %id), err)]
    pub async fn deactivate_category(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        id: CategoryId,
    ) -> DomainResult<Category> {
        let mut category = self.visible_category(scope, id).await?;
        category.is_active = false;
        category.updated_at = Utc::now();
        let category = self.categories.update(category).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "category.delete",
                "category",
                category.id,
                serde_json::json!({ "name": category.name }),
            )
            .await;
        Ok(category)
    }

    pub async fn list_categories(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        store: Option<StoreId>,
    ) -> DomainResult<Vec<Category>> {
        let store = self.scope.resolve_store(actor, scope, store).await?;
        let categories = self.categories.list_by_store(store.id).await?;
        Ok(categories
            .into_iter()
            .filter(|category| category.is_active)
            .collect())
    }

    #[instrument(skip(self, actor, scope, input), fields(actor = %actor.user_id, kind = %kind), err)]
    pub async fn create_entry(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        kind: EntryKind,
        store: Option<StoreId>,
        input: NewEntry,
    ) -> DomainResult<CatalogEntry> {
        let store = self.scope.resolve_store(actor, scope, store).await?;
        let entry = CatalogEntry::create(input, kind, store.id, Some(actor.user_id), Utc::now())?;
        let entry = self.entries.insert(entry).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "catalog.create",
                "catalog_entry",
                entry.id,
                serde_json::json!({ "kind": entry.kind, "name": entry.name }),
            )
            .await;
        Ok(entry)
    }

    #[instrument(skip(self, actor, scope, patch), fields(actor = %actor.user_id, kind = %kind, entry = %id), err)]
    pub async fn update_entry(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        kind: EntryKind,
        id: EntryId,
        patch: EntryPatch,
    ) -> DomainResult<CatalogEntry> {
        let mut entry = self.visible_entry(scope, kind, id).await?;
        if let Some(name) = patch.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(DomainError::validation("catalog entry name must not be empty"));
            }
            entry.name = name;
        }
        if let Some(code) = patch.code {
            entry.code = code.trim().to_string();
        }
        if let Some(value) = patch.value {
            entry.value = value;
        }
        if let Some(config) = patch.config {
            entry.config = config;
        }
        entry.updated_at = Utc::now();
        let entry = self.entries.update(entry).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "catalog.update",
                "catalog_entry",
                entry.id,
                serde_json::json!({ "kind": entry.kind, "name": entry.name }),
            )
            .await;
        Ok(entry)
    }

    #[instrument(skip(self, actor, scope), fields(actor = %actor.user_id, kind = %kind, entry = %id), err)]
    pub async fn deactivate_entry(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        kind: EntryKind,
        id: EntryId,
    ) -> DomainResult<CatalogEntry> {
        let mut entry = self.visible_entry(scope, kind, id).await?;
        entry.is_active = false;
        entry.updated_at = Utc::now();
        let entry = self.entries.update(entry).await?;
        self.audit
            .record(
                Some(actor.user_id),
                "catalog.delete",
                "catalog_entry",
                entry.id,
                serde_json::json!({ "kind": entry.kind, "name": entry.name }),
            )
            .await;
        Ok(entry)
    }

    pub async fn list_entries(
        &self,
        actor: &Actor,
        scope: &AccessScope,
        kind: EntryKind,
        store: Option<StoreId>,
    ) -> DomainResult<Vec<CatalogEntry>> {
        let store = self.scope.resolve_store(actor, scope, store).await?;
        let entries = self.entries.list(store.id, kind).await?;
        Ok(entries.into_iter().filter(|entry| entry.is_active).collect())
    }

    async fn visible_item(&self, scope: &AccessScope, id: ItemId) -> DomainResult<Item> {
        let item = self.items.get(id).await?.ok_or(DomainError::NotFound)?;
        if !scope.allows(item.store) {
            return Err(DomainError::NotFound);
        }
        Ok(item)
    }

    async fn visible_category(
        &self,
        scope: &AccessScope,
        id: CategoryId,
    ) -> DomainResult<Category> {
        let category = self
            .categories
            .get(id)
            .await?
            .ok_or(DomainError::NotFound)?;
        if !scope.allows(category.store) {
            return Err(DomainError::NotFound);
        }
        Ok(category)
    }

    /// A kind mismatch reads as missing: `/taxes/:id` can never address a
    /// discount, even with a valid id.
    async fn visible_entry(
        &self,
        scope: &AccessScope,
        kind: EntryKind,
        id: EntryId,
    ) -> DomainResult<CatalogEntry> {
        let entry = self.entries.get(id).await?.ok_or(DomainError::NotFound)?;
        if entry.kind != kind || !scope.allows(entry.store) {
            return Err(DomainError::NotFound);
        }
        Ok(entry)
    }

    async fn category_name(&self, store: StoreId, id: CategoryId) -> DomainResult<String> {
        let category = self
            .categories
            .get(id)
            .await?
            .ok_or_else(|| DomainError::validation("Invalid category"))?;
        if category.store != store {
            return Err(DomainError::validation("Category does not belong to store"));
        }
        Ok(category.name)
    }

    async fn tax_entry(&self, store: StoreId, id: EntryId) -> DomainResult<CatalogEntry> {
        let entry = self
            .entries
            .get(id)
            .await?
            .filter(|entry| entry.kind == EntryKind::Taxes)
            .ok_or_else(|| DomainError::validation("Invalid tax"))?;
        if entry.store != store {
            return Err(DomainError::validation("Tax does not belong to store"));
        }
        Ok(entry)
    }
}
