//! In-memory backend. Intended for tests/dev and the default API wiring.
//! Not optimized for performance.

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;

use tillworks_auth::{Role, RoleScope, User};
use tillworks_catalog::{CatalogEntry, Category, EntryKind, Item};
use tillworks_core::{
    CategoryId, ConflictKind, DomainError, DomainResult, EntryId, InvoiceId, ItemId, MovementId,
    PartyId, RoleId, StoreId, UserId,
};
use tillworks_inventory::{MovementKind, StockMovement};
use tillworks_invoicing::Invoice;
use tillworks_parties::{Party, PartyKind};
use tillworks_stores::Store;

use super::{
    AuditEntry, AuditSink, CatalogRepo, CategoryRepo, InvoiceRepo, ItemRepo, PartyRepo, RoleRepo,
    SalePosting, StockLedger, StoreRepo, UserRepo,
};

/// One shared in-process store implementing every repository trait.
#[derive(Debug, Default)]
pub struct MemoryBackend {
    stores: RwLock<HashMap<StoreId, Store>>,
    users: RwLock<HashMap<UserId, User>>,
    roles: RwLock<HashMap<RoleId, Role>>,
    items: RwLock<HashMap<ItemId, Item>>,
    categories: RwLock<HashMap<CategoryId, Category>>,
    parties: RwLock<HashMap<PartyId, Party>>,
    entries: RwLock<HashMap<EntryId, CatalogEntry>>,
    invoices: RwLock<HashMap<InvoiceId, Invoice>>,
    movements: RwLock<Vec<StockMovement>>,
    audits: RwLock<Vec<AuditEntry>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

// A poisoned lock means a writer panicked mid-mutation. The guards below
// recover the inner data; for an in-process dev backend that is preferable
// to wedging every subsequent request.
fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

#[async_trait]
impl StoreRepo for MemoryBackend {
    async fn insert(&self, store: Store) -> DomainResult<Store> {
        let mut stores = write(&self.stores);
        if stores
            .values()
            .any(|s| s.id != store.id && s.code == store.code)
        {
            return Err(DomainError::duplicate_key("store code already in use"));
        }
        stores.insert(store.id, store.clone());
        Ok(store)
    }

    async fn update(&self, store: Store) -> DomainResult<Store> {
        let mut stores = write(&self.stores);
        if !stores.contains_key(&store.id) {
            return Err(DomainError::NotFound);
        }
        if stores
            .values()
            .any(|s| s.id != store.id && s.code == store.code)
        {
            return Err(DomainError::duplicate_key("store code already in use"));
        }
        stores.insert(store.id, store.clone());
        Ok(store)
    }

    async fn get(&self, id: StoreId) -> DomainResult<Option<Store>> {
        Ok(read(&self.stores).get(&id).cloned())
    }

    async fn list(&self) -> DomainResult<Vec<Store>> {
        let mut rows: Vec<Store> = read(&self.stores).values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}

#[async_trait]
impl UserRepo for MemoryBackend {
    async fn insert(&self, user: User) -> DomainResult<User> {
        let mut users = write(&self.users);
        if users.values().any(|u| u.id != user.id && u.email == user.email) {
            return Err(DomainError::duplicate_key("email already in use"));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn update(&self, user: User) -> DomainResult<User> {
        let mut users = write(&self.users);
        if !users.contains_key(&user.id) {
            return Err(DomainError::NotFound);
        }
        if users.values().any(|u| u.id != user.id && u.email == user.email) {
            return Err(DomainError::duplicate_key("email already in use"));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get(&self, id: UserId) -> DomainResult<Option<User>> {
        Ok(read(&self.users).get(&id).cloned())
    }

    async fn find_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        Ok(read(&self.users)
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn list(&self) -> DomainResult<Vec<User>> {
        let mut rows: Vec<User> = read(&self.users).values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}

fn role_key_taken(roles: &HashMap<RoleId, Role>, role: &Role) -> bool {
    roles.values().any(|r| {
        r.id != role.id && r.name == role.name && r.scope == role.scope && r.store == role.store
    })
}

#[async_trait]
impl RoleRepo for MemoryBackend {
    async fn insert(&self, role: Role) -> DomainResult<Role> {
        let mut roles = write(&self.roles);
        if role_key_taken(&roles, &role) {
            return Err(DomainError::duplicate_key(
                "a role with this name already exists for this scope",
            ));
        }
        roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn update(&self, mut role: Role, expected_version: u64) -> DomainResult<Role> {
        let mut roles = write(&self.roles);
        let stored = roles.get(&role.id).ok_or(DomainError::NotFound)?;
        if stored.version != expected_version {
            return Err(DomainError::stale_version(format!(
                "role version is {}, write expected {}",
                stored.version, expected_version
            )));
        }
        if role_key_taken(&roles, &role) {
            return Err(DomainError::duplicate_key(
                "a role with this name already exists for this scope",
            ));
        }
        role.version = expected_version + 1;
        roles.insert(role.id, role.clone());
        Ok(role)
    }

    async fn get(&self, id: RoleId) -> DomainResult<Option<Role>> {
        Ok(read(&self.roles).get(&id).cloned())
    }

    async fn find_by_key(
        &self,
        name: &str,
        scope: RoleScope,
        store: Option<StoreId>,
    ) -> DomainResult<Option<Role>> {
        Ok(read(&self.roles)
            .values()
            .find(|r| r.name == name && r.scope == scope && r.store == store)
            .cloned())
    }

    async fn list(&self) -> DomainResult<Vec<Role>> {
        let mut rows: Vec<Role> = read(&self.roles).values().cloned().collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}

fn item_name_taken(items: &HashMap<ItemId, Item>, item: &Item) -> bool {
    items
        .values()
        .any(|i| i.id != item.id && i.store == item.store && i.name == item.name)
}

#[async_trait]
impl ItemRepo for MemoryBackend {
    async fn insert(&self, item: Item) -> DomainResult<Item> {
        let mut items = write(&self.items);
        if item_name_taken(&items, &item) {
            return Err(DomainError::duplicate_key(
                "item name already in use for this store",
            ));
        }
        items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn update(&self, item: Item) -> DomainResult<Item> {
        let mut items = write(&self.items);
        if !items.contains_key(&item.id) {
            return Err(DomainError::NotFound);
        }
        if item_name_taken(&items, &item) {
            return Err(DomainError::duplicate_key(
                "item name already in use for this store",
            ));
        }
        items.insert(item.id, item.clone());
        Ok(item)
    }

    async fn get(&self, id: ItemId) -> DomainResult<Option<Item>> {
        Ok(read(&self.items).get(&id).cloned())
    }

    async fn list_by_store(&self, store: StoreId) -> DomainResult<Vec<Item>> {
        let mut rows: Vec<Item> = read(&self.items)
            .values()
            .filter(|i| i.store == store)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }

    async fn rename_category(&self, category: CategoryId, name: &str) -> DomainResult<u64> {
        let mut items = write(&self.items);
        let mut changed = 0;
        for item in items.values_mut() {
            if item.category == Some(category) {
                item.category_name = name.to_string();
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[async_trait]
impl CategoryRepo for MemoryBackend {
    async fn insert(&self, category: Category) -> DomainResult<Category> {
        let mut categories = write(&self.categories);
        if categories
            .values()
            .any(|c| c.id != category.id && c.store == category.store && c.name == category.name)
        {
            return Err(DomainError::duplicate_key(
                "category name already in use for this store",
            ));
        }
        categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn update(&self, category: Category) -> DomainResult<Category> {
        let mut categories = write(&self.categories);
        if !categories.contains_key(&category.id) {
            return Err(DomainError::NotFound);
        }
        if categories
            .values()
            .any(|c| c.id != category.id && c.store == category.store && c.name == category.name)
        {
            return Err(DomainError::duplicate_key(
                "category name already in use for this store",
            ));
        }
        categories.insert(category.id, category.clone());
        Ok(category)
    }

    async fn get(&self, id: CategoryId) -> DomainResult<Option<Category>> {
        Ok(read(&self.categories).get(&id).cloned())
    }

    async fn list_by_store(&self, store: StoreId) -> DomainResult<Vec<Category>> {
        let mut rows: Vec<Category> = read(&self.categories)
            .values()
            .filter(|c| c.store == store)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}

#[async_trait]
impl PartyRepo for MemoryBackend {
    async fn insert(&self, party: Party) -> DomainResult<Party> {
        let mut parties = write(&self.parties);
        if parties.values().any(|p| {
            p.id != party.id
                && p.store == party.store
                && p.kind == party.kind
                && p.name == party.name
        }) {
            return Err(DomainError::duplicate_key(
                "name already in use for this store",
            ));
        }
        parties.insert(party.id, party.clone());
        Ok(party)
    }

    async fn update(&self, party: Party) -> DomainResult<Party> {
        let mut parties = write(&self.parties);
        if !parties.contains_key(&party.id) {
            return Err(DomainError::NotFound);
        }
        if parties.values().any(|p| {
            p.id != party.id
                && p.store == party.store
                && p.kind == party.kind
                && p.name == party.name
        }) {
            return Err(DomainError::duplicate_key(
                "name already in use for this store",
            ));
        }
        parties.insert(party.id, party.clone());
        Ok(party)
    }

    async fn get(&self, id: PartyId) -> DomainResult<Option<Party>> {
        Ok(read(&self.parties).get(&id).cloned())
    }

    async fn list(&self, store: StoreId, kind: PartyKind) -> DomainResult<Vec<Party>> {
        let mut rows: Vec<Party> = read(&self.parties)
            .values()
            .filter(|p| p.store == store && p.kind == kind)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}

#[async_trait]
impl CatalogRepo for MemoryBackend {
    async fn insert(&self, entry: CatalogEntry) -> DomainResult<CatalogEntry> {
        let mut entries = write(&self.entries);
        if entries.values().any(|e| {
            e.id != entry.id
                && e.kind == entry.kind
                && e.store == entry.store
                && e.name == entry.name
        }) {
            return Err(DomainError::duplicate_key(
                "entry name already in use for this kind and store",
            ));
        }
        entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn update(&self, entry: CatalogEntry) -> DomainResult<CatalogEntry> {
        let mut entries = write(&self.entries);
        if !entries.contains_key(&entry.id) {
            return Err(DomainError::NotFound);
        }
        if entries.values().any(|e| {
            e.id != entry.id
                && e.kind == entry.kind
                && e.store == entry.store
                && e.name == entry.name
        }) {
            return Err(DomainError::duplicate_key(
                "entry name already in use for this kind and store",
            ));
        }
        entries.insert(entry.id, entry.clone());
        Ok(entry)
    }

    async fn get(&self, id: EntryId) -> DomainResult<Option<CatalogEntry>> {
        Ok(read(&self.entries).get(&id).cloned())
    }

    async fn list(&self, store: StoreId, kind: EntryKind) -> DomainResult<Vec<CatalogEntry>> {
        let mut rows: Vec<CatalogEntry> = read(&self.entries)
            .values()
            .filter(|e| e.store == store && e.kind == kind)
            .cloned()
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(rows)
    }
}

#[async_trait]
impl InvoiceRepo for MemoryBackend {
    async fn insert(&self, invoice: Invoice) -> DomainResult<Invoice> {
        let mut invoices = write(&self.invoices);
        if invoices
            .values()
            .any(|i| i.id != invoice.id && i.store == invoice.store && i.number == invoice.number)
        {
            return Err(DomainError::duplicate_key("invoice number already in use"));
        }
        invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn update(&self, invoice: Invoice) -> DomainResult<Invoice> {
        let mut invoices = write(&self.invoices);
        if !invoices.contains_key(&invoice.id) {
            return Err(DomainError::NotFound);
        }
        invoices.insert(invoice.id, invoice.clone());
        Ok(invoice)
    }

    async fn get(&self, id: InvoiceId) -> DomainResult<Option<Invoice>> {
        Ok(read(&self.invoices).get(&id).cloned())
    }

    async fn list(&self) -> DomainResult<Vec<Invoice>> {
        let mut rows: Vec<Invoice> = read(&self.invoices).values().cloned().collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }
}

fn append_movement(rows: &mut Vec<StockMovement>, movement: StockMovement) -> DomainResult<StockMovement> {
    if let Some(key) = movement.sold_key() {
        if rows
            .iter()
            .any(|m| m.is_active && m.sold_key() == Some(key))
        {
            return Err(DomainError::duplicate_key(
                "sale already posted for this invoice line",
            ));
        }
    }
    rows.push(movement.clone());
    Ok(movement)
}

#[async_trait]
impl StockLedger for MemoryBackend {
    async fn append(&self, movement: StockMovement) -> DomainResult<StockMovement> {
        append_movement(&mut write(&self.movements), movement)
    }

    async fn get(&self, id: MovementId) -> DomainResult<Option<StockMovement>> {
        Ok(read(&self.movements).iter().find(|m| m.id == id).cloned())
    }

    async fn deactivate(&self, id: MovementId) -> DomainResult<()> {
        let mut rows = write(&self.movements);
        let movement = rows
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(DomainError::NotFound)?;
        movement.deactivate();
        Ok(())
    }

    async fn list(&self, store: StoreId, kind: MovementKind) -> DomainResult<Vec<StockMovement>> {
        let mut rows: Vec<StockMovement> = read(&self.movements)
            .iter()
            .filter(|m| m.store == store && m.kind() == kind && m.is_active)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.occurred_at.cmp(&a.occurred_at));
        Ok(rows)
    }

    async fn movements(&self, store: StoreId) -> DomainResult<Vec<StockMovement>> {
        Ok(read(&self.movements)
            .iter()
            .filter(|m| m.store == store && m.is_active)
            .cloned()
            .collect())
    }

    async fn post_invoice_sale(
        &self,
        invoice: Invoice,
        movements: Vec<StockMovement>,
    ) -> DomainResult<(Invoice, SalePosting)> {
        let invoice = InvoiceRepo::insert(self, invoice).await?;
        let mut posting = SalePosting::default();
        let mut rows = write(&self.movements);
        for movement in movements {
            match append_movement(&mut rows, movement) {
                Ok(_) => posting.posted += 1,
                Err(DomainError::Conflict {
                    kind: ConflictKind::DuplicateKey,
                    ..
                }) => posting.duplicates += 1,
                Err(other) => return Err(other),
            }
        }
        Ok((invoice, posting))
    }
}

#[async_trait]
impl AuditSink for MemoryBackend {
    async fn record(&self, entry: AuditEntry) -> DomainResult<()> {
        write(&self.audits).push(entry);
        Ok(())
    }

    async fn list(&self) -> DomainResult<Vec<AuditEntry>> {
        Ok(read(&self.audits).clone())
    }
}
