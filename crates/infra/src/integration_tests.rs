//! End-to-end tests over the in-memory backend.
//!
//! Drives the same service stack the HTTP layer wires together:
//! store provisioning → catalog → invoice issuance → ledger → balance
//! report, plus scope and delegation enforcement for store-bound staff.

use std::sync::Arc;

use chrono::{Duration, Utc};
use rust_decimal::Decimal;

use tillworks_auth::{
    AccessScope, Actor, Level, NewRole, NewUser, PermissionSchema, RolePatch, RoleScope,
};
use tillworks_core::{ConflictKind, DomainError, StoreId};
use tillworks_inventory::{BalanceWindow, NewPurchase, NewWastage};
use tillworks_invoicing::{InvoiceStatus, NewInvoice, NewInvoiceLine};
use tillworks_stores::{NewStore, Store};

use crate::repo::{MemoryBackend, RoleRepo, UserRepo};
use crate::services::{
    AuditService, CatalogService, InvoiceService, RoleService, STORE_ADMIN_ROLE_NAME,
    ScopeService, StockService, StoreService, UserService,
};

struct Stack {
    backend: Arc<MemoryBackend>,
    stores: StoreService,
    roles: RoleService,
    users: UserService,
    catalog: CatalogService,
    stock: StockService,
    invoices: InvoiceService,
}

fn stack() -> Stack {
    let backend = Arc::new(MemoryBackend::new());
    let scope = ScopeService::new(backend.clone());
    let audit = AuditService::new(backend.clone());
    let schema = PermissionSchema::retail();
    Stack {
        backend: backend.clone(),
        stores: StoreService::new(
            backend.clone(),
            backend.clone(),
            scope.clone(),
            schema.clone(),
            audit.clone(),
        ),
        roles: RoleService::new(backend.clone(), scope.clone(), schema.clone(), audit.clone()),
        users: UserService::new(
            backend.clone(),
            backend.clone(),
            scope.clone(),
            schema,
            audit.clone(),
        ),
        catalog: CatalogService::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            backend.clone(),
            scope.clone(),
            audit.clone(),
        ),
        stock: StockService::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            scope.clone(),
            audit.clone(),
        ),
        invoices: InvoiceService::new(
            backend.clone(),
            backend.clone(),
            backend.clone(),
            backend.clone(),
            scope,
            audit,
        ),
    }
}

/// Seed the master role and a master user, then resolve them the same way an
/// authenticated request would.
async fn master(stack: &Stack) -> (Actor, AccessScope) {
    let role = stack.roles.seed_master().await.unwrap();
    let user = tillworks_auth::User::create(
        NewUser {
            name: "Master".into(),
            email: "master@example.com".into(),
            password_hash: "hash".into(),
            role: Some(role.id),
            store: None,
            is_master_admin: true,
            is_parent_admin: false,
            accessible_stores: vec![],
        },
        Utc::now(),
    )
    .unwrap();
    let user = UserRepo::insert(stack.backend.as_ref(), user).await.unwrap();
    let actor = stack.users.resolve_actor(user.id).await.unwrap();
    let scope = ScopeService::new(stack.backend.clone())
        .scope_for(&actor)
        .await
        .unwrap();
    (actor, scope)
}

/// Create a store-bound user wearing the given role and resolve actor and
/// scope from storage.
async fn staff(
    stack: &Stack,
    master: (&Actor, &AccessScope),
    store: StoreId,
    role: Option<tillworks_core::RoleId>,
    email: &str,
) -> (Actor, AccessScope) {
    let user = stack
        .users
        .create(
            master.0,
            master.1,
            NewUser {
                name: "Staff".into(),
                email: email.into(),
                password_hash: "hash".into(),
                role,
                store: Some(store),
                is_master_admin: false,
                is_parent_admin: false,
                accessible_stores: vec![],
            },
        )
        .await
        .unwrap();
    let actor = stack.users.resolve_actor(user.id).await.unwrap();
    let scope = ScopeService::new(stack.backend.clone())
        .scope_for(&actor)
        .await
        .unwrap();
    (actor, scope)
}

async fn seed_store(stack: &Stack, master: (&Actor, &AccessScope), name: &str) -> Store {
    stack
        .stores
        .create(
            master.0,
            master.1,
            NewStore {
                name: name.into(),
                code: name.to_uppercase(),
                parent: None,
                store_type: None,
            },
        )
        .await
        .unwrap()
}

fn bill(store: StoreId, lines: Vec<NewInvoiceLine>) -> NewInvoice {
    NewInvoice {
        store: Some(store),
        customer_name: "Walk-in".into(),
        customer_email: String::new(),
        currency: None,
        order_type: None,
        payment_type: None,
        discount: None,
        discount_value: None,
        notes: String::new(),
        lines,
    }
}

#[tokio::test]
async fn billing_pipeline_lands_in_the_stock_report() {
    let stack = stack();
    let (actor, scope) = master(&stack).await;
    let store = seed_store(&stack, (&actor, &scope), "main").await;
    let item = stack
        .catalog
        .create_item(
            &actor,
            &scope,
            Some(store.id),
            tillworks_catalog::NewItem {
                name: "Espresso Beans".into(),
                category: None,
                tax: None,
                description: None,
                default_price: Some(Decimal::from(100)),
            },
        )
        .await
        .unwrap();

    let now = Utc::now();
    stack
        .stock
        .record_purchase(
            &actor,
            &scope,
            Some(store.id),
            NewPurchase {
                item: item.id,
                quantity: 100,
                supplier: None,
                unit_cost: Some(Decimal::from(60)),
                occurred_at: Some(now - Duration::days(9)),
                notes: None,
            },
        )
        .await
        .unwrap();

    let (invoice, posting) = stack
        .invoices
        .create(
            &actor,
            &scope,
            InvoiceStatus::Issued,
            bill(
                store.id,
                vec![NewInvoiceLine {
                    item: Some(item.id),
                    description: String::new(),
                    quantity: 30,
                    unit_price: Decimal::from(100),
                    tax_rate: Decimal::ZERO,
                    discount: Decimal::ZERO,
                }],
            ),
        )
        .await
        .unwrap();
    assert_eq!(posting.posted, 1);
    assert_eq!(invoice.totals.total, Decimal::from(3000));

    stack
        .stock
        .record_wastage(
            &actor,
            &scope,
            Some(store.id),
            NewWastage {
                item: item.id,
                quantity: 5,
                reason_code: Some("EXPIRED".into()),
                occurred_at: Some(now - Duration::days(1)),
                notes: None,
            },
        )
        .await
        .unwrap();

    // Purchase sits before the window; sale and wastage inside it.
    let report = stack
        .stock
        .report(
            &actor,
            &scope,
            Some(store.id),
            BalanceWindow {
                from: Some(now - Duration::days(7)),
                to: Some(now + Duration::hours(1)),
            },
        )
        .await
        .unwrap();
    assert_eq!(report.rows.len(), 1);
    let row = &report.rows[0];
    assert_eq!(row.item_name, "Espresso Beans");
    assert_eq!(row.opening, 100);
    assert_eq!(row.purchased, 0);
    assert_eq!(row.sold, 30);
    assert_eq!(row.wasted, 5);
    assert_eq!(row.closing, 65);

    // Item listings carry the same net quantity.
    let listings = stack
        .catalog
        .list_items(&actor, &scope, Some(store.id))
        .await
        .unwrap();
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].on_hand, 65);
}

#[tokio::test]
async fn store_admin_delegation_is_bounded_end_to_end() {
    let stack = stack();
    let (actor, scope) = master(&stack).await;
    let store = seed_store(&stack, (&actor, &scope), "main").await;

    // Store creation provisioned an admin role for the new store.
    let admin_role = RoleRepo::find_by_key(
        stack.backend.as_ref(),
        STORE_ADMIN_ROLE_NAME,
        RoleScope::Store,
        Some(store.id),
    )
    .await
    .unwrap()
    .expect("store admin role provisioned with the store");

    let (admin, admin_scope) = staff(
        &stack,
        (&actor, &scope),
        store.id,
        Some(admin_role.id),
        "admin@example.com",
    )
    .await;

    // The admin may delegate below their own matrix...
    let cashier = stack
        .roles
        .create(
            &admin,
            &admin_scope,
            NewRole {
                name: "Cashier".into(),
                description: None,
                scope: RoleScope::Store,
                store: Some(store.id),
                permissions: serde_json::json!({
                    "items": { "item_master": "read_only" },
                    "store_management": { "quick_bill": "read_write" },
                }),
            },
        )
        .await
        .unwrap();
    assert_eq!(
        cashier.permissions.level(
            tillworks_auth::Category::Items,
            tillworks_auth::Action::ItemMaster
        ),
        Some(Level::ReadOnly)
    );

    // ...and a cashier-ranked actor cannot delegate above their own.
    let (clerk, clerk_scope) = staff(
        &stack,
        (&actor, &scope),
        store.id,
        Some(cashier.id),
        "clerk@example.com",
    )
    .await;
    let err = stack
        .roles
        .create(
            &clerk,
            &clerk_scope,
            NewRole {
                name: "Shadow Admin".into(),
                description: None,
                scope: RoleScope::Store,
                store: Some(store.id),
                permissions: serde_json::json!({
                    "items": { "item_master": "read_write" },
                }),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    // Non-masters never see the global master role.
    let visible = stack.roles.list(&clerk, &clerk_scope).await.unwrap();
    assert!(visible.iter().all(|role| role.scope == RoleScope::Store));

    // Concurrent editors trip the version token.
    let renamed = stack
        .roles
        .update(
            &admin,
            &admin_scope,
            cashier.id,
            RolePatch {
                name: Some("Till Cashier".into()),
                description: None,
                permissions: None,
                is_active: None,
                version: cashier.version,
            },
        )
        .await
        .unwrap();
    assert_eq!(renamed.version, cashier.version + 1);
    let err = stack
        .roles
        .update(
            &admin,
            &admin_scope,
            cashier.id,
            RolePatch {
                name: Some("Stale".into()),
                description: None,
                permissions: None,
                is_active: None,
                version: cashier.version,
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DomainError::Conflict {
            kind: ConflictKind::StaleVersion,
            ..
        }
    ));
}

#[tokio::test]
async fn foreign_stores_stay_invisible_to_scoped_staff() {
    let stack = stack();
    let (actor, scope) = master(&stack).await;
    let home = seed_store(&stack, (&actor, &scope), "home").await;
    let foreign = seed_store(&stack, (&actor, &scope), "foreign").await;

    let (foreign_invoice, _) = stack
        .invoices
        .create(
            &actor,
            &scope,
            InvoiceStatus::Draft,
            bill(foreign.id, vec![]),
        )
        .await
        .unwrap();

    let (staff_actor, staff_scope) = staff(
        &stack,
        (&actor, &scope),
        home.id,
        None,
        "staff@example.com",
    )
    .await;

    // Cross-store reads conflate to NotFound; naming the store is denied.
    let err = stack
        .invoices
        .get(&staff_scope, foreign_invoice.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::NotFound));
    let err = stack
        .stock
        .report(
            &staff_actor,
            &staff_scope,
            Some(foreign.id),
            BalanceWindow::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Forbidden(_)));

    // The same calls succeed against the home store without naming it.
    let report = stack
        .stock
        .report(&staff_actor, &staff_scope, None, BalanceWindow::default())
        .await
        .unwrap();
    assert_eq!(report.store, home.id);
    let listed = stack
        .invoices
        .list(&staff_actor, &staff_scope, None)
        .await
        .unwrap();
    assert!(listed.is_empty());
}
