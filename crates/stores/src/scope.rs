//! Actor scope resolution over the store forest.

use std::collections::BTreeSet;

use tillworks_auth::{AccessScope, Actor};
use tillworks_core::{DomainError, DomainResult, StoreId};

use crate::tree::StoreTree;

/// Resolve the set of stores an actor may act on.
///
/// Master admins are unrestricted. Everyone else reaches their home store,
/// their explicit grants, and, for parent admins, the whole subtree under the
/// home store.
pub fn resolve_access_scope(actor: &Actor, tree: &StoreTree) -> AccessScope {
    if actor.is_master_admin {
        return AccessScope::unrestricted();
    }
    let mut ids: BTreeSet<StoreId> = actor.accessible_stores.iter().copied().collect();
    if let Some(home) = actor.store {
        ids.insert(home);
        if actor.is_parent_admin {
            ids.extend(tree.subtree(home));
        }
    }
    AccessScope::Stores(ids)
}

/// Pick the store id a request operates on and enforce the boundary.
///
/// Master admins must name the store explicitly; everyone else falls back to
/// their home store and must stay inside `scope`. Row existence is the
/// caller's lookup, this authorizes the id only.
pub fn resolve_store_id(
    actor: &Actor,
    scope: &AccessScope,
    requested: Option<StoreId>,
) -> DomainResult<StoreId> {
    if actor.is_master_admin {
        return requested.ok_or_else(|| DomainError::validation("storeId is required"));
    }
    let resolved = requested
        .or(actor.store)
        .ok_or_else(DomainError::access_denied)?;
    if !scope.allows(resolved) {
        return Err(DomainError::access_denied());
    }
    Ok(resolved)
}
