//! Store-level access scope.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use tillworks_core::StoreId;

/// The set of stores an actor may act on.
///
/// `Unrestricted` is the master-admin case. It is deliberately a distinct
/// variant and not an empty or sentinel set: callers must branch on it
/// explicitly instead of intersecting against "nothing".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "stores", rename_all = "snake_case")]
pub enum AccessScope {
    Unrestricted,
    Stores(BTreeSet<StoreId>),
}

impl AccessScope {
    pub fn unrestricted() -> Self {
        AccessScope::Unrestricted
    }

    pub fn stores(ids: impl IntoIterator<Item = StoreId>) -> Self {
        AccessScope::Stores(ids.into_iter().collect())
    }

    /// Scope that allows nothing (an actor with no home store and no grants).
    pub fn none() -> Self {
        AccessScope::Stores(BTreeSet::new())
    }

    pub fn is_unrestricted(&self) -> bool {
        matches!(self, AccessScope::Unrestricted)
    }

    pub fn allows(&self, store: StoreId) -> bool {
        match self {
            AccessScope::Unrestricted => true,
            AccessScope::Stores(ids) => ids.contains(&store),
        }
    }

    /// The enumerable store set, `None` when unrestricted.
    pub fn as_stores(&self) -> Option<&BTreeSet<StoreId>> {
        match self {
            AccessScope::Unrestricted => None,
            AccessScope::Stores(ids) => Some(ids),
        }
    }
}
