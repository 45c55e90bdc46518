//! The parent/child store forest.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use tillworks_core::StoreId;

/// Queryable snapshot of the store forest, built from `(id, parent)` edges.
///
/// Edge data comes straight from storage and is not trusted to be acyclic:
/// every traversal tracks visited nodes, so corrupted edges degrade into a
/// terminating walk instead of a hang.
#[derive(Debug, Clone, Default)]
pub struct StoreTree {
    nodes: HashSet<StoreId>,
    children: HashMap<StoreId, Vec<StoreId>>,
}

impl StoreTree {
    pub fn from_edges(edges: impl IntoIterator<Item = (StoreId, Option<StoreId>)>) -> Self {
        let mut tree = Self::default();
        for (id, parent) in edges {
            tree.nodes.insert(id);
            if let Some(parent) = parent {
                tree.children.entry(parent).or_default().push(id);
            }
        }
        tree
    }

    pub fn contains(&self, id: StoreId) -> bool {
        self.nodes.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn children(&self, id: StoreId) -> &[StoreId] {
        self.children.get(&id).map_or(&[], Vec::as_slice)
    }

    /// Breadth-first closure: `root` plus every transitive child.
    pub fn subtree(&self, root: StoreId) -> BTreeSet<StoreId> {
        let mut visited = BTreeSet::from([root]);
        let mut frontier = VecDeque::from([root]);
        while let Some(current) = frontier.pop_front() {
            for &child in self.children(current) {
                if visited.insert(child) {
                    frontier.push_back(child);
                }
            }
        }
        visited
    }

    /// Would attaching `store` under `new_parent` make `store` its own
    /// ancestor?
    pub fn would_create_cycle(&self, store: StoreId, new_parent: StoreId) -> bool {
        store == new_parent || self.subtree(store).contains(&new_parent)
    }
}
