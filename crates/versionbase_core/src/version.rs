//! Version DAG node.

use crate::item::ItemMap;
use crate::types::VersionId;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::Arc;

/// An immutable node of the version DAG.
///
/// The identity and parent linkage of a version never change after creation.
/// Item CRUD scoped to a context produces a new `Version` value with the same
/// id and parents and a different item map; the old value stays reachable from
/// every context that still holds it.
#[derive(Clone)]
pub struct Version {
    id: VersionId,
    parents: Vec<Arc<Version>>,
    items: ItemMap,
}

impl Version {
    /// Creates a root version with no parents and no items.
    #[must_use]
    pub fn root(id: VersionId) -> Self {
        Self {
            id,
            parents: Vec::new(),
            items: ItemMap::new(),
        }
    }

    /// Creates a child version that starts with `items`, usually the data
    /// parent's item map.
    #[must_use]
    pub fn child(id: VersionId, parents: Vec<Arc<Version>>, items: ItemMap) -> Self {
        Self { id, parents, items }
    }

    /// Returns the version id.
    #[must_use]
    pub fn id(&self) -> &VersionId {
        &self.id
    }

    /// Returns the parents in declaration order.
    #[must_use]
    pub fn parents(&self) -> &[Arc<Version>] {
        &self.parents
    }

    /// Returns the parent ids in declaration order.
    pub fn parent_ids(&self) -> impl Iterator<Item = &VersionId> + '_ {
        self.parents.iter().map(|parent| &parent.id)
    }

    /// Returns true if this version has no parents.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.parents.is_empty()
    }

    /// Returns the item map.
    #[must_use]
    pub fn items(&self) -> &ItemMap {
        &self.items
    }

    /// Returns every ancestor id, nearest first, each reported once.
    #[must_use]
    pub fn ancestor_ids(&self) -> Vec<VersionId> {
        let mut seen: HashSet<&VersionId> = HashSet::new();
        let mut queue: VecDeque<&Version> = self.parents.iter().map(Arc::as_ref).collect();
        let mut ancestors = Vec::new();

        while let Some(version) = queue.pop_front() {
            if !seen.insert(&version.id) {
                continue;
            }
            ancestors.push(version.id.clone());
            queue.extend(version.parents.iter().map(Arc::as_ref));
        }

        ancestors
    }

    /// Returns a copy of this version holding `items`.
    #[must_use]
    pub(crate) fn with_items(&self, items: ItemMap) -> Self {
        Self {
            id: self.id.clone(),
            parents: self.parents.clone(),
            items,
        }
    }

    pub(crate) fn items_mut(&mut self) -> &mut ItemMap {
        &mut self.items
    }
}

impl fmt::Debug for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Version")
            .field("id", &self.id)
            .field("parents", &self.parent_ids().collect::<Vec<_>>())
            .field("items", &self.items.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(id: &str, parents: &[&Arc<Version>]) -> Arc<Version> {
        let parents: Vec<_> = parents.iter().map(|p| Arc::clone(*p)).collect();
        if parents.is_empty() {
            Arc::new(Version::root(VersionId::from(id)))
        } else {
            let items = parents[0].items().clone();
            Arc::new(Version::child(VersionId::from(id), parents, items))
        }
    }

    #[test]
    fn root_has_no_parents() {
        let a = node("A", &[]);
        assert!(a.is_root());
        assert!(a.ancestor_ids().is_empty());
    }

    #[test]
    fn ancestors_are_breadth_first_and_deduplicated() {
        // A <- B, A <- C, (B, C) <- D
        let a = node("A", &[]);
        let b = node("B", &[&a]);
        let c = node("C", &[&a]);
        let d = node("D", &[&b, &c]);

        let parents: Vec<_> = d.parent_ids().map(VersionId::as_str).collect();
        assert_eq!(parents, vec!["B", "C"]);

        let ancestors: Vec<_> = d.ancestor_ids().into_iter().map(String::from).collect();
        assert_eq!(ancestors, vec!["B", "C", "A"]);
    }

    #[test]
    fn child_shares_parent_items() {
        let a = node("A", &[]);
        let b = node("B", &[&a]);
        assert!(b.items().ptr_eq(a.items()));
    }
}
