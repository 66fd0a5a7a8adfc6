//! Copy-on-write item map.

use crate::item::Item;
use crate::types::ItemId;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Insertion-ordered map from item id to item, shared between versions and
/// contexts.
///
/// Cloning is O(1): the contents sit behind an `Arc` and are only copied on
/// the first write through a shared handle. Two maps that were never written
/// since one was cloned from the other are [`ptr_eq`](Self::ptr_eq), which is
/// what the merge engine uses to detect "unchanged".
///
/// Items are themselves held in `Arc`s, so the identity of an unchanged item
/// survives copies of the map around it.
#[derive(Clone, Default)]
pub struct ItemMap {
    inner: Arc<Inner>,
}

#[derive(Clone, Default)]
struct Inner {
    /// item id -> (insertion sequence, item).
    slots: HashMap<ItemId, (u64, Arc<Item>)>,
    /// insertion sequence -> item id.
    order: BTreeMap<u64, ItemId>,
    next_seq: u64,
}

impl ItemMap {
    /// Creates an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.slots.len()
    }

    /// Returns true if the map holds no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.slots.is_empty()
    }

    /// Returns the item stored under `id`.
    #[must_use]
    pub fn get(&self, id: &str) -> Option<&Arc<Item>> {
        self.inner.slots.get(id).map(|(_, item)| item)
    }

    /// Returns true if an item is stored under `id`.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.inner.slots.contains_key(id)
    }

    /// Iterates items in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Item>> + '_ {
        self.inner
            .order
            .values()
            .filter_map(move |id| self.inner.slots.get(id).map(|(_, item)| item))
    }

    /// Iterates item ids in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = &ItemId> + '_ {
        self.inner.order.values()
    }

    /// Returns true if both maps share the same storage.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Inserts an item under its own id.
    ///
    /// Replacing an existing key keeps its position in the iteration order.
    pub fn insert(&mut self, item: Arc<Item>) -> Option<Arc<Item>> {
        let inner = Arc::make_mut(&mut self.inner);
        let id = item.id().clone();
        match inner.slots.get_mut(&id) {
            Some((_, slot)) => Some(std::mem::replace(slot, item)),
            None => {
                let seq = inner.next_seq;
                inner.next_seq += 1;
                inner.order.insert(seq, id.clone());
                inner.slots.insert(id, (seq, item));
                None
            }
        }
    }

    /// Removes the item stored under `id`.
    pub fn remove(&mut self, id: &str) -> Option<Arc<Item>> {
        if !self.contains(id) {
            return None;
        }
        let inner = Arc::make_mut(&mut self.inner);
        let (seq, item) = inner.slots.remove(id)?;
        inner.order.remove(&seq);
        Some(item)
    }
}

impl fmt::Debug for ItemMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

impl FromIterator<Arc<Item>> for ItemMap {
    fn from_iter<I: IntoIterator<Item = Arc<Item>>>(iter: I) -> Self {
        let mut map = Self::new();
        for item in iter {
            map.insert(item);
        }
        map
    }
}
