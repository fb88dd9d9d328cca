//! Item identity and ownership primitives.
//!
//! Items are opaque records addressed by stable identifiers. The [`ItemStore`]
//! arena is the single source of truth for "does this identifier still
//! exist"; [`Container`]s model physical holders (a machine's internal
//! storage, a restock crate) and only track membership.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};

/// Stable identifier for a dispensable item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub u64);

/// Identifier for an actor interacting with a machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActorId(pub u64);

/// Identifier for one machine instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MachineId(pub u64);

/// The two facets of an item the engine is allowed to inspect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Item type identifier (prototype id in the source material).
    pub type_id: String,
    /// Display name; doubles as the stock grouping key.
    pub display_name: String,
}

/// Arena owning every live item record.
///
/// Identifiers are handed out monotonically, so ascending id order is
/// spawn order.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct ItemStore {
    next_id: u64,
    items: HashMap<ItemId, ItemRecord>,
}

impl ItemStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new item record and return its identifier.
    pub fn spawn(&mut self, type_id: impl Into<String>, display_name: impl Into<String>) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        self.items.insert(
            id,
            ItemRecord {
                type_id: type_id.into(),
                display_name: display_name.into(),
            },
        );
        id
    }

    /// Look up a live item record.
    pub fn get(&self, id: ItemId) -> Option<&ItemRecord> {
        self.items.get(&id)
    }

    /// Whether the identifier refers to a live item.
    pub fn contains(&self, id: ItemId) -> bool {
        self.items.contains_key(&id)
    }

    /// Destroy an item record, returning it if it existed.
    pub fn despawn(&mut self, id: ItemId) -> Option<ItemRecord> {
        self.items.remove(&id)
    }

    /// Number of live items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the store holds no items.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// A physical holder of items, tracked by identifier only.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    ids: BTreeSet<ItemId>,
}

impl Container {
    /// Create an empty container.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item; returns false if it was already present.
    pub fn insert(&mut self, id: ItemId) -> bool {
        self.ids.insert(id)
    }

    /// Remove an item; returns false if it was not present.
    pub fn remove(&mut self, id: ItemId) -> bool {
        self.ids.remove(&id)
    }

    /// Whether the container holds the item.
    pub fn contains(&self, id: ItemId) -> bool {
        self.ids.contains(&id)
    }

    /// Iterate held ids in ascending (spawn) order.
    pub fn iter(&self) -> impl Iterator<Item = ItemId> + '_ {
        self.ids.iter().copied()
    }

    /// Number of held items.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the container is empty.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_spawn_and_despawn() {
        let mut store = ItemStore::new();
        let a = store.spawn("cola", "Cola");
        let b = store.spawn("cola", "Cola");
        assert_ne!(a, b);
        assert!(a < b, "ids are monotonic");

        assert_eq!(store.get(a).unwrap().type_id, "cola");
        assert!(store.contains(b));

        let record = store.despawn(a).unwrap();
        assert_eq!(record.display_name, "Cola");
        assert!(!store.contains(a));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn container_membership() {
        let mut store = ItemStore::new();
        let mut container = Container::new();
        let a = store.spawn("cola", "Cola");
        let b = store.spawn("chips", "Chips");

        assert!(container.insert(a));
        assert!(!container.insert(a));
        assert!(container.insert(b));

        assert_eq!(container.iter().collect::<Vec<_>>(), vec![a, b]);
        assert!(container.remove(a));
        assert!(!container.remove(a));
        assert_eq!(container.len(), 1);
    }
}
