//! Stock table: grouping of held items into countable same-name stacks.
//!
//! Groups are keyed by display name (two item types sharing a name merge
//! into one group) and kept sorted by name for deterministic listing. The
//! table mirrors its flat id set into the machine's physical [`Container`],
//! with one deliberate exception documented on [`StockTable::remove_one_at`].

use serde::{Deserialize, Serialize};
use smartvend_core::{Container, ItemId};
use std::collections::BTreeSet;

/// A stack of same-name items, oldest first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockGroup {
    /// Member item ids, ordered oldest-inserted first. The head is the next
    /// unit to dispense.
    pub ids: Vec<ItemId>,
    /// Grouping key shown to users.
    pub display_name: String,
    /// Type id of the first item folded into this group.
    pub type_id: String,
    /// Number of units; always equals `ids.len()` between mutations.
    pub count: u32,
}

impl StockGroup {
    /// A one-item group, as produced during bulk restock before merging.
    pub fn single(id: ItemId, type_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            ids: vec![id],
            display_name: display_name.into(),
            type_id: type_id.into(),
            count: 1,
        }
    }
}

/// One row of the read-only stock listing handed to observers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockEntry {
    /// Group display name.
    pub display_name: String,
    /// Group type id.
    pub type_id: String,
    /// Units available.
    pub count: u32,
    /// The id that would dispense next, usable as an eject target.
    pub sample_id: ItemId,
}

/// Owns a machine's full set of stock groups plus the flat id set used for
/// fast membership checks.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct StockTable {
    groups: Vec<StockGroup>,
    contained: BTreeSet<ItemId>,
}

impl StockTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one item, appending to the name-matching group or creating a new
    /// one. Registers the id in the flat set and the physical container.
    pub fn insert(
        &mut self,
        id: ItemId,
        type_id: &str,
        display_name: &str,
        container: &mut Container,
    ) {
        self.contained.insert(id);
        container.insert(id);
        if let Some(group) = self
            .groups
            .iter_mut()
            .find(|g| g.display_name == display_name)
        {
            group.ids.push(id);
            group.count += 1;
        } else {
            self.groups
                .push(StockGroup::single(id, type_id, display_name));
            self.sort_by_name();
        }
    }

    /// Index of the first group holding `id`, if any. Linear scan.
    pub fn position_by_item(&self, id: ItemId) -> Option<usize> {
        self.groups.iter().position(|g| g.ids.contains(&id))
    }

    /// Index of the first group of the given type, if any.
    pub fn position_by_type(&self, type_id: &str) -> Option<usize> {
        self.groups.iter().position(|g| g.type_id == type_id)
    }

    /// Pop the oldest id from the group at `idx`, removing it from the flat
    /// set and deleting the group when it empties.
    ///
    /// The physical container is *not* touched here: an accepted eject is
    /// logically gone from stock immediately, but stays physically held
    /// until the eject timer releases it.
    pub fn remove_one_at(&mut self, idx: usize) -> Option<ItemId> {
        let group = self.groups.get_mut(idx)?;
        if group.ids.is_empty() {
            return None;
        }
        let id = group.ids.remove(0);
        group.count -= 1;
        self.contained.remove(&id);
        if group.count == 0 {
            self.groups.remove(idx);
        }
        Some(id)
    }

    /// Unlink an entire group, removing every member id from the flat set
    /// and the physical container in the same step. Returns the removed ids
    /// oldest-first. Used by forced ejection.
    pub fn remove_group_at(&mut self, idx: usize, container: &mut Container) -> Vec<ItemId> {
        if idx >= self.groups.len() {
            return Vec::new();
        }
        let group = self.groups.remove(idx);
        for id in &group.ids {
            self.contained.remove(id);
            container.remove(*id);
        }
        group.ids
    }

    /// Fold freshly-built raw groups (one per item, as produced during bulk
    /// restock) into the canonical by-name representation, registering every
    /// id in the flat set and the container, then re-sort by name.
    pub fn merge(&mut self, raw: Vec<StockGroup>, container: &mut Container) {
        for mut incoming in raw {
            for id in &incoming.ids {
                self.contained.insert(*id);
                container.insert(*id);
            }
            if let Some(group) = self
                .groups
                .iter_mut()
                .find(|g| g.display_name == incoming.display_name)
            {
                group.count += incoming.count;
                group.ids.append(&mut incoming.ids);
            } else {
                self.groups.push(incoming);
            }
        }
        self.sort_by_name();
    }

    /// Groups with at least one unit, in name order.
    pub fn available(&self) -> impl Iterator<Item = &StockGroup> + '_ {
        self.groups.iter().filter(|g| g.count > 0)
    }

    /// Read-only listing for observers, in name order.
    pub fn snapshot(&self) -> Vec<StockEntry> {
        self.available()
            .map(|g| StockEntry {
                display_name: g.display_name.clone(),
                type_id: g.type_id.clone(),
                count: g.count,
                sample_id: g.ids[0],
            })
            .collect()
    }

    /// All groups, in name order.
    pub fn groups(&self) -> &[StockGroup] {
        &self.groups
    }

    /// Flat set of every id currently counted as stock.
    pub fn contained_ids(&self) -> &BTreeSet<ItemId> {
        &self.contained
    }

    /// Whether the id is counted as stock.
    pub fn contains(&self, id: ItemId) -> bool {
        self.contained.contains(&id)
    }

    /// Whether no stock is held.
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    /// Total units across all groups.
    pub fn total_count(&self) -> u32 {
        self.groups.iter().map(|g| g.count).sum()
    }

    fn sort_by_name(&mut self) {
        self.groups
            .sort_by(|a, b| a.display_name.cmp(&b.display_name));
    }
}
