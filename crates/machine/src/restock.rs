//! Timed restock action.
//!
//! Restocking from a bulk container is gated behind an interruptible wait
//! proportional to the number of acceptable items. Stock only mutates at
//! successful completion; cancellation (actor or machine moved, either took
//! damage) leaves the machine and the source exactly as they were.

use crate::TypeWhitelist;
use serde::{Deserialize, Serialize};
use smartvend_core::{ActorId, Container, ItemId, ItemStore};

/// Wait time contributed by each whitelist-matching item in the source.
pub const RESTOCK_SECONDS_PER_ITEM: f32 = 0.15;

/// One accepted item, with its facets resolved at action start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingInsert {
    /// The item to move into stock on completion.
    pub id: ItemId,
    /// Resolved type id.
    pub type_id: String,
    /// Resolved display name (the grouping key).
    pub display_name: String,
}

/// An in-flight restock wait.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RestockAction {
    /// Actor performing the restock.
    pub actor: ActorId,
    /// Seconds elapsed since the action started.
    pub elapsed: f32,
    /// Total wait, `RESTOCK_SECONDS_PER_ITEM` per accepted item.
    pub duration: f32,
    /// Items staged for insertion at completion.
    pub pending: Vec<PendingInsert>,
}

impl RestockAction {
    /// Start a wait over the given accepted items.
    pub fn new(actor: ActorId, pending: Vec<PendingInsert>) -> Self {
        Self {
            actor,
            elapsed: 0.0,
            duration: RESTOCK_SECONDS_PER_ITEM * pending.len() as f32,
            pending,
        }
    }

    /// Advance the wait; returns true once the duration has elapsed.
    pub fn advance(&mut self, dt: f32) -> bool {
        self.elapsed += dt;
        self.elapsed >= self.duration
    }
}

/// Snapshot the whitelist-matching items of a source container, oldest
/// first. Items failing the whitelist (or no longer alive in the store) are
/// skipped and stay in the source.
pub fn collect_accepted(
    source: &Container,
    whitelist: &TypeWhitelist,
    store: &ItemStore,
) -> Vec<PendingInsert> {
    source
        .iter()
        .filter_map(|id| {
            let record = store.get(id)?;
            whitelist.matches(&record.type_id).then(|| PendingInsert {
                id,
                type_id: record.type_id.clone(),
                display_name: record.display_name.clone(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_scales_with_accepted_count() {
        let mut store = ItemStore::new();
        let mut source = Container::new();
        for _ in 0..4 {
            source.insert(store.spawn("cola", "Cola"));
        }

        let pending = collect_accepted(&source, &TypeWhitelist::Any, &store);
        let mut action = RestockAction::new(ActorId(1), pending);
        assert!((action.duration - 0.6).abs() < 1e-6);

        assert!(!action.advance(0.5));
        assert!(action.advance(0.1));
    }

    #[test]
    fn collect_skips_rejected_and_dead_items() {
        let mut store = ItemStore::new();
        let mut source = Container::new();
        let cola = store.spawn("cola", "Cola");
        let wrench = store.spawn("wrench", "Wrench");
        let ghost = store.spawn("cola", "Cola");
        source.insert(cola);
        source.insert(wrench);
        source.insert(ghost);
        store.despawn(ghost);

        let wl = TypeWhitelist::types(["cola"]);
        let pending = collect_accepted(&source, &wl, &store);
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, cola);
        // The rejected item stays in the source untouched.
        assert!(source.contains(wrench));
    }
}
