//! Fixed-timestep sweep over a collection of independent machines.
//!
//! External happenings enter as queued [`MachineEvent`]s and are dispatched
//! once per tick in a fixed priority order (power change, damage, eject
//! request, restock request) so replays are deterministic. Machines never
//! share state; each advances on its own timers.

use crate::{EjectTarget, VendingMachine};
use smartvend_core::{ActorId, Container, ItemStore, MachineId, SimTick};
use std::collections::BTreeMap;

/// An external happening addressed to one machine.
#[derive(Debug, Clone)]
pub enum MachineEvent {
    /// Power supply changed.
    PowerChanged(bool),
    /// The machine took damage.
    Damaged {
        /// Damage delta for this hit.
        amount: f32,
    },
    /// A user asked for an item.
    EjectRequest {
        /// Requesting actor.
        actor: ActorId,
        /// Item or group to dispense.
        target: EjectTarget,
        /// Whether to throw the item on release.
        throw: bool,
    },
    /// A user offered a bulk container for restocking.
    RestockRequest {
        /// Restocking actor.
        actor: ActorId,
        /// Snapshot of the source container's contents.
        source: Container,
        /// Source kind, checked against the machine's source whitelist.
        source_kind: String,
    },
}

impl MachineEvent {
    /// Dispatch priority within a tick; lower runs first.
    fn priority(&self) -> u8 {
        match self {
            MachineEvent::PowerChanged(_) => 0,
            MachineEvent::Damaged { .. } => 1,
            MachineEvent::EjectRequest { .. } => 2,
            MachineEvent::RestockRequest { .. } => 3,
        }
    }
}

/// Owns machines and drives them on a shared fixed-timestep clock.
pub struct MachineScheduler {
    machines: BTreeMap<MachineId, VendingMachine>,
    queue: Vec<(MachineId, MachineEvent)>,
    tick: SimTick,
}

impl Default for MachineScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl MachineScheduler {
    /// Create an empty scheduler.
    pub fn new() -> Self {
        Self {
            machines: BTreeMap::new(),
            queue: Vec::new(),
            tick: SimTick::ZERO,
        }
    }

    /// Register a machine, keyed by its id.
    pub fn add_machine(&mut self, machine: VendingMachine) {
        self.machines.insert(machine.id(), machine);
    }

    /// Borrow a machine.
    pub fn machine(&self, id: MachineId) -> Option<&VendingMachine> {
        self.machines.get(&id)
    }

    /// Mutably borrow a machine (direct calls outside the event queue).
    pub fn machine_mut(&mut self, id: MachineId) -> Option<&mut VendingMachine> {
        self.machines.get_mut(&id)
    }

    /// Queue an event for the next tick. Events for unknown machines are
    /// dropped at dispatch.
    pub fn submit(&mut self, id: MachineId, event: MachineEvent) {
        self.queue.push((id, event));
    }

    /// Current tick count.
    pub fn current_tick(&self) -> SimTick {
        self.tick
    }

    /// Dispatch queued events in priority order, then advance every machine
    /// by `dt` seconds.
    pub fn tick(&mut self, dt: f32, store: &ItemStore) {
        let mut queue = std::mem::take(&mut self.queue);
        // Stable sort: same-priority events keep submission order.
        queue.sort_by_key(|(_, event)| event.priority());
        for (id, event) in queue {
            let Some(machine) = self.machines.get_mut(&id) else {
                continue;
            };
            match event {
                MachineEvent::PowerChanged(powered) => machine.set_powered(powered),
                MachineEvent::Damaged { amount } => machine.apply_damage(amount),
                MachineEvent::EjectRequest {
                    actor,
                    target,
                    throw,
                } => {
                    let _ = machine.request_eject(actor, target, throw);
                }
                MachineEvent::RestockRequest {
                    actor,
                    source,
                    source_kind,
                } => {
                    let _ = machine.begin_restock(actor, &source, &source_kind, store);
                }
            }
        }

        for machine in self.machines.values_mut() {
            machine.update(dt, store);
        }
        self.tick = self.tick.advance(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MachineConfig, Mode};
    use smartvend_core::TICK_SECONDS;

    fn scheduler_with_machine(id: u64) -> MachineScheduler {
        let mut sched = MachineScheduler::new();
        sched.add_machine(VendingMachine::new(
            MachineId(id),
            MachineConfig::default(),
            7,
        ));
        sched
    }

    #[test]
    fn power_change_outranks_eject_submitted_earlier() {
        let mut store = ItemStore::new();
        let mut sched = scheduler_with_machine(1);
        let id = store.spawn("cola", "Cola");
        sched
            .machine_mut(MachineId(1))
            .unwrap()
            .add_item(ActorId(1), id, &store)
            .unwrap();

        // Eject submitted first, power-off second; power is dispatched first.
        sched.submit(
            MachineId(1),
            MachineEvent::EjectRequest {
                actor: ActorId(1),
                target: EjectTarget::Item(id),
                throw: false,
            },
        );
        sched.submit(MachineId(1), MachineEvent::PowerChanged(false));
        sched.tick(TICK_SECONDS, &store);

        let machine = sched.machine(MachineId(1)).unwrap();
        assert_eq!(machine.mode(), Mode::Idle);
        assert_eq!(machine.stock().total_count(), 1);
    }

    #[test]
    fn same_priority_keeps_submission_order() {
        let mut store = ItemStore::new();
        let mut sched = scheduler_with_machine(1);
        let a = store.spawn("cola", "Cola");
        let b = store.spawn("chips", "Chips");
        let machine = sched.machine_mut(MachineId(1)).unwrap();
        machine.add_item(ActorId(1), a, &store).unwrap();
        machine.add_item(ActorId(1), b, &store).unwrap();

        for target in [EjectTarget::Item(a), EjectTarget::Item(b)] {
            sched.submit(
                MachineId(1),
                MachineEvent::EjectRequest {
                    actor: ActorId(1),
                    target,
                    throw: false,
                },
            );
        }
        sched.tick(TICK_SECONDS, &store);

        // First request won; the second hit a busy machine.
        let machine = sched.machine(MachineId(1)).unwrap();
        assert_eq!(machine.pending_eject(), Some(a));
        assert_eq!(machine.stock().total_count(), 1);
    }

    #[test]
    fn machines_advance_independently() {
        let mut store = ItemStore::new();
        let mut sched = scheduler_with_machine(1);
        sched.add_machine(VendingMachine::new(
            MachineId(2),
            MachineConfig::default(),
            7,
        ));
        let a = store.spawn("cola", "Cola");
        let b = store.spawn("cola", "Cola");
        sched
            .machine_mut(MachineId(1))
            .unwrap()
            .add_item(ActorId(1), a, &store)
            .unwrap();
        sched
            .machine_mut(MachineId(2))
            .unwrap()
            .add_item(ActorId(1), b, &store)
            .unwrap();

        sched.submit(
            MachineId(1),
            MachineEvent::EjectRequest {
                actor: ActorId(1),
                target: EjectTarget::Item(a),
                throw: false,
            },
        );
        sched.tick(TICK_SECONDS, &store);

        assert_eq!(sched.machine(MachineId(1)).unwrap().mode(), Mode::Ejecting);
        assert_eq!(sched.machine(MachineId(2)).unwrap().mode(), Mode::Idle);
        assert_eq!(sched.machine(MachineId(2)).unwrap().stock().total_count(), 1);
        assert_eq!(sched.current_tick(), SimTick(1));
    }

    #[test]
    fn events_for_unknown_machines_are_dropped() {
        let store = ItemStore::new();
        let mut sched = scheduler_with_machine(1);
        sched.submit(MachineId(99), MachineEvent::PowerChanged(false));
        sched.tick(TICK_SECONDS, &store);
        assert!(sched.machine(MachineId(1)).unwrap().is_powered());
    }
}
