//! Machinetest: Vend Lifecycle
//!
//! Validates:
//! - Empty machine accepting its first item
//! - Authorized eject request staging and timed release
//! - Stock exhaustion removing the group
//! - Effect stream (vend cue, release without throw)
//! - Broken machine ignoring all requests

use smartvend_core::{ActorId, ItemStore, MachineId, SimTick, TICK_SECONDS};
use smartvend_machine::{
    Effect, EjectTarget, MachineConfig, MachineEvent, MachineScheduler, Mode, SoundCue,
    VendingMachine,
};
use smartvend_testkit::JsonlSink;

#[test]
fn vend_lifecycle_machinetest() {
    let log_path = std::env::temp_dir().join("vend_lifecycle_machinetest.jsonl");
    let mut event_log = JsonlSink::create(&log_path).expect("create event log");

    let mut store = ItemStore::new();
    let mut sched = MachineScheduler::new();
    let machine_id = MachineId(1);
    sched.add_machine(VendingMachine::new(
        machine_id,
        MachineConfig::default(),
        1234,
    ));

    // Phase 1: machine starts empty, powered, unlocked.
    let machine = sched.machine_mut(machine_id).unwrap();
    assert!(machine.is_powered());
    assert!(machine.snapshot().is_empty());

    let i1 = store.spawn("cola", "Cola");
    machine.add_item(ActorId(7), i1, &store).expect("insert cola");

    let listing = machine.snapshot();
    assert_eq!(listing.len(), 1);
    assert_eq!(listing[0].display_name, "Cola");
    assert_eq!(listing[0].count, 1);
    assert_eq!(listing[0].sample_id, i1);
    event_log
        .write_effects(sched.current_tick(), &sched.machine_mut(machine_id).unwrap().drain_effects())
        .expect("log insert effects");

    // Phase 2: authorized eject request stages the dispense immediately.
    sched.submit(
        machine_id,
        MachineEvent::EjectRequest {
            actor: ActorId(7),
            target: EjectTarget::Item(i1),
            throw: false,
        },
    );
    sched.tick(TICK_SECONDS, &store);

    let machine = sched.machine(machine_id).unwrap();
    assert_eq!(machine.mode(), Mode::Ejecting);
    assert!(machine.snapshot().is_empty(), "stock drops at request time");
    assert!(machine.stock().is_empty(), "group removed on exhaustion");
    assert!(machine.container().contains(i1), "unit still physically held");

    let staged = sched.machine_mut(machine_id).unwrap().drain_effects();
    assert!(staged.contains(&Effect::Sound(SoundCue::Vend)));
    event_log
        .write_effects(sched.current_tick(), &staged)
        .expect("log staged effects");

    // Phase 3: after the eject delay the machine returns to idle and
    // releases exactly one unit, without a throw.
    let mut released = Vec::new();
    for _ in 0..14 {
        sched.tick(TICK_SECONDS, &store);
        let effects = sched.machine_mut(machine_id).unwrap().drain_effects();
        event_log
            .write_effects(sched.current_tick(), &effects)
            .expect("log tick effects");
        released.extend(effects.into_iter().filter(|e| matches!(e, Effect::Release { .. })));
    }

    let machine = sched.machine(machine_id).unwrap();
    assert_eq!(machine.mode(), Mode::Idle);
    assert!(!machine.container().contains(i1));
    assert_eq!(released, vec![Effect::Release { item: i1, throw: None }]);
    assert_eq!(sched.current_tick(), SimTick(15));

    // Phase 4: a broken machine leaves all state unchanged.
    let i2 = store.spawn("cola", "Cola");
    let machine = sched.machine_mut(machine_id).unwrap();
    machine.add_item(ActorId(7), i2, &store).expect("restock one");
    machine.set_broken(true);
    machine.drain_effects();

    sched.submit(
        machine_id,
        MachineEvent::EjectRequest {
            actor: ActorId(7),
            target: EjectTarget::Item(i2),
            throw: false,
        },
    );
    sched.tick(TICK_SECONDS, &store);

    let machine = sched.machine_mut(machine_id).unwrap();
    assert_eq!(machine.mode(), Mode::Idle);
    assert_eq!(machine.stock().total_count(), 1);
    assert!(machine.drain_effects().is_empty());
}
