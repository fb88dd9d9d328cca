//! smartvend - a deterministic stock-backed dispensing machine engine
//!
//! Demo binary: loads a machine definition, restocks it from a crate, and
//! scripts a few requests against it, logging every emitted effect.

mod config;

use anyhow::Result;
use config::MachineFileConfig;
use smartvend_core::{ActorId, Container, ItemStore, MachineId, TICK_SECONDS};
use smartvend_machine::{
    Effect, EjectTarget, MachineEvent, MachineScheduler, VendingMachine,
};
use tracing::info;

const MACHINE: MachineId = MachineId(1);
const CUSTOMER: ActorId = ActorId(7);

fn main() -> Result<()> {
    // Initialize tracing with INFO level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting smartvend v{}", env!("CARGO_PKG_VERSION"));

    let cfg = MachineFileConfig::load();
    let mut store = ItemStore::new();
    let mut sched = MachineScheduler::new();
    sched.add_machine(VendingMachine::new(MACHINE, cfg.machine_config(), cfg.seed));

    // Seed a supply crate from the stock manifest.
    let mut supply = Container::new();
    for line in &cfg.stock {
        for _ in 0..line.count {
            supply.insert(store.spawn(line.type_id.clone(), line.display_name.clone()));
        }
    }
    info!(items = supply.len(), "supply crate ready");

    // Restock the machine and wait out the timed action.
    sched.submit(
        MACHINE,
        MachineEvent::RestockRequest {
            actor: CUSTOMER,
            source: supply.clone(),
            source_kind: "crate".into(),
        },
    );
    run_until_settled(&mut sched, &store, &mut supply, 200);

    let listing = sched.machine(MACHINE).expect("machine").snapshot();
    for entry in &listing {
        info!(
            name = %entry.display_name,
            type_id = %entry.type_id,
            count = entry.count,
            "in stock"
        );
    }

    // Buy the first listed item.
    if let Some(entry) = listing.first() {
        sched.submit(
            MACHINE,
            MachineEvent::EjectRequest {
                actor: CUSTOMER,
                target: EjectTarget::Item(entry.sample_id),
                throw: false,
            },
        );
        run_until_settled(&mut sched, &store, &mut supply, 200);
    }

    // Someone kicks the machine.
    sched.submit(MACHINE, MachineEvent::Damaged { amount: 5.0 });
    run_until_settled(&mut sched, &store, &mut supply, 200);

    let machine = sched.machine(MACHINE).expect("machine");
    let value = machine.stock_value(&|type_id: &str| match type_id {
        "cola" => 2.5,
        "chips" => 4.0,
        _ => 1.0,
    });
    info!(
        units = machine.stock().total_count(),
        value,
        "final stock"
    );
    Ok(())
}

/// Tick the scheduler until the machine is idle with nothing pending,
/// draining effects as the host would.
fn run_until_settled(
    sched: &mut MachineScheduler,
    store: &ItemStore,
    supply: &mut Container,
    max_ticks: u32,
) {
    for _ in 0..max_ticks {
        sched.tick(TICK_SECONDS, store);
        let machine = sched.machine_mut(MACHINE).expect("machine");
        for effect in machine.drain_effects() {
            apply_effect(&effect, supply);
        }
        let machine = sched.machine(MACHINE).expect("machine");
        if machine.mode() == smartvend_machine::Mode::Idle && !machine.restock_in_progress() {
            break;
        }
    }
}

/// Host-side rendering of machine effects: here, just logs, plus the
/// container bookkeeping the engine delegates outward.
fn apply_effect(effect: &Effect, supply: &mut Container) {
    match effect {
        Effect::Sound(cue) => info!(?cue, "sound"),
        Effect::Notice(notice) => info!(?notice, "notice"),
        Effect::Visual(state) => info!(?state, "visual state"),
        Effect::Release { item, throw } => info!(item = item.0, thrown = throw.is_some(), "released"),
        Effect::StockChanged => info!("stock listing changed"),
        Effect::RestockComplete { items } => {
            for id in items {
                supply.remove(*id);
            }
            info!(moved = items.len(), "restock complete");
        }
    }
}
