#![warn(missing_docs)]
//! Core primitives shared across the workspace.

pub mod error;
pub mod item;

use rand::{rngs::StdRng, SeedableRng};
use serde::{Deserialize, Serialize};

// Re-export commonly used types
pub use error::RejectReason;
pub use item::{ActorId, Container, ItemId, ItemRecord, ItemStore, MachineId};

/// Fixed tick type (20 TPS => 50 ms per tick).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SimTick(pub u64);

impl SimTick {
    /// First tick in any deterministic timeline.
    pub const ZERO: Self = Self(0);

    /// Advance by `delta` ticks.
    pub fn advance(self, delta: u64) -> Self {
        Self(self.0 + delta)
    }
}

/// Seconds of simulated time per tick at 20 TPS.
pub const TICK_SECONDS: f32 = 0.05;

/// Helper to derive a reproducible RNG scoped to one machine.
///
/// Two machines sharing a world seed still get independent streams.
pub fn machine_rng(world_seed: u64, machine: MachineId) -> StdRng {
    let seed = world_seed ^ machine.0.rotate_left(17);
    StdRng::seed_from_u64(seed)
}
