//! Effects emitted by a machine for the host to render.
//!
//! The engine decides *what* sound, visual state, notice, or physical
//! release applies; playing, drawing, and throwing are external concerns.
//! Effects accumulate on the machine and are drained by the host each tick.

use serde::{Deserialize, Serialize};
use smartvend_core::ItemId;

/// Named sound cues a machine can request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SoundCue {
    /// Item successfully staged for dispensing.
    Vend,
    /// Request refused.
    Deny,
    /// Item(s) accepted into stock.
    Insert,
}

/// User-facing notices accompanying a refusal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Notice {
    /// The access policy denied the actor.
    AccessDenied,
    /// The requested item or group is not in stock.
    InvalidItem,
    /// The resolved group had no units left.
    OutOfStock,
}

/// Externally visible machine state, in derivation priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VisualState {
    /// Machine has been broken by damage.
    Broken,
    /// Eject animation in progress.
    Eject,
    /// Deny animation in progress.
    Deny,
    /// Machine is unpowered.
    Off,
    /// Powered and idle.
    Normal,
}

/// Direction and force for a thrown ejection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThrowSpec {
    /// Planar throw direction, each component within the eject range.
    pub direction: (f32, f32),
    /// Throw force handed to the physics collaborator.
    pub force: f32,
}

/// A fire-and-forget request from the machine to the outside world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Effect {
    /// Play a named sound at the machine.
    Sound(SoundCue),
    /// Show a user-facing notice.
    Notice(Notice),
    /// The derived visual state changed.
    Visual(VisualState),
    /// Physically release an item, optionally throwing it.
    Release {
        /// The released item.
        item: ItemId,
        /// Throw vector, or `None` for a plain release into the tray.
        throw: Option<ThrowSpec>,
    },
    /// Stock changed; observers should refresh their listing.
    StockChanged,
    /// A timed restock completed; the host must detach these items from the
    /// source container.
    RestockComplete {
        /// Items now owned by the machine.
        items: Vec<ItemId>,
    },
}
