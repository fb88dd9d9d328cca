//! Non-fatal rejection taxonomy for machine operations.
//!
//! Every condition here is resolved at the point of detection (a notice or
//! deny cue, or a silent ignore). Callers receive the reason as a `Result`
//! they are free to discard; nothing propagates as a program-level failure.

use thiserror::Error;

/// Why a machine refused a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RejectReason {
    /// The access policy denied the requesting actor.
    #[error("actor is not authorized")]
    NotAuthorized,
    /// The requested item or group is not present in stock.
    #[error("requested item is not in stock")]
    InvalidTarget,
    /// The resolved group had zero count (stale reference or race).
    #[error("group is out of stock")]
    OutOfStock,
    /// An eject or deny sequence is already in flight.
    #[error("machine is busy")]
    Busy,
    /// The machine is broken or unpowered.
    #[error("machine is unavailable")]
    Unavailable,
    /// The item (or source container) failed a whitelist check.
    #[error("item type is not accepted")]
    RejectedItem,
}
