//! Message types for the poll actor

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::{RiderId, RiderState};

/// Broadcast after a rider's state has been replaced.
///
/// Pull-based by design: one notification per rider per cycle, no metric
/// payload. Subscribers re-read the full state through the handle, so a
/// lagging subscriber only ever misses intermediate notifications, never
/// ends up with torn data.
#[derive(Debug, Clone)]
pub struct RiderUpdate {
    pub rider_id: RiderId,

    /// When the replacement was committed.
    pub timestamp: DateTime<Utc>,
}

/// Commands that can be sent to the poll actor
#[derive(Debug)]
pub enum PollerCommand {
    /// Run a full poll cycle immediately, bypassing the adaptive delay.
    ///
    /// Used for testing and manual refresh. The acknowledgement fires after
    /// the cycle completed; per-rider failures are absorbed by the cycle.
    PollNow { respond_to: oneshot::Sender<()> },

    /// Get the current state for one rider.
    GetRider {
        rider_id: RiderId,
        respond_to: oneshot::Sender<Option<RiderState>>,
    },

    /// Get an immutable snapshot of every tracked rider.
    Snapshot {
        respond_to: oneshot::Sender<Vec<RiderState>>,
    },

    /// Gracefully shut down the poll actor.
    ///
    /// Any in-flight cycle finishes first; state is never torn.
    Shutdown,
}
