//! Actor-based polling engine
//!
//! The poll scheduler runs as an independent tokio task communicating over
//! channels:
//!
//! 1. **Commands**: an mpsc channel carries control messages (poll now, state
//!    queries, shutdown) into the actor.
//! 2. **Notifications**: after a rider's state is replaced, a `RiderUpdate`
//!    is broadcast. The notification carries no payload beyond the rider id;
//!    consumers pull the full current state back through the handle.
//! 3. **Events**: threshold-crossing events (ride-ons) go out on a second
//!    broadcast channel.
//!
//! There is exactly one writer to the rider registry (the actor), so readers
//! never observe a half-written state.

pub mod messages;
pub mod poller;
