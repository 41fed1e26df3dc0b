//! Poll actor - owns the rider registry, the provider session, and the cadence
//!
//! ## Session state machine
//!
//! ```text
//! Disconnected (session = None)
//!   └─ tick → authenticate → Connected on success, retry next tick on failure
//! Connected (session = Some)
//!   └─ tick → poll every rider serially → store → notify
//!        └─ auth rejection → drop session → Disconnected
//! ```
//!
//! ## Cadence
//!
//! The delay to the next cycle is recomputed after every cycle, not fixed at
//! startup: while any tracked rider is online the short [`ONLINE_INTERVAL`]
//! applies, otherwise the configured base interval.
//!
//! ## Failure isolation
//!
//! One rider's fetch or derivation failing never aborts the cycle for the
//! others, and never kills the loop. The loop is the outermost failure
//! boundary and survives indefinite transient failure; only setup-time
//! authentication rejection aborts the subsystem (in [`PollerHandle::spawn`]).

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::time::sleep;
use tracing::{debug, error, instrument, trace, warn};

use crate::{
    RiderId, RiderState,
    config::{Config, ONLINE_INTERVAL},
    error::ProviderError,
    provider::{ProviderSession, TelemetryProvider},
    sampler::{self, TelemetryEvent},
};

use super::messages::{PollerCommand, RiderUpdate};

/// Actor that polls all tracked riders
pub struct PollerActor {
    config: Config,

    /// Provider boundary; the actor never talks HTTP directly.
    provider: Arc<dyn TelemetryProvider>,

    /// Current session; `None` means disconnected.
    session: Option<ProviderSession>,

    /// Rider registry. Single writer; external readers only ever get clones.
    riders: HashMap<RiderId, RiderState>,

    /// Command receiver for control messages
    command_rx: mpsc::Receiver<PollerCommand>,

    /// Broadcast sender for per-rider update notifications
    update_tx: broadcast::Sender<RiderUpdate>,

    /// Broadcast sender for threshold-crossing events
    event_tx: broadcast::Sender<TelemetryEvent>,

    /// Display name for logging
    display_name: String,
}

impl PollerActor {
    fn new(
        config: Config,
        provider: Arc<dyn TelemetryProvider>,
        session: ProviderSession,
        command_rx: mpsc::Receiver<PollerCommand>,
        update_tx: broadcast::Sender<RiderUpdate>,
        event_tx: broadcast::Sender<TelemetryEvent>,
    ) -> Self {
        let display_name = config
            .display
            .clone()
            .unwrap_or_else(|| String::from("ridewatch"));

        let mut actor = Self {
            config,
            provider,
            session: Some(session),
            riders: HashMap::new(),
            command_rx,
            update_tx,
            event_tx,
            display_name,
        };

        for rider_id in actor.config.riders.clone() {
            actor.register_rider(rider_id);
        }
        if actor.config.include_self {
            let self_id = actor
                .session
                .as_ref()
                .map(|session| session.profile.id.clone());
            if let Some(self_id) = self_id {
                actor.register_rider(self_id);
            }
        }

        actor
    }

    /// Register a rider for tracking. Duplicates collapse to one state; a
    /// registered rider lives for the process lifetime.
    fn register_rider(&mut self, rider_id: RiderId) {
        if rider_id.is_empty() {
            return;
        }
        self.riders
            .entry(rider_id)
            .or_insert_with_key(|id| RiderState::new(id.clone()));
    }

    /// Delay until the next cycle, re-evaluated after every cycle.
    fn next_delay(&self) -> Duration {
        if self.riders.values().any(|rider| rider.online) {
            ONLINE_INTERVAL
        } else {
            self.config.base_interval()
        }
    }

    /// Run the actor's main loop
    ///
    /// Runs until a Shutdown command arrives. A cycle always runs to
    /// completion inside its select arm, so shutdown never tears state.
    #[instrument(skip(self), fields(poller = %self.display_name))]
    pub async fn run(mut self) {
        debug!("starting poll actor");

        loop {
            let delay = self.next_delay();
            trace!("next cycle in {delay:?}");

            tokio::select! {
                _ = sleep(delay) => {
                    self.run_cycle().await;
                }

                Some(cmd) = self.command_rx.recv() => {
                    match cmd {
                        PollerCommand::PollNow { respond_to } => {
                            debug!("received PollNow command");
                            self.run_cycle().await;
                            let _ = respond_to.send(());
                        }

                        PollerCommand::GetRider { rider_id, respond_to } => {
                            let _ = respond_to.send(self.riders.get(&rider_id).cloned());
                        }

                        PollerCommand::Snapshot { respond_to } => {
                            let _ = respond_to.send(self.riders.values().cloned().collect());
                        }

                        PollerCommand::Shutdown => {
                            debug!("received shutdown command");
                            break;
                        }
                    }
                }

                else => {
                    warn!("command channel closed, shutting down");
                    break;
                }
            }
        }

        debug!("poll actor stopped");
    }

    /// Run one full poll cycle serially over all tracked riders.
    #[instrument(skip(self), fields(poller = %self.display_name))]
    async fn run_cycle(&mut self) {
        if self.session.is_none() {
            match self.provider.authenticate(&self.config.credentials).await {
                Ok(session) => {
                    debug!("reconnected to the provider");
                    if self.config.include_self {
                        self.register_rider(session.profile.id.clone());
                    }
                    self.session = Some(session);
                }
                Err(e) => {
                    warn!("provider unavailable, skipping this cycle: {e}");
                    return;
                }
            }
        }

        let Some(session) = self.session.clone() else {
            return;
        };

        let rider_ids: Vec<RiderId> = self.riders.keys().cloned().collect();
        for rider_id in rider_ids {
            match self.poll_rider(&session, &rider_id).await {
                Ok(()) => {}

                Err(e) if e.is_auth() => {
                    // Cached session is gone; reconnect on the next tick.
                    warn!("credentials are wrong or expired, dropping session");
                    self.session = None;
                    return;
                }

                Err(ProviderError::NotFound(cause)) => {
                    warn!("{rider_id}: not found upstream, will try later: {cause}");
                }

                Err(e) => {
                    error!("{rider_id}: failed to update rider: {e}");
                }
            }
        }
    }

    /// Fetch, derive and commit one rider's state.
    ///
    /// On any error the previous state stays untouched: the replacement is
    /// committed atomically or not at all.
    async fn poll_rider(
        &mut self,
        session: &ProviderSession,
        rider_id: &RiderId,
    ) -> Result<(), ProviderError> {
        let raw = self.provider.fetch_snapshot(session, rider_id).await?;

        let Some(previous) = self.riders.get(rider_id) else {
            return Ok(());
        };

        let outcome = sampler::sample(previous, raw)?;
        trace!(
            "{rider_id}: online={}, distance={}",
            outcome.state.online, outcome.state.metrics.distance
        );

        self.riders.insert(rider_id.clone(), outcome.state);

        for event in outcome.events {
            // Ignore send errors; no subscribers is fine.
            let _ = self.event_tx.send(event);
        }

        // One notification per rider, not per metric; consumers pull the
        // full state back through the handle.
        let _ = self.update_tx.send(RiderUpdate {
            rider_id: rider_id.clone(),
            timestamp: Utc::now(),
        });

        Ok(())
    }
}

/// Handle for controlling a running poll actor
///
/// Cloneable; all access to the rider registry goes through here.
#[derive(Clone)]
pub struct PollerHandle {
    sender: mpsc::Sender<PollerCommand>,
    update_tx: broadcast::Sender<RiderUpdate>,
    event_tx: broadcast::Sender<TelemetryEvent>,
}

impl PollerHandle {
    /// Authenticate and spawn the poll actor.
    ///
    /// Setup-time authentication failure is fatal and aborts here; once the
    /// actor runs, authentication failures are recoverable (the session is
    /// dropped and reconnection is attempted on the next cycle).
    pub async fn spawn(
        config: Config,
        provider: Arc<dyn TelemetryProvider>,
    ) -> anyhow::Result<Self> {
        let display_name = config.display.clone().unwrap_or_default();
        let session = provider
            .authenticate(&config.credentials)
            .await
            .with_context(|| format!("could not set up poller '{display_name}'"))?;

        let (cmd_tx, cmd_rx) = mpsc::channel(32);
        let (update_tx, _) = broadcast::channel(64);
        let (event_tx, _) = broadcast::channel(64);

        let actor = PollerActor::new(
            config,
            provider,
            session,
            cmd_rx,
            update_tx.clone(),
            event_tx.clone(),
        );

        tokio::spawn(actor.run());

        Ok(Self {
            sender: cmd_tx,
            update_tx,
            event_tx,
        })
    }

    /// Run a poll cycle immediately, bypassing the adaptive delay.
    pub async fn poll_now(&self) -> anyhow::Result<()> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PollerCommand::PollNow { respond_to: tx })
            .await
            .context("failed to send PollNow command")?;

        rx.await.context("failed to receive response")?;
        Ok(())
    }

    /// Get the current state for one rider.
    pub async fn rider(&self, rider_id: impl Into<RiderId>) -> Option<RiderState> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(PollerCommand::GetRider {
                rider_id: rider_id.into(),
                respond_to: tx,
            })
            .await
            .ok()?;

        rx.await.ok()?
    }

    /// Get an immutable snapshot of every tracked rider.
    pub async fn snapshot(&self) -> Vec<RiderState> {
        let (tx, rx) = oneshot::channel();
        if self
            .sender
            .send(PollerCommand::Snapshot { respond_to: tx })
            .await
            .is_err()
        {
            return Vec::new();
        }

        rx.await.unwrap_or_default()
    }

    /// Subscribe to per-rider update notifications.
    pub fn subscribe_updates(&self) -> broadcast::Receiver<RiderUpdate> {
        self.update_tx.subscribe()
    }

    /// Subscribe to threshold-crossing events.
    pub fn subscribe_events(&self) -> broadcast::Receiver<TelemetryEvent> {
        self.event_tx.subscribe()
    }

    /// Gracefully shut down the poll actor.
    pub async fn shutdown(&self) -> anyhow::Result<()> {
        self.sender
            .send(PollerCommand::Shutdown)
            .await
            .context("failed to send Shutdown command")?;
        Ok(())
    }
}
