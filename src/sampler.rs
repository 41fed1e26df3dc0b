//! Pure snapshot-to-state derivation
//!
//! The sampler never performs I/O. It reconciles one fetched [`RawSnapshot`]
//! against the previous [`RiderState`] and returns the replacement state plus
//! any threshold-crossing events, which is what keeps it independently
//! testable: the poll actor owns all fetching and error handling around it.

use tracing::trace;

use crate::{
    RawProfile, RawSnapshot, RiderMetrics, RiderProfile, RiderState,
    error::{ProviderError, ProviderResult},
    world_name,
};

/// Upstream altitude encoding: `meters = (raw - OFFSET) / SCALE`.
///
/// Platform-specific magic numbers; do not assume they generalize to other
/// data sources.
pub const ALTITUDE_OFFSET: f64 = 9000.0;
pub const ALTITUDE_SCALE: f64 = 2.0;

/// Upstream speed encoding: raw value is in millionths of the base unit.
pub const SPEED_SCALE: f64 = 1_000_000.0;

/// Achievement score units per level; the remainder is the progress within
/// the current level.
pub const SCORE_PER_LEVEL: u64 = 100;

/// Events emitted by a sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryEvent {
    /// The ride-on counter crossed its previous baseline upwards.
    RideOn { rider_id: crate::RiderId, count: u64 },
}

/// Result of reconciling one snapshot: the replacement state and zero or one
/// events produced this cycle.
#[derive(Debug, Clone)]
pub struct SampleOutcome {
    pub state: RiderState,
    pub events: Vec<TelemetryEvent>,
}

/// Reconcile a fetched snapshot against the previous state.
///
/// The profile record is mandatory per sample; the live state is absent
/// whenever the rider is not in an active session, in which case previous
/// metrics are carried over unchanged and only the online flag drops.
/// Ride-on detection only runs against live samples, so a count observed
/// while offline cannot fire or shift the baseline.
pub fn sample(previous: &RiderState, raw: RawSnapshot) -> ProviderResult<SampleOutcome> {
    let Some(profile) = raw.profile else {
        return Err(ProviderError::MissingProfile(previous.id.clone()));
    };

    let ride_on_count = profile.ride_on_count;
    let derived_profile = derive_profile(profile);

    // The ride-on counter belongs to the live session: an offline sample
    // neither fires events nor moves the baseline.
    let mut events = Vec::new();
    let (online, metrics, last_ride_on_count) = match raw.live {
        None => (false, previous.metrics, previous.last_ride_on_count),
        Some(live) => {
            let altitude = (live.altitude - ALTITUDE_OFFSET) / ALTITUDE_SCALE;
            let distance = live.distance;

            if ride_on_count > 0 && ride_on_count > previous.last_ride_on_count {
                trace!(
                    "{}: ride-on count crossed {} -> {ride_on_count}",
                    previous.id, previous.last_ride_on_count
                );
                events.push(TelemetryEvent::RideOn {
                    rider_id: previous.id.clone(),
                    count: ride_on_count,
                });
            }

            (
                true,
                RiderMetrics {
                    heart_rate: live.heart_rate,
                    cadence: live.cadence,
                    power: live.power,
                    speed: live.speed / SPEED_SCALE,
                    altitude,
                    distance,
                    gradient: derive_gradient(&previous.metrics, altitude, distance),
                },
                // A fresh smaller count after a gap means a new session
                // started; the baseline resets silently.
                ride_on_count,
            )
        }
    };

    Ok(SampleOutcome {
        state: RiderState {
            id: previous.id.clone(),
            profile: derived_profile,
            metrics,
            online,
            last_ride_on_count,
        },
        events,
    })
}

/// Derive level and in-level progress for both activity tracks.
///
/// Integer floor/modulo semantics, never rounding: `level * 100 + progress`
/// must reproduce the upstream score exactly.
fn derive_profile(raw: RawProfile) -> RiderProfile {
    let mut attributes = raw.attributes;
    for key in crate::FILTERED_PROFILE_ATTRIBUTES {
        attributes.remove(key);
    }

    RiderProfile {
        first_name: raw.first_name,
        world: raw.world_id.and_then(world_name).map(str::to_string),
        total_experience: raw.total_experience,
        level: raw.achievement_score / SCORE_PER_LEVEL,
        run_level: raw.run_achievement_score / SCORE_PER_LEVEL,
        cycle_progress: raw.achievement_score % SCORE_PER_LEVEL,
        run_progress: raw.run_achievement_score % SCORE_PER_LEVEL,
        attributes,
    }
}

/// Gradient from delta-altitude over delta-distance.
///
/// Only recomputed on a strictly monotonic motion fix: the previous distance
/// must be positive and the new distance must exceed it. Otherwise the
/// previous gradient (default 0.0 before the first fix) is retained.
fn derive_gradient(previous: &RiderMetrics, altitude: f64, distance: f64) -> f64 {
    let delta_distance = distance - previous.distance;
    if previous.distance > 0.0 && delta_distance > 0.0 {
        (altitude - previous.altitude) / delta_distance
    } else {
        previous.gradient
    }
}
