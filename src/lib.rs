pub mod actors;
pub mod config;
pub mod error;
pub mod provider;
pub mod sampler;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Opaque rider identifier as handed out by the platform.
pub type RiderId = String;

/// Profile attribute keys that are provider-internal or privacy-sensitive and
/// must never leave the process through the published state surface.
pub const FILTERED_PROFILE_ATTRIBUTES: [&str; 15] = [
    "privateAttributes",
    "publicAttributes",
    "connectedToStrava",
    "connectedToTrainingPeaks",
    "connectedToTodaysPlan",
    "connectedToUnderArmour",
    "connectedToWithings",
    "connectedToFitbit",
    "connectedToGarmin",
    "connectedToRuntastic",
    "mixpanelDistinctId",
    "bigCommerceId",
    "avantlinkId",
    "userAgent",
    "launchedGameClient",
];

/// Map a platform world id to its display name.
pub fn world_name(world_id: u32) -> Option<&'static str> {
    match world_id {
        1 => Some("Watopia"),
        2 => Some("Richmond"),
        3 => Some("London"),
        4 => Some("New York"),
        5 => Some("Innsbruck"),
        6 => Some("Bologna"),
        7 => Some("Yorkshire"),
        8 => Some("Crit City"),
        9 => Some("Makuri Islands"),
        10 => Some("France"),
        11 => Some("Paris"),
        _ => None,
    }
}

/// Raw profile record as returned by the platform.
///
/// Known fields are typed; everything else the upstream sends lands in the
/// flattened `attributes` bag and is filtered before exposure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawProfile {
    pub id: RiderId,

    #[serde(default)]
    pub first_name: Option<String>,

    #[serde(default)]
    pub world_id: Option<u32>,

    /// Cumulative achievement score; level and progress derive from it.
    #[serde(default)]
    pub achievement_score: u64,

    /// Same, for the running activity track.
    #[serde(default)]
    pub run_achievement_score: u64,

    #[serde(default)]
    pub total_experience: u64,

    /// Ride-on counter for the current activity. Only ever increases during
    /// a session; a fresh smaller value means a new session started.
    #[serde(default)]
    pub ride_on_count: u64,

    /// Whether the rider is currently in an active session.
    #[serde(default)]
    pub riding: bool,

    #[serde(flatten)]
    pub attributes: Map<String, Value>,
}

/// Raw live-state record, only available while a rider is in a session.
///
/// `speed` and `altitude` arrive in the platform's internal encoding and are
/// rescaled by the sampler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawLiveState {
    #[serde(default)]
    pub heart_rate: f64,

    #[serde(default)]
    pub cadence: f64,

    #[serde(default)]
    pub power: f64,

    #[serde(default)]
    pub speed: f64,

    #[serde(default)]
    pub altitude: f64,

    #[serde(default)]
    pub distance: f64,
}

/// One fetched snapshot for a rider. An absent live state means the rider is
/// not currently in a session; an absent profile is an upstream fault.
#[derive(Debug, Clone, Default)]
pub struct RawSnapshot {
    pub profile: Option<RawProfile>,
    pub live: Option<RawLiveState>,
}

/// Derived profile values, fully replaced on every successful sample.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiderProfile {
    pub first_name: Option<String>,
    pub world: Option<String>,
    pub total_experience: u64,
    pub level: u64,
    pub run_level: u64,
    pub cycle_progress: u64,
    pub run_progress: u64,

    /// Remaining upstream profile attributes with provider-internal and
    /// privacy-sensitive keys removed.
    pub attributes: Map<String, Value>,
}

/// Derived numeric telemetry from the most recent live sample.
///
/// Values are retained, not zeroed, when a rider goes offline, so "last
/// known" readings stay visible until overwritten. `distance` and `altitude`
/// are only ever written together so gradient derivation always compares
/// same-epoch values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct RiderMetrics {
    pub heart_rate: f64,
    pub speed: f64,
    pub cadence: f64,
    pub power: f64,
    pub altitude: f64,
    pub distance: f64,
    pub gradient: f64,
}

/// Last-known state for one tracked rider.
///
/// Created once at registration, then replaced atomically by the poll actor
/// after each successful sample. There is exactly one writer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RiderState {
    pub id: RiderId,
    pub profile: RiderProfile,
    pub metrics: RiderMetrics,
    pub online: bool,

    /// Baseline for ride-on threshold detection. Never decreases within a
    /// continuous session.
    pub last_ride_on_count: u64,
}

impl RiderState {
    pub fn new(id: impl Into<RiderId>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }
}

/// The enumerated published state surface.
///
/// Downstream consumers address values by kind instead of by attribute name,
/// so there is no stringly-typed dispatch between them and the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    Online,
    HeartRate,
    Speed,
    Cadence,
    Power,
    Altitude,
    Distance,
    Gradient,
    Level,
    RunLevel,
    CycleProgress,
    RunProgress,
}

/// A published value is either numeric or boolean; the kind tag decides which.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Bool(bool),
}

impl MetricKind {
    pub const ALL: [MetricKind; 12] = [
        MetricKind::Online,
        MetricKind::HeartRate,
        MetricKind::Speed,
        MetricKind::Cadence,
        MetricKind::Power,
        MetricKind::Altitude,
        MetricKind::Distance,
        MetricKind::Gradient,
        MetricKind::Level,
        MetricKind::RunLevel,
        MetricKind::CycleProgress,
        MetricKind::RunProgress,
    ];

    /// Whether this kind publishes a boolean instead of a number.
    pub fn is_binary(self) -> bool {
        matches!(self, MetricKind::Online)
    }

    /// Extract this kind's current value from a rider state.
    pub fn extract(self, state: &RiderState) -> MetricValue {
        match self {
            MetricKind::Online => MetricValue::Bool(state.online),
            MetricKind::HeartRate => MetricValue::Number(state.metrics.heart_rate),
            MetricKind::Speed => MetricValue::Number(state.metrics.speed),
            MetricKind::Cadence => MetricValue::Number(state.metrics.cadence),
            MetricKind::Power => MetricValue::Number(state.metrics.power),
            MetricKind::Altitude => MetricValue::Number(state.metrics.altitude),
            MetricKind::Distance => MetricValue::Number(state.metrics.distance),
            MetricKind::Gradient => MetricValue::Number(state.metrics.gradient),
            MetricKind::Level => MetricValue::Number(state.profile.level as f64),
            MetricKind::RunLevel => MetricValue::Number(state.profile.run_level as f64),
            MetricKind::CycleProgress => MetricValue::Number(state.profile.cycle_progress as f64),
            MetricKind::RunProgress => MetricValue::Number(state.profile.run_progress as f64),
        }
    }
}
