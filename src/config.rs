use std::time::Duration;

use tracing::trace;

use crate::RiderId;

/// Fast polling interval used while at least one tracked rider is online.
/// Fixed internally; always strictly shorter than the configured interval.
pub const ONLINE_INTERVAL: Duration = Duration::from_secs(2);

const API_ROOT_ENV: &str = "RIDEWATCH_API_ROOT";

const DEFAULT_API_ROOT: &str = "https://us-or-rly101.zwift.com/api";

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Credentials {
    pub id: String,
    pub secret: String,
}

#[derive(Debug, Clone, serde::Deserialize)]
pub struct Config {
    pub credentials: Credentials,

    /// Explicitly tracked rider ids. The account's own rider is added on top
    /// unless `include_self` is disabled.
    #[serde(default)]
    pub riders: Vec<RiderId>,

    #[serde(default = "default_include_self")]
    pub include_self: bool,

    /// Base polling interval in seconds, used while nobody is online.
    #[serde(default = "default_interval")]
    pub interval: u64,

    pub display: Option<String>,

    /// Override for the provider API root, mainly for tests.
    pub api_root: Option<String>,
}

impl Config {
    pub fn base_interval(&self) -> Duration {
        Duration::from_secs(self.interval)
    }

    /// Resolve the provider API root: config file first, then environment,
    /// then the platform default.
    pub fn api_root(&self) -> String {
        self.api_root
            .clone()
            .or_else(|| std::env::var(API_ROOT_ENV).ok())
            .unwrap_or_else(|| DEFAULT_API_ROOT.to_string())
    }

    /// The base interval must stay strictly longer than [`ONLINE_INTERVAL`],
    /// which also rules out a zero interval busy-looping the poller.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.base_interval() <= ONLINE_INTERVAL {
            anyhow::bail!(
                "interval must be greater than {}s, got {}s",
                ONLINE_INTERVAL.as_secs(),
                self.interval
            );
        }
        Ok(())
    }
}

fn default_include_self() -> bool {
    true
}

fn default_interval() -> u64 {
    15
}

pub fn read_config_file(path: &str) -> anyhow::Result<Config> {
    let file_content = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&file_content)
        .map_err(|_| anyhow::anyhow!("Invalid configuration file provided!"))?;
    config.validate()?;
    trace!("loaded config: {config:?}");
    Ok(config)
}
