use std::env;
use tokio::time::Duration;
use tracing::warn;

pub const DEFAULT_NODE_IMAGE: &str = "eqlabs/pathfinder:v0.20.0";
pub const DEFAULT_RESTORE_IMAGE: &str = "ghcr.io/runelabsxyz/pathfinder-snapshotter:latest";
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";
const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 5;

/// Images used when a resource does not pin its own
#[derive(Clone, Debug, PartialEq)]
pub struct ImageDefaults {
    pub node: String,
    pub restore: String,
}

impl Default for ImageDefaults {
    fn default() -> Self {
        Self {
            node: DEFAULT_NODE_IMAGE.to_string(),
            restore: DEFAULT_RESTORE_IMAGE.to_string(),
        }
    }
}

/// Operator settings, read once from the environment at startup
#[derive(Clone, Debug, PartialEq)]
pub struct OperatorConfig {
    pub images: ImageDefaults,
    /// Upper bound of a single readiness or sync probe
    pub probe_timeout: Duration,
    pub bind_address: String,
    /// Instance name reported on published events
    pub instance: Option<String>,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            images: ImageDefaults::default(),
            probe_timeout: Duration::from_secs(DEFAULT_PROBE_TIMEOUT_SECS),
            bind_address: DEFAULT_BIND_ADDRESS.to_string(),
            instance: None,
        }
    }
}

impl OperatorConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let probe_timeout = match lookup("PROBE_TIMEOUT_SECS") {
            Some(raw) => match raw.parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!("Ignoring invalid PROBE_TIMEOUT_SECS value '{}'", raw);
                    defaults.probe_timeout
                }
            },
            None => defaults.probe_timeout,
        };

        Self {
            images: ImageDefaults {
                node: lookup("STARKNET_NODE_IMAGE").unwrap_or(defaults.images.node),
                restore: lookup("STARKNET_RESTORE_IMAGE").unwrap_or(defaults.images.restore),
            },
            probe_timeout,
            bind_address: lookup("BIND_ADDRESS").unwrap_or(defaults.bind_address),
            instance: lookup("CONTROLLER_POD_NAME"),
        }
    }
}
