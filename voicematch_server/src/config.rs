//! Server configuration, loaded from environment variables.

use crate::sessions::RelayPolicy;
use std::collections::HashMap;
use std::env;
use std::net::SocketAddr;
use thiserror::Error;

/// Default listen address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

/// Default upper bound on a single WebSocket message, in bytes.
pub const DEFAULT_MAX_MESSAGE_BYTES: usize = 64 * 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    /// Address the WebSocket listener binds to (default: "0.0.0.0:3000").
    pub bind_address: SocketAddr,

    /// Which relays are accepted (default: open).
    pub relay_policy: RelayPolicy,

    /// Largest accepted WebSocket message (default: 64 KiB).
    pub max_message_bytes: usize,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {reason}")]
    InvalidValue { key: String, reason: String },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 3000)),
            relay_policy: RelayPolicy::Open,
            max_message_bytes: DEFAULT_MAX_MESSAGE_BYTES,
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("VOICEMATCH_BIND_ADDRESS")
            .map(String::as_str)
            .unwrap_or(DEFAULT_BIND_ADDRESS)
            .parse()
            .map_err(|e: std::net::AddrParseError| invalid("VOICEMATCH_BIND_ADDRESS", e))?;

        let relay_policy = match vars.get("VOICEMATCH_RELAY_POLICY") {
            Some(raw) => raw
                .parse()
                .map_err(|e: String| invalid("VOICEMATCH_RELAY_POLICY", e))?,
            None => RelayPolicy::default(),
        };

        let max_message_bytes = match vars.get("VOICEMATCH_MAX_MESSAGE_BYTES") {
            Some(raw) => {
                let bytes: usize = raw
                    .parse()
                    .map_err(|e: std::num::ParseIntError| {
                        invalid("VOICEMATCH_MAX_MESSAGE_BYTES", e)
                    })?;
                if bytes == 0 {
                    return Err(invalid("VOICEMATCH_MAX_MESSAGE_BYTES", "must be positive"));
                }
                bytes
            }
            None => DEFAULT_MAX_MESSAGE_BYTES,
        };

        Ok(Config {
            bind_address,
            relay_policy,
            max_message_bytes,
        })
    }
}

fn invalid(key: &str, reason: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}
