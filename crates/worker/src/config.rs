use std::time::Duration;

use rota_core::generation::{GenerationConfig, TieBreak};
use rota_core::swap::ReasonPolicy;

/// Configuration problems found while reading the environment or a request.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} has invalid value {value:?}: {reason}")]
    InvalidVar {
        var: &'static str,
        value: String,
        reason: String,
    },

    #[error("Invalid generation request: {0}")]
    Request(#[from] serde_json::Error),
}

/// Service configuration loaded from environment variables.
///
/// Every field has a default suitable for local use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// How long an operation may wait for its template and instance locks.
    pub lock_timeout: Duration,
    /// Broadcast buffer size for the event bus.
    pub event_capacity: usize,
    /// Tie-break applied to generation requests that do not name one.
    pub default_tie_break: TieBreak,
    /// Whether swap requests must carry a reason.
    pub swap_reason: ReasonPolicy,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_millis(5_000),
            event_capacity: rota_events::bus::DEFAULT_CAPACITY,
            default_tie_break: TieBreak::RotationOrder,
            swap_reason: ReasonPolicy::Optional,
        }
    }
}

impl WorkerConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                  | Default          |
    /// |--------------------------|------------------|
    /// | `ROTA_LOCK_TIMEOUT_MS`   | `5000`           |
    /// | `ROTA_EVENT_CAPACITY`    | `1024`           |
    /// | `ROTA_DEFAULT_TIE_BREAK` | `rotation_order` |
    /// | `ROTA_SWAP_REASON`       | `optional`       |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reading from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let lock_timeout = match lookup("ROTA_LOCK_TIMEOUT_MS") {
            Some(raw) => Duration::from_millis(parse_number("ROTA_LOCK_TIMEOUT_MS", &raw)?),
            None => defaults.lock_timeout,
        };

        let event_capacity = match lookup("ROTA_EVENT_CAPACITY") {
            Some(raw) => {
                let capacity = parse_number("ROTA_EVENT_CAPACITY", &raw)?;
                usize::try_from(capacity).map_err(|e| invalid("ROTA_EVENT_CAPACITY", &raw, e))?
            }
            None => defaults.event_capacity,
        };

        let default_tie_break = match lookup("ROTA_DEFAULT_TIE_BREAK") {
            Some(raw) => parse_enum("ROTA_DEFAULT_TIE_BREAK", &raw)?,
            None => defaults.default_tie_break,
        };

        let swap_reason = match lookup("ROTA_SWAP_REASON") {
            Some(raw) => parse_enum("ROTA_SWAP_REASON", &raw)?,
            None => defaults.swap_reason,
        };

        Ok(Self {
            lock_timeout,
            event_capacity,
            default_tie_break,
            swap_reason,
        })
    }

    /// Parse a JSON generation request, filling in the configured tie-break
    /// when the request does not name one.
    pub fn generation_request(
        &self,
        mut raw: serde_json::Value,
    ) -> Result<GenerationConfig, ConfigError> {
        if let Some(object) = raw.as_object_mut() {
            if !object.contains_key("tie_break") {
                object.insert(
                    "tie_break".to_string(),
                    serde_json::to_value(self.default_tie_break)?,
                );
            }
        }
        Ok(serde_json::from_value(raw)?)
    }
}

fn parse_number(var: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse().map_err(|e| invalid(var, raw, e))
}

/// Parse a snake_case enum value the same way serde reads it from JSON.
fn parse_enum<T: serde::de::DeserializeOwned>(
    var: &'static str,
    raw: &str,
) -> Result<T, ConfigError> {
    serde_json::from_value(serde_json::Value::String(raw.trim().to_string()))
        .map_err(|e| invalid(var, raw, e))
}

fn invalid(var: &'static str, raw: &str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidVar {
        var,
        value: raw.to_string(),
        reason: reason.to_string(),
    }
}
