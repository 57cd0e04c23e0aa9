//! Configuration loading and representation.
//!
//! Configuration is read once at startup, from JSON or from `ORDERMGMT_*`
//! environment variables, and decides which capability behaviour is wired in.
//! Nothing inspects the environment after assembly.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::coordinator::CoordinatorConfig;
use crate::retry::{BackoffStrategy, RetryPolicy};

/// Prefix of every environment variable read by [`AppConfig::from_env`].
pub const ENV_PREFIX: &str = "ORDERMGMT_";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value '{value}' for {key}: {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error("invalid JSON configuration: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMode {
    #[default]
    Approve,
    Decline,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShipRetryConfig {
    pub max_attempts: u32,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
    pub strategy: BackoffStrategy,
}

impl Default for ShipRetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 200,
            max_delay_ms: 5_000,
            strategy: BackoffStrategy::Exponential,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub payment_mode: PaymentMode,
    /// Number of initial shipment requests the provider rejects.
    pub shipping_fail_first: u32,
    pub shipping_always_fail: bool,
    /// Start the subscriber that ships orders once they are paid.
    pub auto_ship: bool,
    pub ship_retry: ShipRetryConfig,
    pub max_conflict_retries: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            payment_mode: PaymentMode::Approve,
            shipping_fail_first: 0,
            shipping_always_fail: false,
            auto_ship: true,
            ship_retry: ShipRetryConfig::default(),
            max_conflict_retries: CoordinatorConfig::default().max_conflict_retries,
        }
    }
}

impl AppConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Defaults overridden by `ORDERMGMT_*` process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars())
    }

    /// Defaults overridden by the `ORDERMGMT_*` entries of `vars`; other keys
    /// are ignored.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut config = Self::default();

        for (key, value) in vars {
            let Some(name) = key.as_ref().strip_prefix(ENV_PREFIX) else {
                continue;
            };
            let value = value.as_ref().trim();

            match name {
                "PAYMENT_MODE" => {
                    config.payment_mode = match value.to_ascii_lowercase().as_str() {
                        "approve" => PaymentMode::Approve,
                        "decline" => PaymentMode::Decline,
                        _ => return Err(invalid(name, value, "expected 'approve' or 'decline'")),
                    }
                }
                "SHIPPING_FAIL_FIRST" => config.shipping_fail_first = parse(name, value)?,
                "SHIPPING_ALWAYS_FAIL" => config.shipping_always_fail = parse_bool(name, value)?,
                "AUTO_SHIP" => config.auto_ship = parse_bool(name, value)?,
                "SHIP_RETRY_MAX_ATTEMPTS" => config.ship_retry.max_attempts = parse(name, value)?,
                "SHIP_RETRY_BASE_DELAY_MS" => config.ship_retry.base_delay_ms = parse(name, value)?,
                "SHIP_RETRY_MAX_DELAY_MS" => config.ship_retry.max_delay_ms = parse(name, value)?,
                "SHIP_RETRY_STRATEGY" => {
                    config.ship_retry.strategy =
                        value.parse().map_err(|reason: String| invalid(name, value, &reason))?
                }
                "MAX_CONFLICT_RETRIES" => config.max_conflict_retries = parse(name, value)?,
                _ => {}
            }
        }

        Ok(config)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.ship_retry.max_attempts,
            base_delay: Duration::from_millis(self.ship_retry.base_delay_ms),
            max_delay: Duration::from_millis(self.ship_retry.max_delay_ms),
            strategy: self.ship_retry.strategy,
            jitter: 0.0,
        }
    }

    pub fn coordinator_config(&self) -> CoordinatorConfig {
        CoordinatorConfig {
            max_conflict_retries: self.max_conflict_retries,
        }
    }
}

fn invalid(name: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::Invalid {
        key: format!("{ENV_PREFIX}{name}"),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse<T>(name: &str, value: &str) -> Result<T, ConfigError>
where
    T: core::str::FromStr,
    T::Err: core::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| invalid(name, value, &e.to_string()))
}

fn parse_bool(name: &str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(invalid(name, value, "expected a boolean")),
    }
}
