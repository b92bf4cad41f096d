//! Projector configuration loaded from the environment.

use std::time::Duration;

use thiserror::Error;

use crate::retry::RetryPolicy;

pub const ENV_SUBSCRIPTION: &str = "CARTLEDGER_SUBSCRIPTION";
pub const ENV_RETRY_ATTEMPTS: &str = "CARTLEDGER_RETRY_ATTEMPTS";
pub const ENV_RETRY_BACKOFF_MS: &str = "CARTLEDGER_RETRY_BACKOFF_MS";
pub const ENV_POLL_INTERVAL_MS: &str = "CARTLEDGER_POLL_INTERVAL_MS";

pub const DEFAULT_SUBSCRIPTION: &str = "sub_shopping_carts";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{key} must be a non-negative integer, got '{value}'")]
    InvalidNumber { key: &'static str, value: String },

    #[error("{key} must be at least {min}, got {value}")]
    OutOfRange { key: &'static str, value: u64, min: u64 },

    #[error("{0} must not be empty")]
    Empty(&'static str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectorConfig {
    /// Checkpoint key; distinct names run as independent subscriptions.
    pub subscription_name: String,
    pub retry: RetryPolicy,
    /// How long the worker waits on the feed before checking for shutdown.
    pub poll_interval: Duration,
}

impl Default for ProjectorConfig {
    fn default() -> Self {
        Self {
            subscription_name: DEFAULT_SUBSCRIPTION.to_string(),
            retry: RetryPolicy::default(),
            poll_interval: Duration::from_millis(250),
        }
    }
}

impl ProjectorConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset keys keep their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(name) = lookup(ENV_SUBSCRIPTION) {
            let name = name.trim();
            if name.is_empty() {
                return Err(ConfigError::Empty(ENV_SUBSCRIPTION));
            }
            config.subscription_name = name.to_string();
        }

        if let Some(attempts) = number(&lookup, ENV_RETRY_ATTEMPTS)? {
            if attempts < 1 {
                return Err(ConfigError::OutOfRange {
                    key: ENV_RETRY_ATTEMPTS,
                    value: attempts,
                    min: 1,
                });
            }
            config.retry.max_attempts = attempts.min(u32::MAX as u64) as u32;
        }

        if let Some(ms) = number(&lookup, ENV_RETRY_BACKOFF_MS)? {
            config.retry.base_backoff = Duration::from_millis(ms);
            config.retry.max_backoff = config.retry.max_backoff.max(config.retry.base_backoff);
        }

        if let Some(ms) = number(&lookup, ENV_POLL_INTERVAL_MS)? {
            if ms < 1 {
                return Err(ConfigError::OutOfRange {
                    key: ENV_POLL_INTERVAL_MS,
                    value: ms,
                    min: 1,
                });
            }
            config.poll_interval = Duration::from_millis(ms);
        }

        Ok(config)
    }
}

fn number(lookup: &impl Fn(&str) -> Option<String>, key: &'static str) -> Result<Option<u64>, ConfigError> {
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<u64>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidNumber { key, value: raw }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = ProjectorConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, ProjectorConfig::default());
        assert_eq!(config.subscription_name, "sub_shopping_carts");
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.base_backoff, Duration::from_millis(50));
        assert_eq!(config.retry.max_backoff, Duration::from_secs(2));
        assert_eq!(config.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn overrides_are_read() {
        let config = ProjectorConfig::from_lookup(lookup(&[
            (ENV_SUBSCRIPTION, "carts_v2"),
            (ENV_RETRY_ATTEMPTS, "3"),
            (ENV_RETRY_BACKOFF_MS, "10"),
            (ENV_POLL_INTERVAL_MS, "20"),
        ]))
        .unwrap();

        assert_eq!(config.subscription_name, "carts_v2");
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.base_backoff, Duration::from_millis(10));
        assert_eq!(config.poll_interval, Duration::from_millis(20));
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = ProjectorConfig::from_lookup(lookup(&[(ENV_RETRY_ATTEMPTS, "many")])).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidNumber { key: ENV_RETRY_ATTEMPTS, .. }));

        let err = ProjectorConfig::from_lookup(lookup(&[(ENV_RETRY_ATTEMPTS, "0")])).unwrap_err();
        assert!(matches!(err, ConfigError::OutOfRange { min: 1, .. }));

        let err = ProjectorConfig::from_lookup(lookup(&[(ENV_SUBSCRIPTION, "  ")])).unwrap_err();
        assert_eq!(err, ConfigError::Empty(ENV_SUBSCRIPTION));
    }
}
