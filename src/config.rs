#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![forbid(unsafe_code)]

use std::time::Duration;

use crate::error::{CoordError, Result};

pub const BUSY_TIMEOUT_VAR: &str = "COORD_BUSY_TIMEOUT_MS";
pub const POLL_INTERVAL_VAR: &str = "COORD_POLL_INTERVAL_MS";
pub const LOCK_RETRIES_VAR: &str = "COORD_LOCK_RETRIES";
pub const RETRY_BACKOFF_VAR: &str = "COORD_RETRY_BACKOFF_MS";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_POLL_INTERVAL_MS: u64 = 500;
const DEFAULT_LOCK_RETRIES: u32 = 5;
const DEFAULT_RETRY_BACKOFF_MS: u64 = 50;

/// Tuning knobs for the coordination store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordConfig {
    /// How long SQLite waits on a locked database before reporting busy.
    pub busy_timeout: Duration,
    /// Sleep between claim attempts in a blocking receive.
    pub poll_interval: Duration,
    /// Extra `BEGIN IMMEDIATE` attempts after the busy timeout expires.
    pub lock_retries: u32,
    /// First backoff between those attempts; doubles up to a cap.
    pub retry_backoff: Duration,
}

impl Default for CoordConfig {
    fn default() -> Self {
        Self {
            busy_timeout: Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            lock_retries: DEFAULT_LOCK_RETRIES,
            retry_backoff: Duration::from_millis(DEFAULT_RETRY_BACKOFF_MS),
        }
    }
}

impl CoordConfig {
    /// # Errors
    /// Returns [`CoordError::ConfigError`] when a variable is set but is not a positive integer.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// # Errors
    /// Returns [`CoordError::ConfigError`] when a variable is set but is not a positive integer.
    pub fn from_lookup<F>(env_lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let busy_timeout_ms =
            positive_or_default(&env_lookup, BUSY_TIMEOUT_VAR, DEFAULT_BUSY_TIMEOUT_MS)?;
        let poll_interval_ms =
            positive_or_default(&env_lookup, POLL_INTERVAL_VAR, DEFAULT_POLL_INTERVAL_MS)?;
        let lock_retries = positive_or_default(
            &env_lookup,
            LOCK_RETRIES_VAR,
            u64::from(DEFAULT_LOCK_RETRIES),
        )?;
        let retry_backoff_ms =
            positive_or_default(&env_lookup, RETRY_BACKOFF_VAR, DEFAULT_RETRY_BACKOFF_MS)?;

        Ok(Self {
            busy_timeout: Duration::from_millis(busy_timeout_ms),
            poll_interval: Duration::from_millis(poll_interval_ms),
            lock_retries: u32::try_from(lock_retries).map_err(|_| {
                CoordError::ConfigError(format!("{LOCK_RETRIES_VAR} is out of range"))
            })?,
            retry_backoff: Duration::from_millis(retry_backoff_ms),
        })
    }
}

fn positive_or_default<F>(env_lookup: &F, key: &str, default: u64) -> Result<u64>
where
    F: Fn(&str) -> Option<String>,
{
    env_lookup(key)
        .map(|raw| raw.trim().to_string())
        .filter(|raw| !raw.is_empty())
        .map_or(Ok(default), |raw| {
            raw.parse::<u64>()
                .ok()
                .filter(|value| *value > 0)
                .ok_or_else(|| {
                    CoordError::ConfigError(format!(
                        "{key} must be a positive integer, got '{raw}'"
                    ))
                })
        })
}
