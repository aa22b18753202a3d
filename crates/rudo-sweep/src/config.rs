//! Configuration for sweeper threads and the background pool.

use std::num::NonZeroUsize;

use thiserror::Error;

use crate::sweeper::{SweeperThread, MAX_SWEEPER_THREADS};

/// Environment variable enabling concurrent sweeping (`1`/`0`, `true`/`false`).
pub const ENV_CONCURRENT_SWEEPING: &str = "RUDO_CONCURRENT_SWEEPING";
/// Environment variable enabling parallel sweeping.
pub const ENV_PARALLEL_SWEEPING: &str = "RUDO_PARALLEL_SWEEPING";
/// Environment variable forcing the sweeper thread count.
pub const ENV_SWEEPER_THREADS: &str = "RUDO_SWEEPER_THREADS";
/// Environment variable setting the background pool size.
pub const ENV_THREAD_POOL_SIZE: &str = "RUDO_THREAD_POOL_SIZE";

/// A configuration value could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A flag was not a recognizable boolean.
    #[error("{var}: expected a boolean, got {value:?}")]
    InvalidBool {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
    /// A count was not a non-negative integer.
    #[error("{var}: expected a thread count, got {value:?}")]
    InvalidCount {
        /// Variable name.
        var: &'static str,
        /// Offending value.
        value: String,
    },
}

/// Configuration for the sweeper threads.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SweeperConfig {
    /// Sweep on background threads while the mutator keeps running.
    pub concurrent_sweeping: bool,
    /// Sweep on background threads while the mutator waits.
    pub parallel_sweeping: bool,
    /// Forced thread count. `0` sizes from available parallelism.
    pub sweeper_threads: usize,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            concurrent_sweeping: true,
            parallel_sweeping: false,
            sweeper_threads: 0,
        }
    }
}

impl SweeperConfig {
    /// Configuration that sweeps synchronously on the caller.
    #[must_use]
    pub const fn synchronous() -> Self {
        Self {
            concurrent_sweeping: false,
            parallel_sweeping: false,
            sweeper_threads: 0,
        }
    }

    /// Default configuration with a forced thread count.
    #[must_use]
    pub fn with_threads(threads: usize) -> Self {
        Self {
            sweeper_threads: threads,
            ..Default::default()
        }
    }

    /// Read the configuration from `RUDO_*` environment variables, falling
    /// back to defaults for unset ones.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable is set to an unparsable value.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a value is unparsable.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(value) = lookup(ENV_CONCURRENT_SWEEPING) {
            config.concurrent_sweeping = parse_bool(ENV_CONCURRENT_SWEEPING, &value)?;
        }
        if let Some(value) = lookup(ENV_PARALLEL_SWEEPING) {
            config.parallel_sweeping = parse_bool(ENV_PARALLEL_SWEEPING, &value)?;
        }
        if let Some(value) = lookup(ENV_SWEEPER_THREADS) {
            config.sweeper_threads = parse_count(ENV_SWEEPER_THREADS, &value)?;
        }
        Ok(config)
    }

    /// Whether sweeping runs on background threads at all.
    #[must_use]
    pub const fn uses_sweeper_threads(&self) -> bool {
        self.concurrent_sweeping || self.parallel_sweeping
    }

    /// Number of sweeper threads to start given `max_available` cores.
    ///
    /// - neither concurrent nor parallel sweeping: `0`
    /// - a forced count: that count, capped at [`MAX_SWEEPER_THREADS`]
    /// - otherwise [`SweeperThread::number_of_threads`]
    #[must_use]
    pub fn thread_count(&self, max_available: usize) -> usize {
        if !self.uses_sweeper_threads() {
            return 0;
        }
        if self.sweeper_threads > 0 {
            return self.sweeper_threads.min(MAX_SWEEPER_THREADS);
        }
        SweeperThread::number_of_threads(max_available)
    }

    /// Enable or disable concurrent sweeping.
    pub const fn set_concurrent_sweeping(&mut self, enabled: bool) {
        self.concurrent_sweeping = enabled;
    }

    /// Enable or disable parallel sweeping.
    pub const fn set_parallel_sweeping(&mut self, enabled: bool) {
        self.parallel_sweeping = enabled;
    }

    /// Force the number of sweeper threads (`0` to size automatically).
    pub const fn set_sweeper_threads(&mut self, threads: usize) {
        self.sweeper_threads = threads;
    }
}

/// Configuration for the background worker pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PlatformConfig {
    /// Requested worker count. `0` sizes from available parallelism.
    pub thread_pool_size: usize,
}

impl PlatformConfig {
    /// Create a configuration requesting `thread_pool_size` workers.
    #[must_use]
    pub const fn new(thread_pool_size: usize) -> Self {
        Self { thread_pool_size }
    }

    /// Read `RUDO_THREAD_POOL_SIZE`, defaulting to automatic sizing.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the variable is not a count.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Like [`from_env`](Self::from_env) but reading from `lookup`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the value is not a count.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&'static str) -> Option<String>,
    {
        let thread_pool_size = match lookup(ENV_THREAD_POOL_SIZE) {
            Some(value) => parse_count(ENV_THREAD_POOL_SIZE, &value)?,
            None => 0,
        };
        Ok(Self { thread_pool_size })
    }
}

/// Get the number of CPUs available to this process.
#[must_use]
pub fn available_parallelism() -> usize {
    std::thread::available_parallelism().map_or(1, NonZeroUsize::get)
}

fn parse_bool(var: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidBool {
            var,
            value: value.to_owned(),
        }),
    }
}

fn parse_count(var: &'static str, value: &str) -> Result<usize, ConfigError> {
    value
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidCount {
            var,
            value: value.to_owned(),
        })
}
