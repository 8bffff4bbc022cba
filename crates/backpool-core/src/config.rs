//! Pool configuration that downstream crates can serialize/deserialize.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Largest target a pool will accept; bigger requests are clamped.
pub const MAX_TARGET_SIZE: i64 = (1_i64 << 34) - 1;

pub const DEFAULT_MAX_POOL_SIZE: usize = 27;
pub const DEFAULT_INITIAL_INTERVAL_MS: u64 = 500;
pub const DEFAULT_RANDOMIZATION_FACTOR: f64 = 0.5;
pub const DEFAULT_MAX_ELAPSED_TIME_MS: u64 = 15_000;
pub const DEFAULT_DRAIN_INTERVAL_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Overall memory ceiling (bytes) that fullness is measured against.
    pub target_size_bytes: i64,

    /// Bound on the free list; also divides the target into the per-buffer limit.
    pub max_pool_size: usize,

    /// Starting backoff interval.
    pub initial_interval_ms: u64,

    /// Spread of the uniform sample around the current interval.
    pub randomization_factor: f64,

    /// Hard ceiling on any computed delay.
    pub max_elapsed_time_ms: u64,

    /// Whether buffer writes wait for an admission delay first.
    pub write_backoff: bool,

    /// Period of the eviction sweep.
    pub drain_interval_ms: u64,

    /// Optional seed for a reproducible backoff jitter sequence.
    pub seed: Option<u64>,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            target_size_bytes: 512 * 1024 * 1024, // 512 MiB default
            max_pool_size: DEFAULT_MAX_POOL_SIZE,
            initial_interval_ms: DEFAULT_INITIAL_INTERVAL_MS,
            randomization_factor: DEFAULT_RANDOMIZATION_FACTOR,
            max_elapsed_time_ms: DEFAULT_MAX_ELAPSED_TIME_MS,
            write_backoff: false,
            drain_interval_ms: DEFAULT_DRAIN_INTERVAL_MS,
            seed: None,
        }
    }
}

impl PoolConfig {
    /// Defaults with the given target size.
    pub fn with_target(target_size_bytes: i64) -> Self {
        Self {
            target_size_bytes,
            ..Self::default()
        }
    }

    /// Create a config from environment variables, falling back to defaults.
    ///
    /// Environment variables:
    /// - `BACKPOOL_TARGET_SIZE_BYTES`: target size in bytes
    /// - `BACKPOOL_MAX_POOL_SIZE`: free-list bound
    /// - `BACKPOOL_INITIAL_INTERVAL_MS`: initial backoff interval
    /// - `BACKPOOL_RANDOMIZATION_FACTOR`: jitter spread
    /// - `BACKPOOL_MAX_ELAPSED_TIME_MS`: delay ceiling
    /// - `BACKPOOL_WRITE_BACKOFF`: `true`/`false`
    /// - `BACKPOOL_DRAIN_INTERVAL_MS`: eviction sweep period
    /// - `BACKPOOL_SEED`: jitter seed
    pub fn from_env() -> Self {
        let mut cfg = Self::default();

        if let Ok(s) = std::env::var("BACKPOOL_TARGET_SIZE_BYTES") {
            if let Ok(v) = s.parse::<i64>() {
                cfg.target_size_bytes = v;
            }
        }

        if let Ok(s) = std::env::var("BACKPOOL_MAX_POOL_SIZE") {
            if let Ok(v) = s.parse::<usize>() {
                cfg.max_pool_size = v;
            }
        }

        if let Ok(s) = std::env::var("BACKPOOL_INITIAL_INTERVAL_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.initial_interval_ms = v;
            }
        }

        if let Ok(s) = std::env::var("BACKPOOL_RANDOMIZATION_FACTOR") {
            if let Ok(v) = s.parse::<f64>() {
                cfg.randomization_factor = v;
            }
        }

        if let Ok(s) = std::env::var("BACKPOOL_MAX_ELAPSED_TIME_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.max_elapsed_time_ms = v;
            }
        }

        if let Ok(s) = std::env::var("BACKPOOL_WRITE_BACKOFF") {
            if let Ok(v) = s.parse::<bool>() {
                cfg.write_backoff = v;
            }
        }

        if let Ok(s) = std::env::var("BACKPOOL_DRAIN_INTERVAL_MS") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.drain_interval_ms = v;
            }
        }

        if let Ok(s) = std::env::var("BACKPOOL_SEED") {
            if let Ok(v) = s.parse::<u64>() {
                cfg.seed = Some(v);
            }
        }

        cfg
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Replace zero values with defaults and clamp the target.
    pub fn normalized(mut self) -> Self {
        if self.max_pool_size == 0 {
            self.max_pool_size = DEFAULT_MAX_POOL_SIZE;
        }
        if self.initial_interval_ms == 0 {
            self.initial_interval_ms = DEFAULT_INITIAL_INTERVAL_MS;
        }
        if self.randomization_factor == 0.0 {
            self.randomization_factor = DEFAULT_RANDOMIZATION_FACTOR;
        }
        if self.max_elapsed_time_ms == 0 {
            self.max_elapsed_time_ms = DEFAULT_MAX_ELAPSED_TIME_MS;
        }
        if self.drain_interval_ms == 0 {
            self.drain_interval_ms = DEFAULT_DRAIN_INTERVAL_MS;
        }
        self.target_size_bytes = self.target_size_bytes.min(MAX_TARGET_SIZE);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.target_size_bytes <= 0 {
            return Err(Error::Config(format!(
                "target_size_bytes must be positive, got {}",
                self.target_size_bytes
            )));
        }
        if self.max_pool_size == 0 {
            return Err(Error::Config("max_pool_size must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&self.randomization_factor) {
            return Err(Error::Config(format!(
                "randomization_factor must be within [0, 1], got {}",
                self.randomization_factor
            )));
        }
        if self.initial_interval_ms > self.max_elapsed_time_ms {
            return Err(Error::Config(format!(
                "initial_interval_ms ({}) exceeds max_elapsed_time_ms ({})",
                self.initial_interval_ms, self.max_elapsed_time_ms
            )));
        }
        if self.drain_interval_ms == 0 {
            return Err(Error::Config("drain_interval_ms must be non-zero".into()));
        }
        Ok(())
    }

    /// Per-slot size limit: buffers larger than this are never re-pooled.
    pub fn per_buffer_limit(&self) -> i64 {
        self.target_size_bytes / self.max_pool_size.max(1) as i64
    }

    pub fn initial_interval(&self) -> Duration {
        Duration::from_millis(self.initial_interval_ms)
    }

    pub fn max_elapsed_time(&self) -> Duration {
        Duration::from_millis(self.max_elapsed_time_ms)
    }

    pub fn drain_interval(&self) -> Duration {
        Duration::from_millis(self.drain_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cfg = PoolConfig::default();
        assert_eq!(cfg.max_pool_size, 27);
        assert_eq!(cfg.initial_interval(), Duration::from_millis(500));
        assert_eq!(cfg.max_elapsed_time(), Duration::from_secs(15));
        assert_eq!(cfg.drain_interval(), Duration::from_secs(30));
        assert!(!cfg.write_backoff);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn test_normalized_fills_zeros_and_clamps_target() {
        let cfg = PoolConfig {
            target_size_bytes: i64::MAX,
            max_pool_size: 0,
            initial_interval_ms: 0,
            randomization_factor: 0.0,
            max_elapsed_time_ms: 0,
            write_backoff: true,
            drain_interval_ms: 0,
            seed: Some(7),
        }
        .normalized();

        assert_eq!(cfg.target_size_bytes, MAX_TARGET_SIZE);
        assert_eq!(cfg.max_pool_size, DEFAULT_MAX_POOL_SIZE);
        assert_eq!(cfg.initial_interval_ms, DEFAULT_INITIAL_INTERVAL_MS);
        assert_eq!(cfg.randomization_factor, DEFAULT_RANDOMIZATION_FACTOR);
        assert_eq!(cfg.max_elapsed_time_ms, DEFAULT_MAX_ELAPSED_TIME_MS);
        assert_eq!(cfg.drain_interval_ms, DEFAULT_DRAIN_INTERVAL_MS);
        assert!(cfg.write_backoff);
        assert_eq!(cfg.seed, Some(7));
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        assert!(PoolConfig::with_target(0).validate().is_err());

        let mut cfg = PoolConfig::with_target(1024);
        cfg.randomization_factor = 1.5;
        assert!(matches!(cfg.validate(), Err(Error::Config(_))));

        let mut cfg = PoolConfig::with_target(1024);
        cfg.initial_interval_ms = 20_000;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_per_buffer_limit() {
        let mut cfg = PoolConfig::with_target(27 * 1000);
        assert_eq!(cfg.per_buffer_limit(), 1000);
        cfg.max_pool_size = 1;
        assert_eq!(cfg.per_buffer_limit(), 27 * 1000);
    }

    #[test]
    fn test_from_json_partial() {
        let cfg = PoolConfig::from_json(r#"{"target_size_bytes": 4096, "write_backoff": true}"#)
            .unwrap();
        assert_eq!(cfg.target_size_bytes, 4096);
        assert!(cfg.write_backoff);
        assert_eq!(cfg.max_pool_size, DEFAULT_MAX_POOL_SIZE);

        assert!(PoolConfig::from_json("{not json").is_err());
    }
}
