//! Capacity accounting and randomized exponential backoff.
//!
//! One controller is owned by each `BufferPool`; every buffer it issues holds
//! an `Arc` to it and adds/subtracts its bytes here. The counter is never
//! capped. Running over target only makes `delay_for_acquisition` longer.
//!
//! Backoff state machine over `current_interval`:
//! - reset: `current_interval = initial_interval`
//! - `next_backoff(m)`: sample uniformly from
//!   `[current * (1 - r), current * (1 + r)]`, then
//!   `current = min(current * m, max_elapsed_time)`

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use backpool_core::{AdmissionControl, PoolConfig};
use parking_lot::Mutex;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::tracking::PeakTracker;

struct BackoffState {
    current_interval: Duration,
    rng: StdRng,
}

pub struct CapacityController {
    used: AtomicI64,
    target: i64,

    initial_interval: Duration,
    randomization_factor: f64,
    max_elapsed_time: Duration,
    write_backoff: bool,

    backoff: Mutex<BackoffState>,
    peak: PeakTracker,
}

impl CapacityController {
    /// Build a controller from an already normalized and validated config.
    pub fn new(cfg: &PoolConfig) -> Self {
        let rng = match cfg.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            used: AtomicI64::new(0),
            target: cfg.target_size_bytes,
            initial_interval: cfg.initial_interval(),
            randomization_factor: cfg.randomization_factor,
            max_elapsed_time: cfg.max_elapsed_time(),
            write_backoff: cfg.write_backoff,
            backoff: Mutex::new(BackoffState {
                current_interval: cfg.initial_interval(),
                rng,
            }),
            peak: PeakTracker::new(),
        }
    }

    /// Account `delta` bytes (negative to release). Returns the new total.
    pub(crate) fn add(&self, delta: i64) -> i64 {
        let used = self.used.fetch_add(delta, Ordering::AcqRel) + delta;
        if delta > 0 {
            self.peak.record_used(used);
        }
        used
    }

    /// Randomized delay around the current interval, then advance the interval.
    pub fn next_backoff(&self, multiplier: f64) -> Duration {
        let mut state = self.backoff.lock();
        let random = state.rng.gen::<f64>();
        let delay = randomized_interval(self.randomization_factor, random, state.current_interval)
            .min(self.max_elapsed_time);

        state.current_interval =
            scale_clamped(state.current_interval, multiplier, self.max_elapsed_time);

        #[cfg(feature = "tracing")]
        tracing::trace!(
            multiplier,
            delay_ms = delay.as_millis() as u64,
            next_interval_ms = state.current_interval.as_millis() as u64,
            "backoff advanced"
        );
        delay
    }

    pub fn current_interval(&self) -> Duration {
        self.backoff.lock().current_interval
    }

    pub fn initial_interval(&self) -> Duration {
        self.initial_interval
    }

    pub fn max_elapsed_time(&self) -> Duration {
        self.max_elapsed_time
    }

    /// Whether buffer writes wait for an admission delay.
    pub fn write_backoff(&self) -> bool {
        self.write_backoff
    }

    /// Highest `used` value observed.
    pub fn peak_bytes(&self) -> i64 {
        self.peak.peak()
    }
}

impl AdmissionControl for CapacityController {
    fn used_bytes(&self) -> i64 {
        self.used.load(Ordering::Acquire)
    }

    fn target_bytes(&self) -> i64 {
        self.target
    }

    fn delay_for_acquisition(&self) -> Duration {
        let ratio = self.ratio();
        if ratio <= 1.0 {
            // `ratio` milliseconds: negligible friction below target.
            return Duration::from_secs_f64(ratio.max(0.0) / 1000.0);
        }
        self.next_backoff(ratio)
    }

    fn reset_backoff(&self) {
        self.backoff.lock().current_interval = self.initial_interval;
    }
}

/// Value from `[interval - factor * interval, interval + factor * interval]`
/// picked by `random` in `[0, 1)`.
fn randomized_interval(factor: f64, random: f64, interval: Duration) -> Duration {
    let cur = interval.as_nanos() as f64;
    let delta = factor * cur;
    let min = cur - delta;
    let max = cur + delta;
    Duration::from_nanos((min + random * (max - min)).max(0.0) as u64)
}

/// `interval * multiplier`, saturating at `ceiling`.
fn scale_clamped(interval: Duration, multiplier: f64, ceiling: Duration) -> Duration {
    let nanos = interval.as_nanos() as f64 * multiplier;
    if nanos.is_nan() || nanos >= ceiling.as_nanos() as f64 {
        return ceiling;
    }
    Duration::from_nanos(nanos.max(0.0) as u64)
}
