//! Throttled buffer pool.
//!
//! A bounded free list of `PooledBuffer`s sharing one `CapacityController`.
//! Nothing is ever refused: as usage approaches the target, `get` waits
//! longer before handing out a fresh buffer, and (optionally) so do writes.
//!
//! All methods are safe to call concurrently from many threads.

use std::sync::Arc;
use std::thread;

use backpool_core::{AdmissionControl, PoolConfig};
use crossbeam_channel::{after, bounded, select, Receiver, Sender, TrySendError};
use parking_lot::Mutex;

use crate::buffer::PooledBuffer;
use crate::capacity::CapacityController;
use crate::drain::Drainer;
use crate::error::Result;

pub struct BufferPool {
    free_tx: Sender<PooledBuffer>,
    free_rx: Receiver<PooledBuffer>,

    per_buffer_limit: u64,
    cap: Arc<CapacityController>,

    drainer: Mutex<Drainer>,
}

impl BufferPool {
    /// Build a pool and start its eviction sweep.
    ///
    /// Zero-valued options fall back to defaults and the target is clamped
    /// to `MAX_TARGET_SIZE` before validation.
    pub fn new(cfg: PoolConfig) -> Result<Self> {
        let cfg = cfg.normalized();
        cfg.validate()?;

        let cap = Arc::new(CapacityController::new(&cfg));
        cap.reset_backoff();

        let (free_tx, free_rx) = bounded(cfg.max_pool_size);
        let drainer = Drainer::spawn(free_rx.clone(), cfg.drain_interval())?;

        #[cfg(feature = "tracing")]
        tracing::debug!(
            target_size = cfg.target_size_bytes,
            max_pool_size = cfg.max_pool_size,
            per_buffer_limit = cfg.per_buffer_limit(),
            write_backoff = cfg.write_backoff,
            "buffer pool created"
        );

        Ok(Self {
            free_tx,
            free_rx,
            per_buffer_limit: cfg.per_buffer_limit() as u64,
            cap,
            drainer: Mutex::new(drainer),
        })
    }

    /// Pool with default options and the given target size.
    pub fn with_target(target_size_bytes: i64) -> Result<Self> {
        Self::new(PoolConfig::with_target(target_size_bytes))
    }

    /// Take a buffer from the free list, or a fresh one once the admission
    /// delay elapses, whichever comes first.
    ///
    /// When both are ready at once the winner is picked at random; callers
    /// must not rely on either outcome.
    pub fn get(&self) -> PooledBuffer {
        let delay = self.cap.delay_for_acquisition();
        select! {
            recv(self.free_rx) -> buf => match buf {
                Ok(buf) => {
                    #[cfg(feature = "tracing")]
                    tracing::trace!(remaining = self.free_rx.len(), "pooled buffer acquired");
                    buf
                }
                // Unreachable while we hold `free_tx`.
                Err(_) => PooledBuffer::new(Arc::clone(&self.cap)),
            },
            recv(after(delay)) -> _ => {
                #[cfg(feature = "tracing")]
                tracing::trace!(delay_us = delay.as_micros() as u64, "fresh buffer after admission delay");
                PooledBuffer::new(Arc::clone(&self.cap))
            },
        }
    }

    /// Fresh buffer seeded with `initial`; the seed counts towards usage.
    pub fn new_buffer(&self, initial: Vec<u8>) -> PooledBuffer {
        PooledBuffer::with_content(Arc::clone(&self.cap), initial)
    }

    /// Reset `buf` and offer it back to the free list.
    ///
    /// Buffers that held more than the per-buffer limit are dropped instead of
    /// pooled, as are buffers from another pool. Never blocks: a full free
    /// list drops the buffer too.
    pub fn put(&self, buf: PooledBuffer) {
        let len = buf.size();
        buf.reset();

        if !Arc::ptr_eq(buf.controller(), &self.cap) {
            #[cfg(feature = "tracing")]
            tracing::trace!("dropped buffer issued by another pool");
            return;
        }
        if len > self.per_buffer_limit {
            #[cfg(feature = "tracing")]
            tracing::trace!(len, limit = self.per_buffer_limit, "dropped oversized buffer");
            return;
        }
        if self.capacity() < 1.0 {
            self.cap.reset_backoff();
        }

        match self.free_tx.try_send(buf) {
            Ok(()) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(pooled = self.free_rx.len(), "buffer returned to pool");
            }
            Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                #[cfg(feature = "tracing")]
                tracing::trace!("free list full, buffer dropped");
            }
        }
    }

    /// Block the calling thread for one admission delay without acquiring.
    pub fn backoff(&self) {
        let delay = self.cap.delay_for_acquisition();
        if !delay.is_zero() {
            thread::sleep(delay);
        }
    }

    /// Fullness ratio `used / target`.
    pub fn capacity(&self) -> f64 {
        self.cap.ratio()
    }

    /// Idle buffers currently in the free list.
    pub fn free_len(&self) -> usize {
        self.free_rx.len()
    }

    pub fn per_buffer_limit(&self) -> u64 {
        self.per_buffer_limit
    }

    pub fn controller(&self) -> &Arc<CapacityController> {
        &self.cap
    }

    /// Stop the eviction sweep. In-flight `get`/write delays are unaffected.
    ///
    /// Returns `Error::AlreadyShutdown` on every call after the first.
    pub fn shutdown(&self) -> Result<()> {
        self.drainer.lock().stop()?;
        #[cfg(feature = "tracing")]
        tracing::debug!(
            used = self.cap.used_bytes(),
            peak = self.cap.peak_bytes(),
            "buffer pool shut down"
        );
        Ok(())
    }

    pub fn is_shutdown(&self) -> bool {
        self.drainer.lock().is_stopped()
    }
}

impl Drop for BufferPool {
    fn drop(&mut self) {
        let drainer = self.drainer.get_mut();
        if !drainer.is_stopped() {
            let _ = drainer.stop();
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use super::*;
    use crate::error::Error;

    fn fast_config(target: i64) -> PoolConfig {
        PoolConfig {
            initial_interval_ms: 1,
            max_elapsed_time_ms: 5,
            seed: Some(3),
            ..PoolConfig::with_target(target)
        }
    }

    #[test]
    fn test_new_rejects_invalid_target() {
        assert!(matches!(BufferPool::with_target(0), Err(Error::Core(_))));
        assert!(BufferPool::with_target(-5).is_err());
    }

    #[test]
    fn test_target_is_clamped() {
        let pool = BufferPool::with_target(i64::MAX).unwrap();
        assert_eq!(
            pool.controller().target_bytes(),
            backpool_core::config::MAX_TARGET_SIZE
        );
    }

    #[test]
    fn test_get_below_target_returns_empty_buffer() {
        let pool = BufferPool::new(fast_config(1 << 20)).unwrap();
        let buf = pool.get();
        assert_eq!(buf.size(), 0);
        assert_eq!(pool.capacity(), 0.0);
    }

    #[test]
    fn test_put_offers_buffer_to_free_list() {
        let pool = BufferPool::new(fast_config(1 << 20)).unwrap();
        let buf = pool.get();
        buf.write(b"abc").unwrap();
        pool.put(buf);
        assert_eq!(pool.free_len(), 1);
        assert_eq!(pool.capacity(), 0.0);

        // Whichever outcome `get` picks, the buffer is empty.
        let again = pool.get();
        assert!(again.is_empty());
    }

    #[test]
    fn test_free_list_is_bounded() {
        let cfg = PoolConfig {
            max_pool_size: 2,
            ..fast_config(1 << 20)
        };
        let pool = BufferPool::new(cfg).unwrap();
        let bufs: Vec<_> = (0..5).map(|_| pool.new_buffer(Vec::new())).collect();
        for b in bufs {
            pool.put(b);
        }
        assert_eq!(pool.free_len(), 2);
    }

    #[test]
    fn test_oversized_buffer_is_not_pooled() {
        let cfg = PoolConfig {
            max_pool_size: 4,
            ..fast_config(4000)
        };
        let pool = BufferPool::new(cfg).unwrap();
        assert_eq!(pool.per_buffer_limit(), 1000);

        let big = pool.get();
        big.write(&[0u8; 1001]).unwrap();
        pool.put(big);
        assert_eq!(pool.free_len(), 0);
        assert_eq!(pool.controller().used_bytes(), 0);

        let fits = pool.get();
        fits.write(&[0u8; 1000]).unwrap();
        pool.put(fits);
        assert_eq!(pool.free_len(), 1);
    }

    #[test]
    fn test_foreign_buffer_is_not_pooled() {
        let a = BufferPool::new(fast_config(1 << 20)).unwrap();
        let b = BufferPool::new(fast_config(1 << 20)).unwrap();
        let buf = a.new_buffer(b"xyz".to_vec());
        b.put(buf);
        assert_eq!(b.free_len(), 0);
        assert_eq!(a.controller().used_bytes(), 0);
    }

    #[test]
    fn test_put_resets_backoff_only_below_target() {
        let pool = BufferPool::new(fast_config(100)).unwrap();
        let hog = pool.new_buffer(vec![0u8; 300]);

        pool.backoff();
        let raised = pool.controller().current_interval();
        assert!(raised > pool.controller().initial_interval());

        // Still over target: the interval is left alone.
        pool.put(pool.new_buffer(Vec::new()));
        assert_eq!(pool.controller().current_interval(), raised);

        hog.reset();
        pool.put(pool.new_buffer(Vec::new()));
        assert_eq!(
            pool.controller().current_interval(),
            pool.controller().initial_interval()
        );
    }

    #[test]
    fn test_get_over_target_waits_bounded() {
        let pool = BufferPool::new(fast_config(10)).unwrap();
        let hog = pool.new_buffer(vec![0u8; 1000]);
        let start = Instant::now();
        for _ in 0..5 {
            let _ = pool.get();
        }
        // Five waits each capped at max_elapsed_time (5ms), plus slack.
        assert!(start.elapsed() < Duration::from_secs(2));
        assert_eq!(pool.controller().current_interval(), Duration::from_millis(5));
        drop(hog);
    }

    #[test]
    fn test_shutdown_exactly_once() {
        let pool = BufferPool::new(fast_config(1024)).unwrap();
        assert!(!pool.is_shutdown());
        pool.shutdown().unwrap();
        assert!(pool.is_shutdown());
        let err = pool.shutdown().unwrap_err();
        assert!(matches!(err, Error::AlreadyShutdown));
        assert!(err.is_contract_violation());
    }

    #[test]
    fn test_drain_evicts_one_buffer_per_tick() {
        let cfg = PoolConfig {
            drain_interval_ms: 50,
            ..fast_config(1 << 20)
        };
        let pool = BufferPool::new(cfg).unwrap();
        for _ in 0..3 {
            pool.put(pool.new_buffer(Vec::new()));
        }
        assert_eq!(pool.free_len(), 3);

        let deadline = Instant::now() + Duration::from_secs(5);
        while pool.free_len() > 0 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(pool.free_len(), 0);

        pool.shutdown().unwrap();
        pool.put(pool.new_buffer(Vec::new()));
        std::thread::sleep(Duration::from_millis(150));
        assert_eq!(pool.free_len(), 1);
    }
}
