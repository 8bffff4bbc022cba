//! Pool-issued buffer: a `GrowableBuffer` behind an `RwLock`, accounted
//! against the pool's shared `CapacityController`.
//!
//! Reads take the shared lock, mutations the exclusive one. Every byte the
//! store grows by is added to the controller; `reset` hands it all back.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread;

use backpool_core::AdmissionControl;
use parking_lot::{
    MappedRwLockReadGuard, MappedRwLockWriteGuard, RwLock, RwLockReadGuard, RwLockWriteGuard,
};

use crate::capacity::CapacityController;
use crate::error::{Error, Result};
use crate::growable::GrowableBuffer;

pub struct PooledBuffer {
    cap: Arc<CapacityController>,
    internal: RwLock<GrowableBuffer>,
}

impl PooledBuffer {
    pub(crate) fn new(cap: Arc<CapacityController>) -> Self {
        Self {
            cap,
            internal: RwLock::new(GrowableBuffer::new()),
        }
    }

    /// Buffer seeded with `initial`; the seed counts towards pool usage.
    pub(crate) fn with_content(cap: Arc<CapacityController>, initial: Vec<u8>) -> Self {
        if !initial.is_empty() {
            cap.add(initial.len() as i64);
        }
        Self {
            cap,
            internal: RwLock::new(GrowableBuffer::from_vec(initial)),
        }
    }

    pub(crate) fn controller(&self) -> &Arc<CapacityController> {
        &self.cap
    }

    fn maybe_backoff(&self) {
        if self.cap.write_backoff() {
            let delay = self.cap.delay_for_acquisition();
            if !delay.is_zero() {
                thread::sleep(delay);
            }
        }
    }

    /// Append `data` at the end. Returns the number of bytes written.
    ///
    /// With write backoff enabled this first waits for one admission delay,
    /// whether or not the write would take the pool over target. An empty
    /// `data` returns `Ok(0)` immediately and never waits.
    pub fn write(&self, data: &[u8]) -> Result<usize> {
        if data.is_empty() {
            return Ok(0);
        }
        let mut inner = self.internal.write();
        self.maybe_backoff();
        let off = inner.allocate(data.len() as u64)?;
        inner.write_at(data, off)?;
        self.cap.add(data.len() as i64);
        Ok(data.len())
    }

    /// Write at an explicit offset: append when `off == size()`, overwrite
    /// in place when the span fits. Only appended bytes count towards pool
    /// usage; an overwrite never double-counts.
    pub fn write_at(&self, data: &[u8], off: u64) -> Result<usize> {
        let mut inner = self.internal.write();
        self.maybe_backoff();
        let before = inner.size();
        let n = inner.write_at(data, off)?;
        let grown = inner.size() - before;
        if grown > 0 {
            self.cap.add(grown as i64);
        }
        Ok(n)
    }

    /// Reserve `n` zeroed bytes at the end; returns the region's offset.
    ///
    /// Call this before filling a region through `write_at` or `internal`.
    pub fn extend(&self, n: u64) -> Result<u64> {
        let mut inner = self.internal.write();
        let off = inner.allocate(n)?;
        self.cap.add(n as i64);
        Ok(off)
    }

    /// Resize to exactly `new_size`, zero-filling on growth.
    pub fn truncate(&self, new_size: u64) {
        let mut inner = self.internal.write();
        let before = inner.size();
        inner.truncate(new_size);
        self.cap.add(new_size as i64 - before as i64);
    }

    /// Shared view of the content. Holds the read lock while alive.
    pub fn bytes(&self) -> MappedRwLockReadGuard<'_, [u8]> {
        RwLockReadGuard::map(self.internal.read(), |b| b.bytes())
    }

    /// Fill `dst` from the start of the buffer.
    pub fn read(&self, dst: &mut [u8]) -> Result<usize> {
        self.internal.read().read(dst)
    }

    pub fn read_at(&self, dst: &mut [u8], off: u64) -> Result<usize> {
        self.internal.read().read_at(dst, off)
    }

    /// Fresh copy of `[start, end)`.
    pub fn slice(&self, start: u64, end: u64) -> Result<Vec<u8>> {
        if start > end {
            return Err(Error::InvalidRange { start, end });
        }
        let inner = self.internal.read();
        let size = inner.size();
        if end > size {
            return Err(Error::Eof {
                offset: start,
                len: (end - start) as usize,
                size,
            });
        }
        Ok(inner.bytes()[start as usize..end as usize].to_vec())
    }

    /// Discard the content and return its bytes to the pool's budget.
    pub fn reset(&self) {
        let mut inner = self.internal.write();
        let len = inner.size();
        inner.reset();
        if len > 0 {
            self.cap.add(-(len as i64));
        }
    }

    /// Live backing store for zero-copy I/O, e.g. `File::read_at` into a
    /// region reserved with `extend`.
    ///
    /// The exclusive lock is held while the guard lives: calling `write` on
    /// the same thread before dropping it deadlocks.
    pub fn internal(&self) -> MappedRwLockWriteGuard<'_, [u8]> {
        RwLockWriteGuard::map(self.internal.write(), |b| b.as_mut_slice())
    }

    pub fn size(&self) -> u64 {
        self.internal.read().size()
    }

    pub fn is_empty(&self) -> bool {
        self.size() == 0
    }
}

impl io::Write for PooledBuffer {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        Ok(PooledBuffer::write(self, buf)?)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("size", &self.size())
            .finish_non_exhaustive()
    }
}
