//! Contiguous growable byte store.
//!
//! Growth is only ever a contiguous append at the current end: `allocate`
//! reserves a zero-filled region, `write_at` either appends exactly at the
//! end or overwrites inside the current bounds. A write that would leave a
//! gap is rejected, never silently resized.
//!
//! No locking here; `PooledBuffer` wraps this in an `RwLock`.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};

#[derive(Debug, Default)]
pub struct GrowableBuffer {
    buf: Vec<u8>,
    // Mirrors `buf.len()` so size can be read without borrowing `buf`.
    size: AtomicU64,
}

impl GrowableBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer seeded with `buf` as its initial content.
    pub fn from_vec(buf: Vec<u8>) -> Self {
        let size = AtomicU64::new(buf.len() as u64);
        Self { buf, size }
    }

    /// Current length.
    pub fn size(&self) -> u64 {
        self.size.load(Ordering::Acquire)
    }

    /// Grow by exactly `n` zeroed bytes; returns the offset of the new region.
    pub fn allocate(&mut self, n: u64) -> Result<u64> {
        if n == 0 {
            return Err(Error::ZeroAllocation);
        }
        let off = self.size();
        let end = off.checked_add(n).ok_or(Error::AllocFailed { bytes: n })?;
        let extra = usize::try_from(n).map_err(|_| Error::AllocFailed { bytes: n })?;
        self.buf
            .try_reserve_exact(extra)
            .map_err(|_| Error::AllocFailed { bytes: n })?;
        self.truncate(end);
        Ok(off)
    }

    /// Append at the current end; returns the offset the data landed at.
    pub fn append(&mut self, data: &[u8]) -> Result<u64> {
        let off = self.size();
        self.write_at(data, off)?;
        Ok(off)
    }

    pub fn write_at(&mut self, data: &[u8], off: u64) -> Result<usize> {
        let size = self.size();
        let n = data.len();
        if off == size {
            self.buf.extend_from_slice(data);
            self.size.fetch_add(n as u64, Ordering::AcqRel);
        } else if off.checked_add(n as u64).map_or(true, |end| end > size) {
            return Err(Error::WritePastEnd {
                offset: off,
                len: n,
                size,
            });
        } else {
            let start = off as usize;
            self.buf[start..start + n].copy_from_slice(data);
        }
        Ok(n)
    }

    /// Fill `dst` from the start of the buffer.
    pub fn read(&self, dst: &mut [u8]) -> Result<usize> {
        self.read_at(dst, 0)
    }

    pub fn read_at(&self, dst: &mut [u8], off: u64) -> Result<usize> {
        let n = dst.len();
        let size = self.size();
        if off > size || n as u64 > size - off {
            return Err(Error::Eof {
                offset: off,
                len: n,
                size,
            });
        }
        let start = off as usize;
        dst.copy_from_slice(&self.buf[start..start + n]);
        Ok(n)
    }

    /// Grow (zero-fill) or shrink to exactly `new_size`.
    pub fn truncate(&mut self, new_size: u64) {
        self.buf.resize(new_size as usize, 0);
        self.size.store(new_size, Ordering::Release);
    }

    /// Discard storage. Always succeeds.
    pub fn reset(&mut self) {
        self.buf = Vec::new();
        self.size.store(0, Ordering::Release);
    }

    pub fn bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Mutable view of the live bytes; the length cannot change through it.
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}
