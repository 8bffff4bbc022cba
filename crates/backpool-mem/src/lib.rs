#![forbid(unsafe_code)]
//! backpool-mem: throttled buffer pool, capacity controller, and growable buffers.
//!
//! This crate provides the concrete implementation of the `AdmissionControl`
//! interface defined in `backpool-core`, plus the buffers and pool that
//! account their bytes against it.
//!
//! Nothing here ever refuses memory. As the pool approaches its target,
//! acquiring (and optionally writing to) a buffer waits for a randomized,
//! exponentially growing delay instead.

pub mod buffer;
pub mod capacity;
pub mod drain;
pub mod error;
pub mod growable;
pub mod pool;
pub mod tracking;

pub use buffer::PooledBuffer;
pub use capacity::CapacityController;
pub use error::{Error, Result};
pub use growable::GrowableBuffer;
pub use pool::BufferPool;
pub use tracking::PeakTracker;
