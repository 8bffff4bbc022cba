#![forbid(unsafe_code)]
//! backpool: a bounded pool of reusable byte buffers that throttles instead
//! of failing.
//!
//! As aggregate buffer memory approaches the configured target, acquiring a
//! buffer (and, when enabled, writing to one) waits for a randomized,
//! exponentially growing delay. Nothing is ever refused.
//!
//! ```no_run
//! use backpool::prelude::*;
//!
//! let pool = BufferPool::with_target(64 * 1024 * 1024)?;
//! let buf = pool.get();
//! buf.write(b"payload")?;
//! pool.put(buf);
//! pool.shutdown()?;
//! # Ok::<(), backpool::backpool_mem::Error>(())
//! ```

pub use backpool_core;
pub use backpool_mem;

pub mod prelude {
    pub use backpool_core::prelude::*;
    pub use backpool_mem::{BufferPool, CapacityController, GrowableBuffer, PooledBuffer};
}
