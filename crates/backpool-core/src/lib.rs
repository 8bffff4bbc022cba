#![forbid(unsafe_code)]
//! backpool-core: shared vocabulary for the backpool buffer pool.
//!
//! Holds the configuration, the core error type, and the admission-control
//! interface. The concrete controller, buffers and pool live in
//! `backpool-mem`.

pub mod admission;
pub mod config;
pub mod error;
pub mod prelude;

pub use admission::AdmissionControl;
pub use config::PoolConfig;
pub use error::{Error, Result};
