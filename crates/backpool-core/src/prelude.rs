//! Convenient re-exports for downstream crates.

pub use crate::admission::AdmissionControl;
pub use crate::config::{PoolConfig, MAX_TARGET_SIZE};
pub use crate::error::{Error, Result};
