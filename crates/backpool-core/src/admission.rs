//! Abstract admission-control interface.
//!
//! The concrete controller lives in `backpool-mem`. Only the trait is kept
//! here so callers can depend on the API without pulling in locks and RNGs.

use std::time::Duration;

/// Converts "how full is the pool" into a wait.
///
/// Implementations track the aggregate bytes held by every buffer issued
/// from one pool. Usage may run past the target; that never fails, it only
/// lengthens the delay handed out by [`delay_for_acquisition`].
///
/// [`delay_for_acquisition`]: AdmissionControl::delay_for_acquisition
pub trait AdmissionControl: Send + Sync + 'static {
    /// Bytes currently held across all live buffers.
    fn used_bytes(&self) -> i64;

    /// Configured ceiling used for the fullness ratio.
    fn target_bytes(&self) -> i64;

    /// Fullness ratio `used / target`. Read-only.
    fn ratio(&self) -> f64 {
        self.used_bytes() as f64 / self.target_bytes() as f64
    }

    /// Wait a caller should incur before acquiring or writing.
    ///
    /// At or below target this is `ratio` milliseconds. Above target it is
    /// a randomized backoff that compounds while the pool stays over.
    fn delay_for_acquisition(&self) -> Duration;

    /// Drop the backoff interval back to its initial value.
    fn reset_backoff(&self);
}
