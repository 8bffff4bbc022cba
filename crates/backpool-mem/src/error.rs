use std::io;

use thiserror::Error;

/// Result type local to backpool-mem.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("end of data: requested {len} bytes at offset {offset}, buffer size {size}")]
    Eof { offset: u64, len: usize, size: u64 },

    #[error("invalid slice range {start}..{end}")]
    InvalidRange { start: u64, end: u64 },

    #[error("unable to allocate {bytes} bytes")]
    AllocFailed { bytes: u64 },

    #[error("unable to allocate zero bytes")]
    ZeroAllocation,

    #[error("write of {len} bytes at offset {offset} leaves a gap past end (size {size})")]
    WritePastEnd { offset: u64, len: usize, size: u64 },

    #[error("buffer pool already shut down")]
    AlreadyShutdown,

    #[error("eviction sweep thread panicked")]
    SweepPanicked,

    #[error("failed to spawn eviction sweep: {0}")]
    Spawn(#[from] io::Error),

    #[error(transparent)]
    Core(#[from] backpool_core::Error),
}

impl Error {
    /// Programming errors. Callers should treat these as bugs, not retry them.
    pub fn is_contract_violation(&self) -> bool {
        matches!(
            self,
            Error::ZeroAllocation | Error::WritePastEnd { .. } | Error::AlreadyShutdown
        )
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> Self {
        let kind = match e {
            Error::Eof { .. } => io::ErrorKind::UnexpectedEof,
            Error::InvalidRange { .. } | Error::ZeroAllocation | Error::WritePastEnd { .. } => {
                io::ErrorKind::InvalidInput
            }
            Error::AllocFailed { .. } => io::ErrorKind::OutOfMemory,
            Error::AlreadyShutdown | Error::SweepPanicked | Error::Spawn(_) | Error::Core(_) => {
                io::ErrorKind::Other
            }
        };
        io::Error::new(kind, e)
    }
}
