//! Background eviction sweep.
//!
//! Every tick removes at most one idle buffer from the free list, a slow
//! release valve for memory held by a pool that is no longer busy. The sweep
//! owns a clone of the free-list receiver and never touches the pool itself.

use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::{select, tick, Receiver, Sender};

use crate::buffer::PooledBuffer;
use crate::error::{Error, Result};

pub(crate) struct Drainer {
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl Drainer {
    pub(crate) fn spawn(free: Receiver<PooledBuffer>, interval: Duration) -> Result<Self> {
        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let handle = thread::Builder::new()
            .name("backpool-drain".into())
            .spawn(move || run(free, stop_rx, interval))?;
        Ok(Self {
            stop: Some(stop_tx),
            handle: Some(handle),
        })
    }

    /// Stop the sweep and wait for it to exit. Only the first call succeeds.
    ///
    /// A sweep that died from a panic is reported as `Error::SweepPanicked`;
    /// the drainer still counts as stopped afterwards.
    pub(crate) fn stop(&mut self) -> Result<()> {
        // Dropping the only sender disconnects the stop channel.
        self.stop.take().ok_or(Error::AlreadyShutdown)?;
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                #[cfg(feature = "tracing")]
                tracing::error!("eviction sweep thread panicked");
                return Err(Error::SweepPanicked);
            }
        }
        Ok(())
    }

    pub(crate) fn is_stopped(&self) -> bool {
        self.stop.is_none()
    }
}

fn run(free: Receiver<PooledBuffer>, stop: Receiver<()>, interval: Duration) {
    let ticker = tick(interval);
    loop {
        select! {
            recv(stop) -> _ => break,
            recv(ticker) -> _ => {
                // An empty free list just waits for the next tick.
                if let Ok(_buf) = free.try_recv() {
                    #[cfg(feature = "tracing")]
                    tracing::debug!(remaining = free.len(), "evicted idle buffer");
                }
            }
        }
    }
    #[cfg(feature = "tracing")]
    tracing::debug!("eviction sweep stopped");
}
