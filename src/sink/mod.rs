//! Audio sink capability consumed by the render loop.
//!
//! A sink accepts fixed-size blocks of signed 16-bit mono samples and blocks
//! the writer until the block is accepted. That blocking write is the only
//! clock the render loop has.

pub mod device;
pub mod loopback;
pub mod pipe;

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};
use std::time::Duration;
use thiserror::Error;

use crate::error::EngineError;

/// Format of the stream requested from a backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSpec {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Frames per block handed to `AudioSink::write`
    pub block_size: usize,
}

impl StreamSpec {
    /// Mono, 16-bit stream at `sample_rate`
    pub fn mono_i16(sample_rate: u32, block_size: usize) -> Self {
        Self {
            sample_rate,
            channels: 1,
            bits_per_sample: 16,
            block_size,
        }
    }

    /// Wall-clock duration of one block
    pub fn block_duration(&self) -> Duration {
        Duration::from_secs_f64(self.block_size as f64 / self.sample_rate.max(1) as f64)
    }
}

/// Failure writing a single block
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SinkError {
    /// The sink was released while the write was pending
    #[error("sink released")]
    Closed,
    /// The consuming side of the sink went away
    #[error("sink consumer disconnected")]
    Disconnected,
    #[error("write failed: {0}")]
    Write(String),
}

/// Blocking destination for rendered blocks
/// Dropping the sink closes it. Sinks live on the render thread that opened them
pub trait AudioSink {
    /// Write one block, blocking until it has been accepted
    fn write(&mut self, block: &[i16]) -> Result<(), SinkError>;
}

/// Opens sinks for the render thread
pub trait AudioBackend: Send + Sync {
    /// Open a sink for `spec`
    ///
    /// Called on the render thread. Pending and future writes on the returned
    /// sink must fail with `SinkError::Closed` once `release` fires.
    fn open(
        &self,
        spec: &StreamSpec,
        release: ReleaseSignal,
    ) -> Result<Box<dyn AudioSink>, EngineError>;
}

/// Fires once when the engine releases its sink
///
/// Backed by a channel that never carries a message: the engine drops the
/// sending half, which wakes every receiver with a disconnect.
#[derive(Debug, Clone)]
pub struct ReleaseSignal {
    rx: Receiver<()>,
}

impl ReleaseSignal {
    pub fn new(rx: Receiver<()>) -> Self {
        Self { rx }
    }

    /// Signal that never fires
    #[cfg(test)]
    pub(crate) fn never() -> Self {
        let (tx, rx) = crossbeam_channel::bounded(0);
        std::mem::forget(tx);
        Self { rx }
    }

    pub fn is_released(&self) -> bool {
        matches!(self.rx.try_recv(), Err(TryRecvError::Disconnected))
    }

    /// Sleep for up to `timeout`, returning early with `true` on release
    pub fn wait(&self, timeout: Duration) -> bool {
        matches!(self.rx.recv_timeout(timeout), Err(RecvTimeoutError::Disconnected))
    }

    /// Receiver usable in `crossbeam_channel::select!`
    pub fn receiver(&self) -> &Receiver<()> {
        &self.rx
    }
}
