use crossbeam_channel::{unbounded, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};

use super::{
    pipe::{pipe, PipeReader},
    AudioBackend, AudioSink, ReleaseSignal, StreamSpec,
};
use crate::error::EngineError;

/// Backend that hands rendered blocks back to the caller instead of a device
///
/// Each `open` creates a fresh block queue and delivers its reading half on
/// the receiver returned by `new`. Whoever holds the reader is the clock.
pub struct LoopbackBackend {
    capacity: usize,
    readers: Sender<PipeReader>,
    opened: AtomicUsize,
}

impl LoopbackBackend {
    /// Create a backend whose queues hold `capacity` blocks
    pub fn new(capacity: usize) -> (Self, Receiver<PipeReader>) {
        let (readers_tx, readers_rx) = unbounded();
        let backend = Self {
            capacity,
            readers: readers_tx,
            opened: AtomicUsize::new(0),
        };
        (backend, readers_rx)
    }

    /// Number of sinks opened so far
    pub fn open_count(&self) -> usize {
        self.opened.load(Ordering::Acquire)
    }
}

impl AudioBackend for LoopbackBackend {
    fn open(
        &self,
        _spec: &StreamSpec,
        release: ReleaseSignal,
    ) -> Result<Box<dyn AudioSink>, EngineError> {
        let (sink, reader) = pipe(self.capacity, release);
        self.readers
            .send(reader)
            .map_err(|_| EngineError::device_unavailable("loopback reader dropped"))?;
        self.opened.fetch_add(1, Ordering::AcqRel);
        Ok(Box::new(sink))
    }
}
