use crossbeam_channel::{bounded, select, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

use super::{AudioSink, ReleaseSignal, SinkError};

/// Create a bounded block queue holding at most `capacity` blocks
///
/// The writing half blocks while the queue is full, so a consumer draining
/// it in real time paces the producer.
pub fn pipe(capacity: usize, release: ReleaseSignal) -> (PipeSink, PipeReader) {
    let capacity = capacity.max(1);
    let (block_tx, block_rx) = bounded(capacity);
    // Room for every block in flight plus the ones being read, so recycling never blocks
    let (spare_tx, spare_rx) = bounded(capacity + 2);

    let sink = PipeSink {
        blocks: block_tx,
        spare: spare_rx,
        release,
    };
    let reader = PipeReader {
        blocks: block_rx,
        spare: spare_tx,
        current: Vec::new(),
        position: 0,
        underruns: 0,
    };

    (sink, reader)
}

/// Writing half of a block queue
pub struct PipeSink {
    blocks: Sender<Vec<i16>>,
    spare: Receiver<Vec<i16>>,
    release: ReleaseSignal,
}

impl AudioSink for PipeSink {
    fn write(&mut self, block: &[i16]) -> Result<(), SinkError> {
        if self.release.is_released() {
            return Err(SinkError::Closed);
        }

        let mut buffer = self.spare.try_recv().unwrap_or_default();
        buffer.clear();
        buffer.extend_from_slice(block);

        select! {
            send(self.blocks, buffer) -> res => res.map_err(|_| SinkError::Disconnected),
            recv(self.release.receiver()) -> _ => Err(SinkError::Closed),
        }
    }
}

/// Reading half of a block queue
pub struct PipeReader {
    blocks: Receiver<Vec<i16>>,
    spare: Sender<Vec<i16>>,
    current: Vec<i16>,
    position: usize,
    underruns: u64,
}

impl PipeReader {
    /// Copy queued samples into `out` without blocking
    ///
    /// Samples missing because the queue ran dry are filled with silence.
    /// Returns the number of real samples copied.
    pub fn fill(&mut self, out: &mut [i16]) -> usize {
        let mut written = 0;

        while written < out.len() {
            if self.position >= self.current.len() {
                match self.blocks.try_recv() {
                    Ok(block) => self.swap_in(block),
                    Err(_) => break,
                }
                continue;
            }

            let available = &self.current[self.position..];
            let count = available.len().min(out.len() - written);
            out[written..written + count].copy_from_slice(&available[..count]);
            self.position += count;
            written += count;
        }

        if written < out.len() {
            out[written..].fill(0);
            self.underruns += 1;
        }

        written
    }

    /// Wait up to `timeout` for the next whole block
    pub fn next_block(&self, timeout: Duration) -> Option<Vec<i16>> {
        match self.blocks.recv_timeout(timeout) {
            Ok(block) => Some(block),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Blocks currently queued
    pub fn queued(&self) -> usize {
        self.blocks.len()
    }

    /// Number of `fill` calls that ran out of data
    pub fn underruns(&self) -> u64 {
        self.underruns
    }

    fn swap_in(&mut self, block: Vec<i16>) {
        let finished = std::mem::replace(&mut self.current, block);
        self.position = 0;
        if finished.capacity() > 0 {
            // Hand the buffer back to the writer; drop it if the spare queue is full
            let _ = self.spare.try_send(finished);
        }
    }
}
