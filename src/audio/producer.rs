use crossbeam_channel::{bounded, Sender};
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use super::{
    oscillator::ToneOscillator,
    parameters::{ControlSurface, EngineStats},
};
use crate::error::EngineError;
use crate::sink::{AudioBackend, AudioSink, ReleaseSignal, StreamSpec};
use crate::types::profile::Profile;

/// Amplitudes at or below this render as silence
pub const SILENCE_THRESHOLD: f32 = 0.01;

const THREAD_NAME: &str = "synth-producer";

/// Dedicated render thread feeding a blocking audio sink
///
/// The thread opens the sink itself and owns it until it exits. Dropping
/// the producer stops the thread.
pub struct AudioProducer {
    running: Arc<AtomicBool>,
    /// Dropping this sender fires the sink's release signal
    release: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl AudioProducer {
    /// Spawn the render thread and wait until its sink is open
    pub fn spawn(
        backend: Arc<dyn AudioBackend>,
        spec: StreamSpec,
        profile: Profile,
        oscillator: ToneOscillator,
        controls: Arc<ControlSurface>,
        stats: Arc<EngineStats>,
    ) -> Result<Self, EngineError> {
        let (release_tx, release_rx) = bounded::<()>(0);
        let (ready_tx, ready_rx) = bounded::<Result<(), EngineError>>(1);
        let running = Arc::new(AtomicBool::new(true));

        let render = RenderLoop {
            oscillator,
            controls,
            stats,
            running: Arc::clone(&running),
            release: ReleaseSignal::new(release_rx),
            profile,
            spec,
        };

        let thread = thread::Builder::new()
            .name(THREAD_NAME.to_string())
            .spawn(move || {
                let sink = match backend.open(&render.spec, render.release.clone()) {
                    Ok(sink) => sink,
                    Err(err) => {
                        let _ = ready_tx.send(Err(err));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));
                render.run(sink);
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => Ok(Self {
                running,
                release: Some(release_tx),
                thread: Some(thread),
            }),
            Ok(Err(err)) => {
                let _ = thread.join();
                Err(err)
            }
            Err(_) => {
                let _ = thread.join();
                Err(EngineError::device_unavailable(
                    "render thread exited before opening the sink",
                ))
            }
        }
    }

    /// Whether the render thread has exited on its own
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(|thread| thread.is_finished())
    }

    /// Stop the render loop, release the sink and join the thread
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.running.store(false, Ordering::Release);
        // Wakes a write blocked on a full sink and cuts a standby nap short
        self.release.take();

        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                warn!("render thread panicked");
            }
        }
    }
}

impl Drop for AudioProducer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// State owned by the render thread
struct RenderLoop {
    oscillator: ToneOscillator,
    controls: Arc<ControlSurface>,
    stats: Arc<EngineStats>,
    running: Arc<AtomicBool>,
    release: ReleaseSignal,
    profile: Profile,
    spec: StreamSpec,
}

impl RenderLoop {
    fn run(mut self, mut sink: Box<dyn AudioSink>) {
        let mut block = vec![0i16; self.spec.block_size.max(1)];
        let nap = self.profile.standby_nap();
        let block_duration = self.spec.block_duration();

        debug!(block_size = block.len(), profile = ?self.profile, "render loop started");

        while self.running.load(Ordering::Acquire) {
            let amplitude = self.controls.amplitude();
            let silent = self.controls.is_standby() || amplitude <= SILENCE_THRESHOLD;

            if silent {
                if let Some(nap) = nap {
                    if self.release.wait(nap) {
                        break;
                    }
                }
                block.fill(0);
            } else {
                let frequency = self.controls.frequency();
                let gain = amplitude * self.controls.volume();
                self.oscillator.render_block(&mut block, frequency, gain);
            }

            // The blocking write is the loop's only clock
            match sink.write(&block) {
                Ok(()) => self.stats.record_block(silent),
                Err(err) => {
                    self.stats.record_write_error();
                    debug!("dropped block: {err}");
                    // Keep a dead sink from turning this into a busy loop
                    if self.release.wait(block_duration) {
                        break;
                    }
                }
            }
        }

        drop(sink);
        debug!("render loop finished");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::wavetable::WaveTable;
    use crate::sink::{loopback::LoopbackBackend, SinkError};
    use std::time::{Duration, Instant};

    fn spawn_with(
        backend: Arc<dyn AudioBackend>,
        profile: Profile,
        controls: Arc<ControlSurface>,
        stats: Arc<EngineStats>,
    ) -> Result<AudioProducer, EngineError> {
        let spec = StreamSpec::mono_i16(11_025, 64);
        let oscillator = ToneOscillator::new(spec.sample_rate, Arc::new(WaveTable::sine()));
        AudioProducer::spawn(backend, spec, profile, oscillator, controls, stats)
    }

    /// Sink that fails every other write
    struct FlakySink {
        writes: usize,
    }

    impl AudioSink for FlakySink {
        fn write(&mut self, _block: &[i16]) -> Result<(), SinkError> {
            self.writes += 1;
            thread::sleep(Duration::from_millis(1));
            if self.writes % 2 == 0 {
                Err(SinkError::Write("device reconfigured".to_string()))
            } else {
                Ok(())
            }
        }
    }

    struct FlakyBackend;

    impl AudioBackend for FlakyBackend {
        fn open(
            &self,
            _spec: &StreamSpec,
            _release: ReleaseSignal,
        ) -> Result<Box<dyn AudioSink>, EngineError> {
            Ok(Box::new(FlakySink { writes: 0 }))
        }
    }

    #[test]
    fn test_tone_blocks_reach_sink() {
        let (backend, readers) = LoopbackBackend::new(2);
        let controls = Arc::new(ControlSurface::new());
        controls.update(440.0, 1.0);
        controls.set_standby(false);

        let producer = spawn_with(
            Arc::new(backend),
            Profile::HighFidelity,
            controls,
            Arc::new(EngineStats::new()),
        )
        .unwrap();

        let reader = readers.recv_timeout(Duration::from_secs(1)).unwrap();
        let block = reader.next_block(Duration::from_secs(1)).unwrap();
        assert_eq!(block.len(), 64);
        assert_eq!(block[0], 0);
        assert!(block.iter().any(|&s| s != 0));

        producer.stop();
    }

    #[test]
    fn test_write_errors_do_not_stop_loop() {
        let controls = Arc::new(ControlSurface::new());
        controls.update(440.0, 1.0);
        controls.set_standby(false);
        let stats = Arc::new(EngineStats::new());

        let producer = spawn_with(
            Arc::new(FlakyBackend),
            Profile::HighFidelity,
            controls,
            Arc::clone(&stats),
        )
        .unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while (stats.write_errors() < 3 || stats.total_blocks() < 3) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        assert!(!producer.is_finished());
        assert!(stats.write_errors() >= 3);
        assert!(stats.total_blocks() >= 3);
        producer.stop();
    }

    #[test]
    fn test_stop_unblocks_full_sink() {
        let (backend, readers) = LoopbackBackend::new(1);
        let controls = Arc::new(ControlSurface::new());
        controls.update(440.0, 1.0);
        controls.set_standby(false);

        let producer = spawn_with(
            Arc::new(backend),
            Profile::HighFidelity,
            controls,
            Arc::new(EngineStats::new()),
        )
        .unwrap();

        // Nobody drains the queue, so the render thread ends up parked in a write
        let reader = readers.recv_timeout(Duration::from_secs(1)).unwrap();
        thread::sleep(Duration::from_millis(50));
        assert_eq!(reader.queued(), 1);

        let start = Instant::now();
        producer.stop();
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_stop_cuts_standby_nap_short() {
        let (backend, _readers) = LoopbackBackend::new(2);
        let controls = Arc::new(ControlSurface::new());

        let producer = spawn_with(
            Arc::new(backend),
            Profile::LowPower,
            controls,
            Arc::new(EngineStats::new()),
        )
        .unwrap();

        thread::sleep(Duration::from_millis(10));
        let start = Instant::now();
        producer.stop();
        assert!(start.elapsed() < Duration::from_millis(90));
    }

    #[test]
    fn test_low_power_standby_paces_silent_blocks() {
        let (backend, readers) = LoopbackBackend::new(8);
        let controls = Arc::new(ControlSurface::new());
        let start = Instant::now();

        let producer = spawn_with(
            Arc::new(backend),
            Profile::LowPower,
            controls,
            Arc::new(EngineStats::new()),
        )
        .unwrap();

        let reader = readers.recv_timeout(Duration::from_secs(1)).unwrap();
        for _ in 0..3 {
            let block = reader.next_block(Duration::from_secs(1)).unwrap();
            assert!(block.iter().all(|&s| s == 0));
        }
        assert!(start.elapsed() >= Duration::from_millis(250));

        producer.stop();
    }
}
