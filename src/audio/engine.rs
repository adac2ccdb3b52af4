use std::sync::Arc;
use tracing::info;

use super::{
    oscillator::{Interpolation, ToneOscillator},
    parameters::{ControlSurface, EngineStats},
    producer::AudioProducer,
};
use crate::dsp::wavetable::{WaveTable, DEFAULT_TABLE_SIZE};
use crate::error::EngineError;
use crate::sink::{AudioBackend, StreamSpec};
use crate::types::{profile::Profile, waveform::Waveform};

/// Fixed parameters of an engine instance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineSettings {
    pub profile: Profile,
    pub sample_rate: u32,
    /// Frames per block
    pub block_size: usize,
    pub table_size: usize,
    pub waveform: Waveform,
    pub interpolation: Interpolation,
}

impl EngineSettings {
    /// Settings with the profile's default sample rate and block size
    pub fn for_profile(profile: Profile) -> Self {
        Self {
            profile,
            sample_rate: profile.default_sample_rate(),
            block_size: profile.default_block_size(),
            table_size: DEFAULT_TABLE_SIZE,
            waveform: Waveform::Sine,
            interpolation: Interpolation::Truncate,
        }
    }

    pub fn stream_spec(&self) -> StreamSpec {
        StreamSpec::mono_i16(self.sample_rate, self.block_size)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::for_profile(Profile::default())
    }
}

/// Lifecycle state of the render loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    Stopped,
    Running,
}

/// Tone synthesis engine
///
/// Owns the wave table and at most one render thread. Parameter setters take
/// `&self` and may be called from any thread; share `controls()` to drive the
/// engine from somewhere that does not own it.
pub struct SynthEngine {
    settings: EngineSettings,
    backend: Arc<dyn AudioBackend>,
    table: Arc<WaveTable>,
    controls: Arc<ControlSurface>,
    stats: Arc<EngineStats>,
    producer: Option<AudioProducer>,
}

impl SynthEngine {
    /// Create a stopped engine that will open sinks through `backend`
    pub fn new(settings: EngineSettings, backend: Arc<dyn AudioBackend>) -> Self {
        let table = Arc::new(WaveTable::new(settings.waveform, settings.table_size));

        Self {
            settings,
            backend,
            table,
            controls: Arc::new(ControlSurface::new()),
            stats: Arc::new(EngineStats::new()),
            producer: None,
        }
    }

    /// Open the sink and start rendering; does nothing if already running
    pub fn start(&mut self) -> Result<(), EngineError> {
        if let Some(producer) = &self.producer {
            if !producer.is_finished() {
                return Ok(());
            }
            // The thread died underneath us, clean up before restarting
            self.stop();
        }

        let oscillator = ToneOscillator::new(self.settings.sample_rate, Arc::clone(&self.table))
            .with_interpolation(self.settings.interpolation);

        let producer = AudioProducer::spawn(
            Arc::clone(&self.backend),
            self.settings.stream_spec(),
            self.settings.profile,
            oscillator,
            Arc::clone(&self.controls),
            Arc::clone(&self.stats),
        )?;
        self.producer = Some(producer);

        info!(
            profile = ?self.settings.profile,
            sample_rate = self.settings.sample_rate,
            block_size = self.settings.block_size,
            "engine started"
        );
        Ok(())
    }

    /// Stop rendering and release the sink; safe to call at any time
    pub fn stop(&mut self) {
        if let Some(producer) = self.producer.take() {
            producer.stop();
            info!("engine stopped");
        }
    }

    pub fn state(&self) -> EngineState {
        match &self.producer {
            Some(producer) if !producer.is_finished() => EngineState::Running,
            _ => EngineState::Stopped,
        }
    }

    pub fn is_running(&self) -> bool {
        self.state() == EngineState::Running
    }

    pub fn set_frequency(&self, hz: f32) {
        self.controls.set_frequency(hz);
    }

    pub fn set_amplitude(&self, gain: f32) {
        self.controls.set_amplitude(gain);
    }

    pub fn set_standby(&self, standby: bool) {
        self.controls.set_standby(standby);
    }

    pub fn set_volume(&self, gain: f32) {
        self.controls.set_volume(gain);
    }

    pub fn set_sensor_modulation(&self, intensity: f32) {
        self.controls.set_sensor_modulation(intensity);
    }

    /// Push a frequency/amplitude pair read by the next block
    pub fn update(&self, frequency: f32, amplitude: f32) {
        self.controls.update(frequency, amplitude);
    }

    pub fn controls(&self) -> Arc<ControlSurface> {
        Arc::clone(&self.controls)
    }

    pub fn stats(&self) -> Arc<EngineStats> {
        Arc::clone(&self.stats)
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }
}

impl Drop for SynthEngine {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{loopback::LoopbackBackend, pipe::PipeReader, ReleaseSignal};
    use crossbeam_channel::Receiver;
    use std::f64::consts::TAU;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::{Duration, Instant};

    const TIMEOUT: Duration = Duration::from_secs(2);

    struct UnavailableBackend;

    impl AudioBackend for UnavailableBackend {
        fn open(
            &self,
            _spec: &StreamSpec,
            _release: ReleaseSignal,
        ) -> Result<Box<dyn crate::sink::AudioSink>, EngineError> {
            Err(EngineError::device_unavailable("no output device"))
        }
    }

    /// Opens sinks whose first write brings the render thread down
    #[derive(Default)]
    struct CrashingBackend {
        opens: AtomicUsize,
    }

    struct CrashingSink;

    impl crate::sink::AudioSink for CrashingSink {
        fn write(&mut self, _block: &[i16]) -> Result<(), crate::sink::SinkError> {
            panic!("sink crashed");
        }
    }

    impl AudioBackend for CrashingBackend {
        fn open(
            &self,
            _spec: &StreamSpec,
            _release: ReleaseSignal,
        ) -> Result<Box<dyn crate::sink::AudioSink>, EngineError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(CrashingSink))
        }
    }

    fn fast_settings() -> EngineSettings {
        EngineSettings {
            profile: Profile::HighFidelity,
            sample_rate: 11_025,
            block_size: 64,
            ..EngineSettings::default()
        }
    }

    fn loopback_engine() -> (SynthEngine, Arc<LoopbackBackend>, Receiver<PipeReader>) {
        let (backend, readers) = LoopbackBackend::new(2);
        let backend = Arc::new(backend);
        let engine = SynthEngine::new(fast_settings(), backend.clone());
        (engine, backend, readers)
    }

    fn peak(block: &[i16]) -> i16 {
        block.iter().map(|s| s.saturating_abs()).max().unwrap_or(0)
    }

    #[test]
    fn test_start_is_idempotent() {
        let (mut engine, backend, readers) = loopback_engine();

        engine.start().unwrap();
        engine.start().unwrap();

        assert!(engine.is_running());
        assert_eq!(backend.open_count(), 1);
        assert!(readers.recv_timeout(TIMEOUT).is_ok());
        assert!(readers.try_recv().is_err());

        engine.stop();
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (mut engine, _backend, _readers) = loopback_engine();

        // Never started
        engine.stop();
        assert_eq!(engine.state(), EngineState::Stopped);

        engine.start().unwrap();
        engine.stop();
        engine.stop();
        assert_eq!(engine.state(), EngineState::Stopped);
    }

    #[test]
    fn test_restart_opens_new_sink() {
        let (mut engine, backend, _readers) = loopback_engine();

        engine.start().unwrap();
        engine.stop();
        engine.start().unwrap();

        assert_eq!(backend.open_count(), 2);
        engine.stop();
    }

    #[test]
    fn test_device_unavailable_keeps_engine_stopped() {
        let mut engine = SynthEngine::new(fast_settings(), Arc::new(UnavailableBackend));

        let result = engine.start();
        assert!(matches!(result, Err(EngineError::DeviceUnavailable(_))));
        assert_eq!(engine.state(), EngineState::Stopped);

        // Teardown path still safe
        engine.stop();
    }

    #[test]
    fn test_end_to_end_tone() {
        let (mut engine, _backend, readers) = loopback_engine();
        engine.update(440.0, 1.0);
        engine.set_standby(false);
        engine.start().unwrap();

        let reader = readers.recv_timeout(TIMEOUT).unwrap();
        let block = reader.next_block(TIMEOUT).unwrap();
        assert_eq!(block[0], 0);

        // Truncating lookup stays within one table step of the ideal sine
        let tolerance = (TAU / 4096.0 * 32767.0).ceil() + 1.0;
        for (k, &sample) in block.iter().enumerate() {
            let expected = ((TAU * 440.0 * k as f64 / 11_025.0).sin() * 32767.0).round();
            assert!((sample as f64 - expected).abs() <= tolerance);
        }

        engine.stop();
    }

    #[test]
    fn test_standby_silences_output() {
        let (mut engine, _backend, readers) = loopback_engine();
        engine.update(440.0, 1.0);
        engine.set_standby(false);
        engine.start().unwrap();

        let reader = readers.recv_timeout(TIMEOUT).unwrap();
        let block = reader.next_block(TIMEOUT).unwrap();
        assert!(peak(&block) > 0);

        engine.set_standby(true);
        let requested = Instant::now();

        // Blocks already queued or in flight may still carry tone
        for _ in 0..4 {
            reader.next_block(TIMEOUT).unwrap();
        }
        for _ in 0..8 {
            let block = reader.next_block(TIMEOUT).unwrap();
            assert!(block.iter().all(|&s| s == 0));
        }
        assert!(requested.elapsed() < Duration::from_millis(200));

        engine.stop();
    }

    #[test]
    fn test_high_fidelity_standby_keeps_block_cadence() {
        let (backend, readers) = LoopbackBackend::new(16);
        let mut engine = SynthEngine::new(fast_settings(), Arc::new(backend));
        engine.set_standby(true);
        engine.start().unwrap();

        let reader = readers.recv_timeout(TIMEOUT).unwrap();
        let started = Instant::now();
        for _ in 0..10 {
            let block = reader.next_block(TIMEOUT).unwrap();
            assert!(block.iter().all(|&s| s == 0));
        }
        // A single low-power nap would already take 100 ms
        assert!(started.elapsed() < Duration::from_millis(100));

        engine.stop();
    }

    #[test]
    fn test_state_reports_stopped_after_render_thread_dies() {
        let backend = Arc::new(CrashingBackend::default());
        let mut engine = SynthEngine::new(fast_settings(), backend.clone());
        engine.start().unwrap();

        let deadline = Instant::now() + TIMEOUT;
        while engine.is_running() && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(5));
        }
        assert_eq!(engine.state(), EngineState::Stopped);

        // A dead producer is replaced on the next start
        engine.start().unwrap();
        assert_eq!(backend.opens.load(Ordering::SeqCst), 2);
        engine.stop();
    }

    #[test]
    fn test_standby_ignores_frequency_and_amplitude() {
        let (mut engine, _backend, readers) = loopback_engine();
        engine.update(1234.0, 1.0);
        engine.set_standby(true);
        engine.start().unwrap();

        let reader = readers.recv_timeout(TIMEOUT).unwrap();
        for _ in 0..5 {
            let block = reader.next_block(TIMEOUT).unwrap();
            assert!(block.iter().all(|&s| s == 0));
        }

        engine.stop();
    }

    #[test]
    fn test_amplitude_below_threshold_is_silent() {
        let (mut engine, _backend, readers) = loopback_engine();
        engine.update(440.0, 0.005);
        engine.set_standby(false);
        engine.start().unwrap();

        let reader = readers.recv_timeout(TIMEOUT).unwrap();
        for _ in 0..3 {
            let block = reader.next_block(TIMEOUT).unwrap();
            assert_eq!(peak(&block), 0);
        }

        engine.stop();
    }

    #[test]
    fn test_rapid_amplitude_updates_settle() {
        let (mut engine, _backend, readers) = loopback_engine();
        // A quarter of the sample rate hits the table peak every period
        engine.update(11_025.0 / 4.0, 0.5);
        engine.set_standby(false);
        engine.start().unwrap();

        let reader = readers.recv_timeout(TIMEOUT).unwrap();
        let block = reader.next_block(TIMEOUT).unwrap();
        assert_eq!(peak(&block), 16384);

        engine.set_amplitude(0.5);
        engine.set_amplitude(1.0);

        let settled = (0..10)
            .filter_map(|_| reader.next_block(TIMEOUT))
            .any(|block| peak(&block) == 32767);
        assert!(settled);

        engine.stop();
    }

    #[test]
    fn test_volume_scales_output() {
        let (mut engine, _backend, readers) = loopback_engine();
        engine.update(11_025.0 / 4.0, 1.0);
        engine.set_volume(0.25);
        engine.set_standby(false);
        engine.start().unwrap();

        let reader = readers.recv_timeout(TIMEOUT).unwrap();
        let block = reader.next_block(TIMEOUT).unwrap();
        assert_eq!(peak(&block), 8192);

        engine.stop();
    }

    #[test]
    fn test_stats_count_blocks() {
        let (mut engine, _backend, readers) = loopback_engine();
        engine.start().unwrap();

        let reader = readers.recv_timeout(TIMEOUT).unwrap();
        for _ in 0..3 {
            reader.next_block(TIMEOUT).unwrap();
        }
        engine.stop();

        let stats = engine.stats();
        assert!(stats.total_blocks() >= 3);
        assert_eq!(stats.silent_blocks(), stats.total_blocks());
        assert_eq!(stats.take_block_count() as u64, stats.total_blocks());
    }
}
