use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};

/// Lowest motion-mapped frequency in Hz
pub const SENSOR_BASE_FREQUENCY: f32 = 100.0;
/// Frequency added per unit of motion intensity
pub const SENSOR_FREQUENCY_SPAN: f32 = 200.0;

/// Thread-safe control surface shared between the controller and the render thread
/// Each knob is an independent atomic: a stale read costs at most one block
pub struct ControlSurface {
    /// Tone frequency in Hz (stored as f32 bits)
    pub frequency: AtomicF32,
    /// Linear amplitude requested by the controller (0.0 to 1.0)
    pub amplitude: AtomicF32,
    /// Master volume applied on top of amplitude (0.0 to 1.0)
    pub volume: AtomicF32,
    /// Render silence regardless of amplitude
    pub standby: AtomicBool,
}

impl ControlSurface {
    pub fn new() -> Self {
        Self {
            frequency: AtomicF32::new(440.0), // A4 default
            amplitude: AtomicF32::new(0.0),
            volume: AtomicF32::new(1.0),
            standby: AtomicBool::new(true),
        }
    }

    pub fn set_frequency(&self, hz: f32) {
        self.frequency.store(hz, Ordering::Relaxed);
    }

    pub fn set_amplitude(&self, gain: f32) {
        self.amplitude.store(gain, Ordering::Relaxed);
    }

    pub fn set_volume(&self, gain: f32) {
        self.volume.store(gain, Ordering::Relaxed);
    }

    pub fn set_standby(&self, standby: bool) {
        self.standby.store(standby, Ordering::Relaxed);
    }

    /// Push a frequency/amplitude pair; the next block picks up both
    pub fn update(&self, frequency: f32, amplitude: f32) {
        self.set_frequency(frequency);
        self.set_amplitude(amplitude);
    }

    /// Map motion intensity onto pitch: 100 Hz at rest, +200 Hz per unit
    pub fn set_sensor_modulation(&self, intensity: f32) {
        self.set_frequency(SENSOR_BASE_FREQUENCY + intensity * SENSOR_FREQUENCY_SPAN);
    }

    pub fn frequency(&self) -> f32 {
        self.frequency.load(Ordering::Relaxed)
    }

    /// Requested amplitude clamped into 0.0 to 1.0 (NaN reads as 0.0)
    pub fn amplitude(&self) -> f32 {
        clamp_gain(self.amplitude.load(Ordering::Relaxed))
    }

    /// Master volume clamped into 0.0 to 1.0 (NaN reads as 0.0)
    pub fn volume(&self) -> f32 {
        clamp_gain(self.volume.load(Ordering::Relaxed))
    }

    pub fn is_standby(&self) -> bool {
        self.standby.load(Ordering::Relaxed)
    }
}

impl Default for ControlSurface {
    fn default() -> Self {
        Self::new()
    }
}

/// Clamp a linear gain into 0.0 to 1.0, treating NaN as silence
pub fn clamp_gain(gain: f32) -> f32 {
    if gain.is_nan() {
        0.0
    } else {
        gain.clamp(0.0, 1.0)
    }
}

/// Counters updated by the render thread, read by anyone
#[derive(Default)]
pub struct EngineStats {
    blocks_written: AtomicU32,
    total_blocks: AtomicU64,
    silent_blocks: AtomicU64,
    write_errors: AtomicU64,
}

impl EngineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_block(&self, silent: bool) {
        self.blocks_written.fetch_add(1, Ordering::Relaxed);
        self.total_blocks.fetch_add(1, Ordering::Relaxed);
        if silent {
            self.silent_blocks.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub(crate) fn record_write_error(&self) {
        self.write_errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Blocks written since the previous call
    pub fn take_block_count(&self) -> u32 {
        self.blocks_written.swap(0, Ordering::Relaxed)
    }

    /// Blocks written since the engine was created
    pub fn total_blocks(&self) -> u64 {
        self.total_blocks.load(Ordering::Relaxed)
    }

    pub fn silent_blocks(&self) -> u64 {
        self.silent_blocks.load(Ordering::Relaxed)
    }

    pub fn write_errors(&self) -> u64 {
        self.write_errors.load(Ordering::Relaxed)
    }
}

/// Atomic f32 wrapper for lock-free parameter updates
pub struct AtomicF32 {
    storage: AtomicU32,
}

impl AtomicF32 {
    pub fn new(value: f32) -> Self {
        Self {
            storage: AtomicU32::new(value.to_bits()),
        }
    }

    pub fn load(&self, ordering: Ordering) -> f32 {
        f32::from_bits(self.storage.load(ordering))
    }

    pub fn store(&self, value: f32, ordering: Ordering) {
        self.storage.store(value.to_bits(), ordering);
    }
}
