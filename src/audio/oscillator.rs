use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::parameters::clamp_gain;
use crate::dsp::wavetable::WaveTable;

/// Full-scale value of a signed 16-bit sample
pub const MAX_SAMPLE_VALUE: f32 = 32767.0;

/// How the oscillator reads between wave table entries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    /// `table[floor(phase * N)]`
    #[default]
    Truncate,
    /// Linear blend of the two neighbouring entries
    Linear,
}

/// Wave table oscillator with phase accumulation
/// Produces signed 16-bit mono samples
pub struct ToneOscillator {
    table: Arc<WaveTable>,
    /// Current phase position (0.0 to 1.0)
    phase: f64,
    /// Sample rate in Hz, fixed for the oscillator's lifetime
    sample_rate: u32,
    interpolation: Interpolation,
}

impl ToneOscillator {
    /// Create an oscillator reading `table` at `sample_rate`
    pub fn new(sample_rate: u32, table: Arc<WaveTable>) -> Self {
        Self {
            table,
            phase: 0.0,
            sample_rate: sample_rate.max(1),
            interpolation: Interpolation::default(),
        }
    }

    pub fn with_interpolation(mut self, interpolation: Interpolation) -> Self {
        self.interpolation = interpolation;
        self
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn phase(&self) -> f64 {
        self.phase
    }

    /// Reset phase to zero
    pub fn reset(&mut self) {
        self.phase = 0.0;
    }

    /// Phase advance per sample for `frequency`; non-finite input holds the phase
    pub fn phase_increment(&self, frequency: f32) -> f64 {
        let increment = frequency as f64 / self.sample_rate as f64;
        if increment.is_finite() {
            increment
        } else {
            0.0
        }
    }

    /// Generate next sample and advance phase
    pub fn render_sample(&mut self, frequency: f32, amplitude: f32) -> i16 {
        let increment = self.phase_increment(frequency);
        self.next_sample(increment, clamp_gain(amplitude))
    }

    /// Fill `block` with consecutive samples
    ///
    /// Frequency and amplitude are sampled once for the whole block, so a
    /// change lands on the next block boundary. The phase carries over between
    /// blocks, which keeps the waveform continuous across frequency changes.
    pub fn render_block(&mut self, block: &mut [i16], frequency: f32, amplitude: f32) {
        let increment = self.phase_increment(frequency);
        let amplitude = clamp_gain(amplitude);

        for sample in block.iter_mut() {
            *sample = self.next_sample(increment, amplitude);
        }
    }

    #[inline]
    fn next_sample(&mut self, increment: f64, amplitude: f32) -> i16 {
        let raw = match self.interpolation {
            Interpolation::Truncate => self.table.lookup(self.phase),
            Interpolation::Linear => self.table.lookup_linear(self.phase),
        };
        let output = to_i16(raw * amplitude);

        // Advance phase and wrap around
        self.phase += increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }
        if !(0.0..1.0).contains(&self.phase) {
            // Only reachable for negative or above-sample-rate frequencies
            self.phase = self.phase.rem_euclid(1.0);
            if self.phase >= 1.0 {
                self.phase = 0.0;
            }
        }

        output
    }
}

/// Scale a -1.0 to 1.0 signal to 16-bit, rounding and clamping
#[inline]
pub fn to_i16(value: f32) -> i16 {
    (value * MAX_SAMPLE_VALUE).round().clamp(-32768.0, 32767.0) as i16
}
