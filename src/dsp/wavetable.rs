use std::ops::Index;

use crate::types::waveform::Waveform;

/// Default number of entries in one waveform period
pub const DEFAULT_TABLE_SIZE: usize = 4096;

/// One precomputed period of a waveform
/// Immutable after construction, so it can be shared across threads behind an `Arc`
#[derive(Debug, Clone)]
pub struct WaveTable {
    samples: Box<[f32]>,
    /// `len - 1`, valid as an index mask because the length is a power of two
    mask: usize,
}

impl WaveTable {
    /// Build a table of `size` entries where `table[i] = waveform(i / size)`
    ///
    /// `size` is rounded up to the next power of two (minimum 2).
    pub fn new(waveform: Waveform, size: usize) -> Self {
        let size = size.max(2).next_power_of_two();
        let samples: Box<[f32]> = (0..size)
            .map(|i| waveform.evaluate(i as f64 / size as f64) as f32)
            .collect();

        Self {
            samples,
            mask: size - 1,
        }
    }

    /// Sine table of the default size
    pub fn sine() -> Self {
        Self::new(Waveform::Sine, DEFAULT_TABLE_SIZE)
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Entry at `index`, wrapping around the period
    #[inline]
    pub fn wrapped(&self, index: usize) -> f32 {
        self.samples[index & self.mask]
    }

    /// Truncating lookup of `phase` (0.0 to 1.0): `table[floor(phase * N) mod N]`
    #[inline]
    pub fn lookup(&self, phase: f64) -> f32 {
        let position = (phase * self.samples.len() as f64).floor() as i64;
        self.wrapped(position.rem_euclid(self.samples.len() as i64) as usize)
    }

    /// Linear interpolation between the two entries surrounding `phase`
    #[inline]
    pub fn lookup_linear(&self, phase: f64) -> f32 {
        let position = phase * self.samples.len() as f64;
        let floor = position.floor();
        let index = (floor as i64).rem_euclid(self.samples.len() as i64) as usize;
        let frac = (position - floor) as f32;

        let a = self.wrapped(index);
        let b = self.wrapped(index + 1);
        a + (b - a) * frac
    }
}

impl Default for WaveTable {
    fn default() -> Self {
        Self::sine()
    }
}

impl Index<usize> for WaveTable {
    type Output = f32;

    fn index(&self, index: usize) -> &f32 {
        &self.samples[index]
    }
}
