use serde::{Deserialize, Serialize};

/// Waveform shapes a wave table can hold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Waveform {
    #[default]
    Sine,
    Triangle,
    Sawtooth,
    Square,
}

impl Waveform {
    /// Evaluate one period of this waveform at `phase` (0.0 to 1.0)
    /// Computed in f64 so table entries are exact at the quarter points
    pub fn evaluate(&self, phase: f64) -> f64 {
        use std::f64::consts::TAU;

        match self {
            Waveform::Sine => (phase * TAU).sin(),
            Waveform::Triangle => {
                // Starts at zero like the sine so a fresh phase renders silence
                if phase < 0.25 {
                    4.0 * phase
                } else if phase < 0.75 {
                    2.0 - 4.0 * phase
                } else {
                    4.0 * phase - 4.0
                }
            }
            Waveform::Sawtooth => {
                if phase < 0.5 {
                    2.0 * phase
                } else {
                    2.0 * phase - 2.0
                }
            }
            Waveform::Square => {
                if phase < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
        }
    }
}
