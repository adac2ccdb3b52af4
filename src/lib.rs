//! Real-time tone synthesis for gesture-driven feedback.
//!
//! A [`SynthEngine`](audio::engine::SynthEngine) renders a wave table
//! oscillator on a dedicated thread into a blocking audio sink. Controllers
//! adjust frequency, amplitude and standby at any rate through a lock-free
//! control surface.

pub mod audio;
pub mod config;
pub mod control;
pub mod dsp;
pub mod error;
pub mod logging;
pub mod sink;
pub mod types;

pub use audio::engine::{EngineSettings, EngineState, SynthEngine};
pub use audio::oscillator::{Interpolation, ToneOscillator};
pub use audio::parameters::{ControlSurface, EngineStats};
pub use error::EngineError;
pub use sink::{AudioBackend, AudioSink, SinkError, StreamSpec};
pub use types::{profile::Profile, waveform::Waveform};
