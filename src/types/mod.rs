pub mod events;
pub mod profile;
pub mod waveform;
