pub mod engine;
pub mod oscillator;
pub mod parameters;
pub mod producer;
