use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Operating profile of the render loop
/// Low power trades fidelity for fewer CPU wakeups on a wearable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
#[value(rename_all = "snake_case")]
pub enum Profile {
    #[default]
    LowPower,
    HighFidelity,
}

impl Profile {
    /// Sample rate used when the configuration does not override it
    pub fn default_sample_rate(&self) -> u32 {
        match self {
            Profile::LowPower => 11_025,
            Profile::HighFidelity => 44_100,
        }
    }

    /// Frames per rendered block when the configuration does not override it
    pub fn default_block_size(&self) -> usize {
        match self {
            Profile::LowPower => 256,
            Profile::HighFidelity => 512,
        }
    }

    /// Pause taken before each silent block, if any
    pub fn standby_nap(&self) -> Option<Duration> {
        match self {
            Profile::LowPower => Some(Duration::from_millis(100)),
            Profile::HighFidelity => None,
        }
    }
}
