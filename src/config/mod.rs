use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::audio::engine::EngineSettings;
use crate::audio::oscillator::Interpolation;
use crate::dsp::wavetable::DEFAULT_TABLE_SIZE;
use crate::sink::device::DEFAULT_DEVICE;
use crate::types::{profile::Profile, waveform::Waveform};

/// Top-level configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SynthConfig {
    #[serde(default)]
    pub device: DeviceConfig,

    #[serde(default)]
    pub engine: EngineConfig,

    #[serde(default)]
    pub initial: InitialControls,

    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl SynthConfig {
    /// Load configuration from a YAML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: SynthConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.engine
            .validate()
            .context("Invalid engine configuration")?;
        self.initial
            .validate()
            .context("Invalid initial control values")?;

        Ok(())
    }

    /// Replace the configured profile. Sample rate and block size still
    /// follow the new profile unless they were set explicitly.
    pub fn override_profile(&mut self, profile: Profile) {
        self.engine.profile = profile;
    }

    /// Engine settings with profile defaults filled in
    pub fn engine_settings(&self) -> EngineSettings {
        self.engine.settings()
    }
}

impl Default for SynthConfig {
    fn default() -> Self {
        Self {
            device: DeviceConfig::default(),
            engine: EngineConfig::default(),
            initial: InitialControls::default(),
            log_level: default_log_level(),
        }
    }
}

/// Output device configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    /// Device name substring, index, or "default"
    #[serde(default = "default_audioout")]
    pub audioout: String,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            audioout: default_audioout(),
        }
    }
}

/// Engine configuration; unset fields follow the profile
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct EngineConfig {
    #[serde(default)]
    pub profile: Profile,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_size: Option<usize>,

    #[serde(default = "default_table_size")]
    pub table_size: usize,

    #[serde(default)]
    pub wave: Waveform,

    #[serde(default)]
    pub interpolation: Interpolation,

    /// Blocks buffered between the render thread and the device callback
    #[serde(default = "default_queue_blocks")]
    pub queue_blocks: usize,

    /// Master volume applied on top of amplitude
    #[serde(default = "default_volume")]
    pub volume: f32,
}

impl EngineConfig {
    /// Validate this engine configuration
    pub fn validate(&self) -> Result<()> {
        let settings = self.settings();

        if !(1_000..=192_000).contains(&settings.sample_rate) {
            return Err(anyhow!("Sample rate must be between 1000 and 192000 Hz"));
        }
        if !(1..=8192).contains(&settings.block_size) {
            return Err(anyhow!("Block size must be between 1 and 8192 frames"));
        }
        if !settings.table_size.is_power_of_two() || !(2..=65_536).contains(&settings.table_size) {
            return Err(anyhow!(
                "Table size must be a power of two between 2 and 65536"
            ));
        }
        if self.queue_blocks < 1 {
            return Err(anyhow!("Queue must hold at least one block"));
        }
        if !(0.0..=1.0).contains(&self.volume) {
            return Err(anyhow!("Volume must be between 0.0 and 1.0"));
        }

        Ok(())
    }

    pub fn settings(&self) -> EngineSettings {
        let defaults = EngineSettings::for_profile(self.profile);

        EngineSettings {
            sample_rate: self.sample_rate.unwrap_or(defaults.sample_rate),
            block_size: self.block_size.unwrap_or(defaults.block_size),
            table_size: self.table_size,
            waveform: self.wave,
            interpolation: self.interpolation,
            ..defaults
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            profile: Profile::default(),
            sample_rate: None,
            block_size: None,
            table_size: default_table_size(),
            wave: Waveform::default(),
            interpolation: Interpolation::default(),
            queue_blocks: default_queue_blocks(),
            volume: default_volume(),
        }
    }
}

/// Control values applied before the engine starts
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InitialControls {
    #[serde(default = "default_frequency")]
    pub frequency: f32,

    #[serde(default)]
    pub amplitude: f32,

    #[serde(default = "default_standby")]
    pub standby: bool,
}

impl InitialControls {
    pub fn validate(&self) -> Result<()> {
        if !self.frequency.is_finite() || self.frequency < 0.0 {
            return Err(anyhow!("Frequency must be a finite, non-negative value"));
        }
        if !(0.0..=1.0).contains(&self.amplitude) {
            return Err(anyhow!("Amplitude must be between 0.0 and 1.0"));
        }
        Ok(())
    }
}

impl Default for InitialControls {
    fn default() -> Self {
        Self {
            frequency: default_frequency(),
            amplitude: 0.0,
            standby: default_standby(),
        }
    }
}

// Default value functions for serde
fn default_audioout() -> String {
    DEFAULT_DEVICE.to_string()
}

fn default_queue_blocks() -> usize {
    2
}

fn default_table_size() -> usize {
    DEFAULT_TABLE_SIZE
}

fn default_frequency() -> f32 {
    440.0
}

fn default_volume() -> f32 {
    1.0
}

fn default_standby() -> bool {
    true
}

fn default_log_level() -> String {
    "info".to_string()
}
