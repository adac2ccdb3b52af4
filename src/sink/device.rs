use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tracing::{debug, info, warn};

use super::{
    pipe::{pipe, PipeReader, PipeSink},
    AudioBackend, AudioSink, ReleaseSignal, SinkError, StreamSpec,
};
use crate::error::EngineError;

/// Output device selector meaning "whatever the host considers default"
pub const DEFAULT_DEVICE: &str = "default";

/// Audio output through the host's sound system
///
/// Rendered blocks go into a short queue that the device callback drains, so
/// the render thread blocks exactly as long as the hardware buffer is full.
pub struct DeviceBackend {
    device: String,
    queue_blocks: usize,
}

impl DeviceBackend {
    /// `device` is a name substring, an index into `list_output_devices`, or "default"
    pub fn new(device: impl Into<String>, queue_blocks: usize) -> Self {
        Self {
            device: device.into(),
            queue_blocks,
        }
    }
}

impl AudioBackend for DeviceBackend {
    fn open(
        &self,
        spec: &StreamSpec,
        release: ReleaseSignal,
    ) -> Result<Box<dyn AudioSink>, EngineError> {
        let device = select_device(&self.device)?;
        let name = device_name(&device);
        let (config, sample_format) = find_stream_config(&device, spec)?;
        let channels = config.channels as usize;

        let (sink, reader) = pipe(self.queue_blocks, release);

        let stream = match sample_format {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, reader, channels)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, reader, channels)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, reader, channels)?,
            other => {
                return Err(EngineError::device_unavailable(format!(
                    "unsupported sample format {other:?}"
                )));
            }
        };

        stream.play().map_err(EngineError::device_unavailable)?;

        info!(
            device = %name,
            sample_rate = spec.sample_rate,
            channels,
            ?sample_format,
            "opened audio output"
        );

        Ok(Box::new(DeviceSink {
            pipe: sink,
            _stream: stream,
        }))
    }
}

/// Sink that owns the running device stream
struct DeviceSink {
    pipe: PipeSink,
    _stream: cpal::Stream,
}

impl AudioSink for DeviceSink {
    fn write(&mut self, block: &[i16]) -> Result<(), SinkError> {
        self.pipe.write(block)
    }
}

/// List available audio output devices
pub fn list_output_devices() -> Result<Vec<String>, EngineError> {
    let host = cpal::default_host();

    let devices: Vec<String> = host
        .output_devices()
        .map_err(EngineError::device_unavailable)?
        .map(|device| device_name(&device))
        .collect();

    if devices.is_empty() {
        return Err(EngineError::device_unavailable("no audio output devices found"));
    }

    Ok(devices)
}

/// Find device index by name or index string
pub fn find_device_index(devices: &[String], search: &str) -> Option<usize> {
    // Try to parse as index first
    if let Ok(index) = search.parse::<usize>() {
        return (index < devices.len()).then_some(index);
    }

    // Search by name (case-insensitive substring match)
    let search_lower = search.to_lowercase();
    devices
        .iter()
        .position(|device| device.to_lowercase().contains(&search_lower))
}

fn select_device(search: &str) -> Result<cpal::Device, EngineError> {
    let host = cpal::default_host();

    if search.is_empty() || search.eq_ignore_ascii_case(DEFAULT_DEVICE) {
        return host
            .default_output_device()
            .ok_or_else(|| EngineError::device_unavailable("no default output device"));
    }

    let devices: Vec<cpal::Device> = host
        .output_devices()
        .map_err(EngineError::device_unavailable)?
        .collect();
    let names: Vec<String> = devices.iter().map(device_name).collect();

    let index = find_device_index(&names, search).ok_or_else(|| {
        EngineError::device_unavailable(format!("audio device '{search}' not found"))
    })?;

    devices
        .into_iter()
        .nth(index)
        .ok_or_else(|| EngineError::device_unavailable("selected audio device not available"))
}

fn device_name(device: &cpal::Device) -> String {
    device
        .description()
        .map(|desc| desc.name().to_string())
        .unwrap_or_else(|_| "Unknown".to_string())
}

/// Pick a supported output config running at exactly the requested sample rate
/// Fewer channels win; the mono signal is duplicated onto every channel
fn find_stream_config(
    device: &cpal::Device,
    spec: &StreamSpec,
) -> Result<(cpal::StreamConfig, cpal::SampleFormat), EngineError> {
    let rate: cpal::SampleRate = spec.sample_rate;

    let range = device
        .supported_output_configs()
        .map_err(EngineError::device_unavailable)?
        .filter(|range| range.min_sample_rate() <= rate && rate <= range.max_sample_rate())
        .filter(|range| {
            matches!(
                range.sample_format(),
                cpal::SampleFormat::F32 | cpal::SampleFormat::I16 | cpal::SampleFormat::U16
            )
        })
        .min_by_key(|range| range.channels())
        .ok_or_else(|| {
            EngineError::device_unavailable(format!(
                "no output configuration supports {} Hz",
                spec.sample_rate
            ))
        })?;

    let supported = range.with_sample_rate(rate);
    let sample_format = supported.sample_format();
    debug!(channels = supported.channels(), ?sample_format, "selected stream config");

    Ok((supported.config(), sample_format))
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut reader: PipeReader,
    channels: usize,
) -> Result<cpal::Stream, EngineError>
where
    T: cpal::SizedSample + cpal::FromSample<i16>,
{
    let channels = channels.max(1);
    // Pre-allocate so the callback does not allocate in the common case
    let mut mono = vec![0i16; 4096];

    device
        .build_output_stream(
            config,
            move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                let frames = data.len() / channels;
                if mono.len() < frames {
                    mono.resize(frames, 0);
                }

                reader.fill(&mut mono[..frames]);

                for (frame, sample) in data.chunks_mut(channels).zip(mono.iter()) {
                    let value = T::from_sample(*sample);
                    frame.fill(value);
                }
            },
            |err| warn!("audio stream error: {err}"),
            None,
        )
        .map_err(EngineError::device_unavailable)
}
