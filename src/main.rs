use anyhow::{Context, Result};
use clap::Parser;
use crossbeam_channel::{select, tick, unbounded, Receiver};
use std::{path::PathBuf, sync::Arc, time::Duration};
use tracing::{debug, error, info};

use neonflux_synth::{
    config::SynthConfig,
    control::handler::ControlHandler,
    logging,
    sink::device::{list_output_devices, DeviceBackend},
    types::events::ControlEvent,
    Profile, SynthEngine,
};

/// Tone engine driven by a line-based control protocol on stdin
#[derive(Parser, Debug)]
#[command(name = "neonflux-synth")]
#[command(about = "Low-latency tone synthesis engine", long_about = None)]
struct Args {
    /// Configuration file (YAML)
    #[arg(short = 'c', long = "config")]
    config: Option<PathBuf>,

    /// Output device (name substring or index), overrides the config file
    #[arg(short = 'd', long = "device")]
    device: Option<String>,

    /// Engine profile, overrides the config file
    #[arg(long, value_enum)]
    profile: Option<Profile>,

    /// List available devices and exit
    #[arg(short = 'l', long = "list")]
    list_devices: bool,
}

fn main() -> Result<()> {
    // Parse command line arguments
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => SynthConfig::load(path)?,
        None => SynthConfig::default(),
    };

    if let Some(profile) = args.profile {
        config.override_profile(profile);
    }

    logging::init(&config.log_level);

    // Handle --list flag
    if args.list_devices {
        println!("Available Audio Output Devices:");
        for (i, device) in list_output_devices()?.iter().enumerate() {
            println!("  {}: {}", i, device);
        }
        return Ok(());
    }

    let device = args
        .device
        .unwrap_or_else(|| config.device.audioout.clone());
    let backend = Arc::new(DeviceBackend::new(device, config.engine.queue_blocks));

    let mut engine = SynthEngine::new(config.engine_settings(), backend);
    let initial = &config.initial;
    engine.update(initial.frequency, initial.amplitude);
    engine.set_volume(config.engine.volume);
    engine.set_standby(initial.standby);

    engine.start().context("Failed to start audio engine")?;

    let (event_tx, event_rx) = unbounded();
    // Not joined: a thread parked on stdin only ends with the process
    let _control = ControlHandler::stdin(event_tx).context("Failed to start control input")?;

    run_control_loop(&mut engine, event_rx);

    engine.stop();
    Ok(())
}

/// Apply control events until the controller quits, logging throughput once a second
fn run_control_loop(engine: &mut SynthEngine, event_rx: Receiver<ControlEvent>) {
    let telemetry = tick(Duration::from_secs(1));
    let stats = engine.stats();

    loop {
        select! {
            recv(event_rx) -> event => match event {
                Ok(ControlEvent::Quit) | Err(_) => break,
                Ok(event) => apply_event(engine, event),
            },
            recv(telemetry) -> _ => {
                if engine.is_running() {
                    info!(blocks_per_sec = stats.take_block_count(), "render telemetry");
                }
            }
        }
    }
}

fn apply_event(engine: &mut SynthEngine, event: ControlEvent) {
    debug!(?event, "control event");
    match event {
        ControlEvent::Frequency(hz) => engine.set_frequency(hz),
        ControlEvent::Amplitude(gain) => engine.set_amplitude(gain),
        ControlEvent::Volume(gain) => engine.set_volume(gain),
        ControlEvent::Standby(standby) => engine.set_standby(standby),
        ControlEvent::SensorIntensity(intensity) => engine.set_sensor_modulation(intensity),
        ControlEvent::Update {
            frequency,
            amplitude,
        } => engine.update(frequency, amplitude),
        ControlEvent::Start => {
            if let Err(err) = engine.start() {
                error!("{err}");
            }
        }
        ControlEvent::Stop => engine.stop(),
        ControlEvent::Stats => {
            let stats = engine.stats();
            let controls = engine.controls();
            info!(
                state = ?engine.state(),
                frequency = controls.frequency(),
                amplitude = controls.amplitude(),
                volume = controls.volume(),
                standby = controls.is_standby(),
                blocks = stats.total_blocks(),
                silent_blocks = stats.silent_blocks(),
                write_errors = stats.write_errors(),
                "engine stats"
            );
        }
        ControlEvent::Quit => {}
    }
}
