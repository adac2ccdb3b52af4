/// Control events sent from the controller thread to the engine owner
/// Must be simple and fast to construct/parse
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControlEvent {
    /// Set tone frequency in Hz
    Frequency(f32),
    /// Set linear amplitude (0.0 to 1.0)
    Amplitude(f32),
    /// Set master volume (0.0 to 1.0)
    Volume(f32),
    /// Enter or leave standby
    Standby(bool),
    /// Motion intensity mapped onto frequency
    SensorIntensity(f32),
    /// Set frequency and amplitude together
    Update { frequency: f32, amplitude: f32 },
    /// Start the render loop
    Start,
    /// Stop the render loop and release the sink
    Stop,
    /// Report telemetry
    Stats,
    /// Controller finished
    Quit,
}

impl ControlEvent {
    /// Create a combined frequency/amplitude update
    pub fn update(frequency: f32, amplitude: f32) -> Self {
        ControlEvent::Update { frequency, amplitude }
    }
}

