use crate::types::events::ControlEvent;

/// One line of the text control protocol
#[derive(Debug, Clone, PartialEq)]
pub enum ControlMessage {
    Event(ControlEvent),
    /// Blank line or comment
    Empty,
    /// Unparseable line with the reason
    Invalid(String),
}

impl ControlMessage {
    /// Parse a single command line
    ///
    /// Keywords are case-insensitive; anything after `#` is a comment.
    pub fn parse(line: &str) -> Self {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            return ControlMessage::Empty;
        }

        let mut words = line.split_whitespace();
        let keyword = words.next().unwrap_or("").to_lowercase();
        let args: Vec<&str> = words.collect();

        let event = match (keyword.as_str(), args.as_slice()) {
            ("freq" | "frequency", [hz]) => parse_number(hz).map(ControlEvent::Frequency),
            ("amp" | "amplitude", [gain]) => parse_number(gain).map(ControlEvent::Amplitude),
            ("vol" | "volume", [gain]) => parse_number(gain).map(ControlEvent::Volume),
            ("sensor", [intensity]) => parse_number(intensity).map(ControlEvent::SensorIntensity),
            ("standby", [flag]) => parse_flag(flag).map(ControlEvent::Standby),
            ("set" | "update", [hz, gain]) => {
                let frequency = parse_number(hz);
                let amplitude = parse_number(gain);
                frequency.and_then(|f| amplitude.map(|a| ControlEvent::update(f, a)))
            }
            ("start", []) => Ok(ControlEvent::Start),
            ("stop", []) => Ok(ControlEvent::Stop),
            ("stats", []) => Ok(ControlEvent::Stats),
            ("quit" | "exit", []) => Ok(ControlEvent::Quit),
            (
                "freq" | "frequency" | "amp" | "amplitude" | "vol" | "volume" | "sensor"
                | "standby" | "set" | "update" | "start" | "stop" | "stats" | "quit" | "exit",
                _,
            ) => Err(format!("wrong number of arguments for '{keyword}'")),
            _ => Err(format!("unknown command '{keyword}'")),
        };

        match event {
            Ok(event) => ControlMessage::Event(event),
            Err(reason) => ControlMessage::Invalid(reason),
        }
    }

    /// Convert to a control event, if this line carried one
    pub fn to_control_event(&self) -> Option<ControlEvent> {
        match self {
            ControlMessage::Event(event) => Some(*event),
            ControlMessage::Empty | ControlMessage::Invalid(_) => None,
        }
    }
}

fn parse_number(word: &str) -> Result<f32, String> {
    word.parse::<f32>()
        .map_err(|_| format!("'{word}' is not a number"))
}

fn parse_flag(word: &str) -> Result<bool, String> {
    match word.to_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        _ => Err(format!("'{word}' is not on/off")),
    }
}
