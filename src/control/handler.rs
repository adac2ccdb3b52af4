use crossbeam_channel::Sender;
use std::io::{self, BufRead};
use std::thread::{self, JoinHandle};
use tracing::{debug, warn};

use super::command::ControlMessage;
use crate::types::events::ControlEvent;

/// Text control input handler
/// Reads command lines on its own thread and forwards parsed events
pub struct ControlHandler {
    thread: Option<JoinHandle<()>>,
}

impl ControlHandler {
    /// Start reading commands from standard input
    pub fn stdin(event_tx: Sender<ControlEvent>) -> io::Result<Self> {
        Self::spawn(io::BufReader::new(io::stdin()), event_tx)
    }

    /// Start reading commands from `input`
    /// A `Quit` event is sent when the input ends
    pub fn spawn<R>(input: R, event_tx: Sender<ControlEvent>) -> io::Result<Self>
    where
        R: BufRead + Send + 'static,
    {
        let thread = thread::Builder::new()
            .name("control-input".to_string())
            .spawn(move || {
                for line in input.lines() {
                    let line = match line {
                        Ok(line) => line,
                        Err(err) => {
                            warn!("failed to read control input: {err}");
                            break;
                        }
                    };

                    match ControlMessage::parse(&line) {
                        ControlMessage::Event(event) => {
                            let quit = event == ControlEvent::Quit;
                            if event_tx.send(event).is_err() || quit {
                                return;
                            }
                        }
                        ControlMessage::Empty => {}
                        ControlMessage::Invalid(reason) => warn!("ignoring command: {reason}"),
                    }
                }

                debug!("control input closed");
                let _ = event_tx.send(ControlEvent::Quit);
            })?;

        Ok(Self {
            thread: Some(thread),
        })
    }

    /// Wait for the input thread to finish
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
