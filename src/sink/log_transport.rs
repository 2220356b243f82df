//! Log transport - prints every message instead of sending it
//!
//! Useful for:
//! - Checking a mapping without a synthesizer running
//! - Debugging which device produced which note
//! - Development on machines without a MIDI stack

use tracing::{info, warn};

use super::MidiTransport;
use crate::error::SinkError;
use crate::midi::{format_hex, gm_drum_name, MidiMessage};

pub struct LogTransport {
    name: String,
    /// Message counter for debugging
    sent: u64,
}

impl LogTransport {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sent: 0,
        }
    }
}

impl MidiTransport for LogTransport {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.sent += 1;

        match MidiMessage::parse(bytes) {
            Some(
                message @ (MidiMessage::NoteOn { note, .. } | MidiMessage::NoteOff { note, .. }),
            ) => {
                info!(
                    "🥁 {} {}  [{}] #{}",
                    message,
                    gm_drum_name(note).unwrap_or("?"),
                    format_hex(bytes),
                    self.sent
                );
            }
            Some(message) => info!("{} [{}] #{}", message, format_hex(bytes), self.sent),
            None => warn!("Unparseable MIDI bytes: {}", format_hex(bytes)),
        }
        Ok(())
    }

    fn close(&mut self) {
        info!("Log transport '{}' closed after {} messages", self.name, self.sent);
    }
}
