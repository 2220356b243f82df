//! Event sink: the single ordered MIDI output shared by every listener
//!
//! Every emission takes the transport lock, writes one complete message and
//! flushes it before the lock is released, so messages from concurrent
//! listeners never interleave.

pub mod log_transport;
pub mod memory;
pub mod midir_transport;

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, trace};

use crate::error::SinkError;
use crate::mapping::Note;
use crate::midi::{format_hex, MidiMessage, PITCH_BEND_CENTER};

pub use log_transport::LogTransport;
pub use memory::{MemoryLog, MemoryTransport};
pub use midir_transport::MidirTransport;

/// Byte-level MIDI output
///
/// Implementations receive complete messages, one call per message.
pub trait MidiTransport: Send {
    /// Port name for logs
    fn name(&self) -> &str;

    fn send(&mut self, bytes: &[u8]) -> Result<(), SinkError>;

    /// Push anything buffered out to the receiver
    fn flush(&mut self) -> Result<(), SinkError> {
        Ok(())
    }

    /// Release the underlying port
    fn close(&mut self) {}
}

/// A translated hit or release, ready to be sent
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NoteEvent {
    pub note: Note,
    pub on: bool,
    pub velocity: u8,
}

impl NoteEvent {
    pub fn on(note: Note, velocity: u8) -> Self {
        Self { note, on: true, velocity }
    }

    pub fn off(note: Note, velocity: u8) -> Self {
        Self { note, on: false, velocity }
    }

    /// Wire message; releases always go out with velocity 0
    pub fn to_message(&self, channel: u8) -> MidiMessage {
        if self.on {
            MidiMessage::NoteOn {
                channel,
                note: self.note.get(),
                velocity: self.velocity,
            }
        } else {
            MidiMessage::NoteOff {
                channel,
                note: self.note.get(),
                velocity: 0,
            }
        }
    }
}

/// Messages sent once at startup to clear stale synthesizer state
pub fn reset_sequence(channel: u8) -> [MidiMessage; 3] {
    [
        MidiMessage::ControlChange { channel: 0, cc: 0, value: 0 },
        MidiMessage::ProgramChange { channel, program: 0 },
        MidiMessage::PitchBend { channel, value: PITCH_BEND_CENTER },
    ]
}

/// Serialized access to the output transport
pub struct EventSink {
    transport: Mutex<Option<Box<dyn MidiTransport>>>,
    channel: u8,
    emitted: AtomicU64,
}

impl EventSink {
    /// Take ownership of the transport and send the reset sequence
    ///
    /// `channel` is the wire channel (0-15).
    pub fn open(mut transport: Box<dyn MidiTransport>, channel: u8) -> Result<Self, SinkError> {
        let channel = channel & 0x0F;
        for message in reset_sequence(channel) {
            transport.send(&message.encode())?;
            transport.flush()?;
        }
        info!(
            "MIDI output '{}' ready on channel {}",
            transport.name(),
            channel + 1
        );

        Ok(Self {
            transport: Mutex::new(Some(transport)),
            channel,
            emitted: AtomicU64::new(0),
        })
    }

    /// Send one note on/off, fully flushed before returning
    pub fn emit(&self, event: NoteEvent) -> Result<(), SinkError> {
        let message = event.to_message(self.channel);
        let bytes = message.encode();

        let mut guard = self.transport.lock();
        let transport = guard.as_mut().ok_or(SinkError::Closed)?;
        transport.send(&bytes)?;
        transport.flush()?;
        drop(guard);

        self.emitted.fetch_add(1, Ordering::Relaxed);
        trace!("Sent: {} | {}", format_hex(&bytes), message);
        Ok(())
    }

    pub fn flush(&self) -> Result<(), SinkError> {
        match self.transport.lock().as_mut() {
            Some(transport) => transport.flush(),
            None => Ok(()),
        }
    }

    /// Release the transport; returns false if it was already closed
    pub fn close(&self) -> bool {
        let Some(mut transport) = self.transport.lock().take() else {
            return false;
        };
        // Best effort, the port goes away either way
        if let Err(e) = transport.flush() {
            debug!("Flush on close failed: {}", e);
        }
        transport.close();
        info!(
            "Closed MIDI output '{}' after {} notes",
            transport.name(),
            self.emitted()
        );
        true
    }

    pub fn is_closed(&self) -> bool {
        self.transport.lock().is_none()
    }

    /// Number of note messages emitted so far
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl Drop for EventSink {
    fn drop(&mut self) {
        self.close();
    }
}
