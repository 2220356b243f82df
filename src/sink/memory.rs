//! In-memory transport that records every message

use parking_lot::Mutex;
use std::sync::Arc;

use super::MidiTransport;
use crate::error::SinkError;
use crate::midi::MidiMessage;

#[derive(Debug, Default)]
struct Log {
    messages: Vec<Vec<u8>>,
    flushes: usize,
    closes: usize,
}

/// Shared view of what a [`MemoryTransport`] received
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    inner: Arc<Mutex<Log>>,
}

impl MemoryLog {
    /// Raw messages in the order they were sent
    pub fn messages(&self) -> Vec<Vec<u8>> {
        self.inner.lock().messages.clone()
    }

    /// Messages decoded, skipping anything unparseable
    pub fn decoded(&self) -> Vec<MidiMessage> {
        self.inner
            .lock()
            .messages
            .iter()
            .filter_map(|m| MidiMessage::parse(m))
            .collect()
    }

    pub fn flushes(&self) -> usize {
        self.inner.lock().flushes
    }

    pub fn closes(&self) -> usize {
        self.inner.lock().closes
    }

    pub fn clear(&self) {
        self.inner.lock().messages.clear();
    }
}

pub struct MemoryTransport {
    log: MemoryLog,
}

impl MemoryTransport {
    pub fn new() -> (Self, MemoryLog) {
        let log = MemoryLog::default();
        (Self { log: log.clone() }, log)
    }
}

impl MidiTransport for MemoryTransport {
    fn name(&self) -> &str {
        "memory"
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        self.log.inner.lock().messages.push(bytes.to_vec());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), SinkError> {
        self.log.inner.lock().flushes += 1;
        Ok(())
    }

    fn close(&mut self) {
        self.log.inner.lock().closes += 1;
    }
}
