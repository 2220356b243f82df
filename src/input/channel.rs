//! In-memory input sources backed by crossbeam channels

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;

use super::{DeviceOpener, InputSource, RawControlEvent};
use crate::error::InputError;

/// Input source fed through a channel; ends when every sender is dropped
pub struct ChannelSource {
    rx: Receiver<RawControlEvent>,
}

impl ChannelSource {
    pub fn new(rx: Receiver<RawControlEvent>) -> Self {
        Self { rx }
    }

    /// Unbounded sender/source pair
    pub fn pair() -> (Sender<RawControlEvent>, Self) {
        let (tx, rx) = channel::unbounded();
        (tx, Self::new(rx))
    }
}

impl InputSource for ChannelSource {
    fn read_next(&mut self) -> Result<Option<RawControlEvent>, InputError> {
        Ok(self.rx.recv().ok())
    }
}

/// Hands out registered channel sources by device path
///
/// Each source can be opened once; unknown or already opened paths fail
/// like a missing device would.
#[derive(Default)]
pub struct ChannelOpener {
    sources: Mutex<HashMap<String, ChannelSource>>,
}

impl ChannelOpener {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a source under `path` and return the sender feeding it
    pub fn register(&self, path: impl Into<String>) -> Sender<RawControlEvent> {
        let (tx, source) = ChannelSource::pair();
        self.sources.lock().insert(path.into(), source);
        tx
    }
}

impl DeviceOpener for ChannelOpener {
    fn open(&self, _slot: usize, path: &str) -> Result<Box<dyn InputSource>, InputError> {
        self.sources
            .lock()
            .remove(path)
            .map(|source| Box::new(source) as Box<dyn InputSource>)
            .ok_or_else(|| InputError::Open {
                path: path.into(),
                source: io::Error::new(io::ErrorKind::NotFound, "no such channel device"),
            })
    }
}
