//! Error types for the translation core

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by an input source while opening or reading a device
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read failed: {0}")]
    Read(#[from] io::Error),

    #[error("short read: got {got} of {expected} bytes")]
    ShortRead { got: usize, expected: usize },
}

/// Errors raised by the output sink and its transport
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("MIDI output unavailable: {0}")]
    Init(String),

    #[error("output port '{0}' not found")]
    PortNotFound(String),

    #[error("failed to send MIDI message: {0}")]
    Send(String),

    #[error("sink already closed")]
    Closed,
}
