//! Device input sources
//!
//! A listener only needs a blocking "next event" call. Concrete sources:
//! - [`joystick::JoystickDevice`]: Linux joystick API (`/dev/input/jsN`)
//! - [`channel::ChannelSource`]: in-memory events, used for embedding and tests

pub mod channel;
pub mod joystick;

use crate::error::InputError;

pub use channel::{ChannelOpener, ChannelSource};
pub use joystick::{JoystickDevice, JoystickOpener};

/// Physical control type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ControlKind {
    Button,
    Axis,
}

/// One raw event as reported by a device
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawControlEvent {
    pub kind: ControlKind,
    /// Button or axis number on the device
    pub index: u8,
    /// 0/1 for buttons, -32767..32767 for axes
    pub value: i16,
    /// Synthetic event reporting the initial state right after open
    pub init: bool,
    /// Driver timestamp in milliseconds
    pub time_ms: u32,
}

impl RawControlEvent {
    pub fn button(index: u8, pressed: bool) -> Self {
        Self {
            kind: ControlKind::Button,
            index,
            value: pressed as i16,
            init: false,
            time_ms: 0,
        }
    }

    pub fn axis(index: u8, value: i16) -> Self {
        Self {
            kind: ControlKind::Axis,
            index,
            value,
            init: false,
            time_ms: 0,
        }
    }

    pub fn with_init(mut self, init: bool) -> Self {
        self.init = init;
        self
    }
}

/// A blocking stream of raw events from one device
pub trait InputSource: Send {
    /// Block until the next event; `Ok(None)` marks the end of the stream
    fn read_next(&mut self) -> Result<Option<RawControlEvent>, InputError>;
}

/// Opens the input source configured for a slot
pub trait DeviceOpener: Send + Sync {
    fn open(&self, slot: usize, path: &str) -> Result<Box<dyn InputSource>, InputError>;
}
