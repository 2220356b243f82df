//! Linux joystick API reader
//!
//! `/dev/input/jsN` yields fixed 8-byte `js_event` records in native byte order:
//! `u32 time (ms)`, `i16 value`, `u8 type`, `u8 number`.

use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

use super::{ControlKind, DeviceOpener, InputSource, RawControlEvent};
use crate::error::InputError;

/// Size of one `js_event` record
pub const EVENT_SIZE: usize = 8;

const JS_EVENT_BUTTON: u8 = 0x01;
const JS_EVENT_AXIS: u8 = 0x02;
const JS_EVENT_INIT: u8 = 0x80;

/// An opened joystick device
pub struct JoystickDevice<R = File> {
    reader: R,
    path: PathBuf,
}

impl JoystickDevice<File> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, InputError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| InputError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        debug!("Opened joystick {}", path.display());
        Ok(Self::from_reader(file, path))
    }
}

impl<R: Read> JoystickDevice<R> {
    pub fn from_reader(reader: R, path: impl Into<PathBuf>) -> Self {
        Self {
            reader,
            path: path.into(),
        }
    }

    /// Fill one record; `Ok(false)` on a clean end of stream
    fn read_record(&mut self, buf: &mut [u8; EVENT_SIZE]) -> Result<bool, InputError> {
        let mut filled = 0;
        while filled < EVENT_SIZE {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) if filled == 0 => return Ok(false),
                Ok(0) => {
                    return Err(InputError::ShortRead {
                        got: filled,
                        expected: EVENT_SIZE,
                    })
                }
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
        Ok(true)
    }
}

/// Decode one record; `None` for event types other than button or axis
pub fn decode_event(buf: &[u8; EVENT_SIZE]) -> Option<RawControlEvent> {
    let time_ms = u32::from_ne_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let value = i16::from_ne_bytes([buf[4], buf[5]]);
    let kind = match buf[6] & !JS_EVENT_INIT {
        JS_EVENT_BUTTON => ControlKind::Button,
        JS_EVENT_AXIS => ControlKind::Axis,
        _ => return None,
    };

    Some(RawControlEvent {
        kind,
        index: buf[7],
        value,
        init: buf[6] & JS_EVENT_INIT != 0,
        time_ms,
    })
}

/// Encode an event as a `js_event` record
pub fn encode_event(event: &RawControlEvent) -> [u8; EVENT_SIZE] {
    let mut buf = [0u8; EVENT_SIZE];
    buf[..4].copy_from_slice(&event.time_ms.to_ne_bytes());
    buf[4..6].copy_from_slice(&event.value.to_ne_bytes());
    buf[6] = match event.kind {
        ControlKind::Button => JS_EVENT_BUTTON,
        ControlKind::Axis => JS_EVENT_AXIS,
    } | if event.init { JS_EVENT_INIT } else { 0 };
    buf[7] = event.index;
    buf
}

impl<R: Read + Send> InputSource for JoystickDevice<R> {
    fn read_next(&mut self) -> Result<Option<RawControlEvent>, InputError> {
        let mut buf = [0u8; EVENT_SIZE];
        loop {
            if !self.read_record(&mut buf)? {
                return Ok(None);
            }
            match decode_event(&buf) {
                Some(event) => return Ok(Some(event)),
                None => trace!("{}: skipping event type {:#04x}", self.path.display(), buf[6]),
            }
        }
    }
}

/// Opens slot paths as joystick devices
#[derive(Debug, Default, Clone, Copy)]
pub struct JoystickOpener;

impl DeviceOpener for JoystickOpener {
    fn open(&self, _slot: usize, path: &str) -> Result<Box<dyn InputSource>, InputError> {
        Ok(Box::new(JoystickDevice::open(path)?))
    }
}
