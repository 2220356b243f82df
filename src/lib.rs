//! js2midi - play drum kits and game controllers as a MIDI percussion instrument
//!
//! Reads raw Linux joystick devices (`/dev/input/jsN`), maps buttons and axes
//! to General MIDI drum notes and sends them to a single MIDI output.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod hihat;
pub mod input;
pub mod listener;
pub mod mapping;
pub mod midi;
pub mod paths;
pub mod sink;

pub use config::AppConfig;
pub use dispatcher::{DispatchReport, Dispatcher};
