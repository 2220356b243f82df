//! Cross-device hi-hat pedal state
//!
//! Any kit's pedal moves the modifier and any kit's open hi-hat reads it, so
//! the flag is shared by every listener. Reads and writes are atomic; no
//! other ordering is required.

use std::sync::atomic::{AtomicBool, Ordering};

use crate::config::HiHatConfig;
use crate::mapping::Note;

/// Shared "pedal depressed" flag
#[derive(Debug, Default)]
pub struct HiHat {
    pedal_down: AtomicBool,
}

impl HiHat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_pedal(&self, down: bool) {
        self.pedal_down.store(down, Ordering::SeqCst);
    }

    pub fn pedal(&self) -> bool {
        self.pedal_down.load(Ordering::SeqCst)
    }
}

/// Which notes drive and are affected by the pedal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HiHatRules {
    pub pedal: Option<Note>,
    pub open: Option<Note>,
    pub closed: Option<Note>,
    pub pedal_sounds: bool,
}

impl HiHatRules {
    pub fn from_config(config: &HiHatConfig) -> Self {
        Self {
            pedal: Note::new(config.pedal_note),
            open: Note::new(config.open_note),
            closed: Note::new(config.closed_note),
            pedal_sounds: config.pedal_sounds,
        }
    }

    pub fn is_pedal(&self, note: Note) -> bool {
        self.pedal == Some(note)
    }

    /// Substitute the closed hi-hat for the open one while the pedal is down
    ///
    /// `pedal_down` must be a single snapshot of the modifier taken by the caller.
    pub fn resolve(&self, note: Note, pedal_down: bool) -> Note {
        match self.closed {
            Some(closed) if pedal_down && self.open == Some(note) => closed,
            _ => note,
        }
    }
}

impl Default for HiHatRules {
    fn default() -> Self {
        Self::from_config(&HiHatConfig::default())
    }
}
