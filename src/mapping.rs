//! Mapping table: (slot, control kind, control index) → output note
//!
//! Built once from the device configuration and never mutated afterwards.
//! Each slot's mapping is reference counted so a listener can hold its own
//! read-only view without borrowing the whole table.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use crate::config::DeviceConfig;
use crate::input::ControlKind;
use crate::midi::MAX_DATA;

/// A playable MIDI note number (1-127)
///
/// Note 0 is reserved for "unmapped" in the configuration and can never be
/// constructed, so it can never be emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Note(u8);

impl Note {
    pub fn new(value: u8) -> Option<Self> {
        (1..=MAX_DATA).contains(&value).then_some(Self(value))
    }

    pub fn get(self) -> u8 {
        self.0
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Button and axis mappings for one device slot
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotMapping {
    buttons: HashMap<u8, Note>,
    axes: HashMap<u8, Note>,
}

impl SlotMapping {
    pub fn from_device(device: &DeviceConfig) -> Self {
        Self {
            buttons: playable(&device.buttons),
            axes: playable(&device.axes),
        }
    }

    pub fn lookup(&self, kind: ControlKind, index: u8) -> Option<Note> {
        match kind {
            ControlKind::Button => self.buttons.get(&index).copied(),
            ControlKind::Axis => self.axes.get(&index).copied(),
        }
    }

    /// Number of mapped controls
    pub fn len(&self) -> usize {
        self.buttons.len() + self.axes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn playable(controls: &BTreeMap<u8, u8>) -> HashMap<u8, Note> {
    controls
        .iter()
        .filter_map(|(index, note)| Note::new(*note).map(|n| (*index, n)))
        .collect()
}

/// Immutable mapping snapshot for every configured slot
#[derive(Debug, Clone, Default)]
pub struct MappingTable {
    slots: Vec<Arc<SlotMapping>>,
}

impl MappingTable {
    pub fn from_config(devices: &[DeviceConfig]) -> Self {
        Self {
            slots: devices
                .iter()
                .map(|d| Arc::new(SlotMapping::from_device(d)))
                .collect(),
        }
    }

    /// Configured note for a control, or `None` when unmapped
    pub fn lookup(&self, slot: usize, kind: ControlKind, index: u8) -> Option<Note> {
        self.slots.get(slot)?.lookup(kind, index)
    }

    /// Read-only view of one slot, handed to that slot's listener
    pub fn slot(&self, slot: usize) -> Option<Arc<SlotMapping>> {
        self.slots.get(slot).cloned()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use proptest::prelude::*;

    #[test]
    fn test_note_rejects_zero_and_high() {
        assert_eq!(Note::new(0), None);
        assert_eq!(Note::new(128), None);
        assert_eq!(Note::new(46).map(Note::get), Some(46));
    }

    #[test]
    fn test_lookup_default_mapping() {
        let table = MappingTable::from_config(&AppConfig::default().devices);

        assert_eq!(table.len(), 2);
        assert_eq!(table.lookup(0, ControlKind::Button, 3), Note::new(46));
        assert_eq!(table.lookup(0, ControlKind::Axis, 5), Note::new(54));
        assert_eq!(table.lookup(1, ControlKind::Button, 12), Note::new(61));
        // Axis 4 on slot 1 is not mapped, button 4 on slot 0 is
        assert_eq!(table.lookup(1, ControlKind::Axis, 4), None);
        assert_eq!(table.lookup(0, ControlKind::Button, 4), Note::new(44));
    }

    #[test]
    fn test_zero_note_is_unmapped() {
        let device = DeviceConfig::new("/dev/input/js0").button(2, 0).axis(1, 0);
        let table = MappingTable::from_config(&[device]);

        assert_eq!(table.lookup(0, ControlKind::Button, 2), None);
        assert_eq!(table.lookup(0, ControlKind::Axis, 1), None);
        assert!(table.slot(0).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_slot_is_unmapped() {
        let table = MappingTable::from_config(&[]);
        assert!(table.is_empty());
        assert_eq!(table.lookup(3, ControlKind::Button, 0), None);
        assert!(table.slot(3).is_none());
    }

    proptest! {
        #[test]
        fn lookup_matches_config(
            buttons in proptest::collection::btree_map(any::<u8>(), 0u8..=127, 0..32),
            index in any::<u8>(),
        ) {
            let device = DeviceConfig {
                path: None,
                buttons: buttons.clone(),
                axes: Default::default(),
            };
            let table = MappingTable::from_config(&[device]);

            let expected = buttons.get(&index).copied().filter(|n| *n != 0);
            prop_assert_eq!(table.lookup(0, ControlKind::Button, index).map(Note::get), expected);
            prop_assert_eq!(table.lookup(0, ControlKind::Axis, index), None);
        }
    }
}
