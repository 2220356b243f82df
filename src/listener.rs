//! Device listener: one blocking read → translate → emit loop per device
//!
//! Each listener owns its input source and a read-only view of its slot's
//! mapping. The hi-hat modifier and the sink are the only state it shares.

use std::fmt;
use std::io;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use crate::hihat::{HiHat, HiHatRules};
use crate::input::{ControlKind, InputSource, RawControlEvent};
use crate::mapping::SlotMapping;
use crate::midi::MAX_DATA;
use crate::sink::{EventSink, NoteEvent};

/// Velocity of every button hit
pub const BUTTON_VELOCITY: u8 = MAX_DATA;

/// Velocity carried by an axis event: |value / 256|, capped at 127
pub fn axis_velocity(value: i16) -> u8 {
    (i32::from(value) / 256).unsigned_abs().min(u32::from(MAX_DATA)) as u8
}

/// Maps raw events of one slot to note events
pub struct Translator {
    mapping: Arc<SlotMapping>,
    rules: HiHatRules,
    hihat: Arc<HiHat>,
    skip_init: bool,
}

impl Translator {
    pub fn new(mapping: Arc<SlotMapping>, rules: HiHatRules, hihat: Arc<HiHat>) -> Self {
        Self {
            mapping,
            rules,
            hihat,
            skip_init: false,
        }
    }

    pub fn skip_init_events(mut self, skip: bool) -> Self {
        self.skip_init = skip;
        self
    }

    /// Translate one raw event; `None` when nothing should sound
    ///
    /// Button events on the pedal note update the shared modifier even when
    /// the pedal itself is configured not to sound.
    pub fn translate(&self, event: &RawControlEvent) -> Option<NoteEvent> {
        if event.init && self.skip_init {
            return None;
        }

        let note = self.mapping.lookup(event.kind, event.index)?;
        let on = event.value != 0;

        match event.kind {
            ControlKind::Button => {
                if self.rules.is_pedal(note) {
                    self.hihat.set_pedal(on);
                    if !self.rules.pedal_sounds {
                        return None;
                    }
                }
                let pedal_down = self.hihat.pedal();
                let note = self.rules.resolve(note, pedal_down);
                Some(NoteEvent { note, on, velocity: BUTTON_VELOCITY })
            }
            ControlKind::Axis => Some(NoteEvent {
                note,
                on,
                velocity: axis_velocity(event.value),
            }),
        }
    }
}

/// Lifecycle of a listener
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListenerState {
    Idle,
    Reading,
    Translating,
    Emitting,
    Closed,
}

/// Why a listener stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExitReason {
    EndOfStream,
    ReadError(String),
    Cancelled,
}

impl fmt::Display for ExitReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExitReason::EndOfStream => write!(f, "end of stream"),
            ExitReason::ReadError(e) => write!(f, "read error: {}", e),
            ExitReason::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Summary returned when a listener reaches `Closed`
#[derive(Debug, Clone)]
pub struct ListenerReport {
    pub slot: usize,
    pub path: String,
    pub events_read: u64,
    pub notes_emitted: u64,
    pub emit_failures: u64,
    pub reason: ExitReason,
}

pub struct Listener {
    slot: usize,
    path: String,
    source: Box<dyn InputSource>,
    translator: Translator,
    sink: Arc<EventSink>,
    cancel: CancellationToken,
    state: ListenerState,
}

impl Listener {
    pub fn new(
        slot: usize,
        path: impl Into<String>,
        source: Box<dyn InputSource>,
        translator: Translator,
        sink: Arc<EventSink>,
    ) -> Self {
        Self {
            slot,
            path: path.into(),
            source,
            translator,
            sink,
            cancel: CancellationToken::new(),
            state: ListenerState::Idle,
        }
    }

    /// Stop cooperatively before the next read once `token` is cancelled
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    pub fn state(&self) -> ListenerState {
        self.state
    }

    fn set_state(&mut self, state: ListenerState) {
        trace!("listener {}: {:?} -> {:?}", self.slot, self.state, state);
        self.state = state;
    }

    /// Run until the source ends, fails, or the token is cancelled
    pub fn run(mut self) -> ListenerReport {
        info!("Listening on {} (slot {})", self.path, self.slot);

        let mut events_read = 0u64;
        let mut notes_emitted = 0u64;
        let mut emit_failures = 0u64;

        let reason = loop {
            if self.cancel.is_cancelled() {
                break ExitReason::Cancelled;
            }

            self.set_state(ListenerState::Reading);
            let event = match self.source.read_next() {
                Ok(Some(event)) => event,
                Ok(None) => break ExitReason::EndOfStream,
                Err(e) => break ExitReason::ReadError(e.to_string()),
            };
            events_read += 1;
            trace!(
                "{}: {:?} #{} value {}{}",
                self.path,
                event.kind,
                event.index,
                event.value,
                if event.init { " (init)" } else { "" }
            );

            self.set_state(ListenerState::Translating);
            let Some(note_event) = self.translator.translate(&event) else {
                continue;
            };

            self.set_state(ListenerState::Emitting);
            match self.sink.emit(note_event) {
                Ok(()) => notes_emitted += 1,
                Err(e) => {
                    emit_failures += 1;
                    warn!("{}: failed to emit note {}: {}", self.path, note_event.note, e);
                }
            }
        };

        self.set_state(ListenerState::Closed);
        if let Err(e) = self.sink.flush() {
            debug!("{}: final flush failed: {}", self.path, e);
        }

        match &reason {
            ExitReason::ReadError(_) => warn!("Listener for {} stopped: {}", self.path, reason),
            _ => info!("Listener for {} stopped: {}", self.path, reason),
        }

        ListenerReport {
            slot: self.slot,
            path: self.path,
            events_read,
            notes_emitted,
            emit_failures,
            reason,
        }
    }

    /// Run on a dedicated OS thread, sending the report to `done` when closed
    pub fn spawn(self, done: mpsc::UnboundedSender<ListenerReport>) -> io::Result<JoinHandle<()>> {
        thread::Builder::new()
            .name(format!("listener-{}", self.slot))
            .spawn(move || {
                let report = self.run();
                // The dispatcher may already have stopped waiting
                let _ = done.send(report);
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DeviceConfig, HiHatConfig};
    use crate::input::ChannelSource;
    use crate::mapping::Note;
    use crate::sink::MemoryTransport;
    use proptest::prelude::*;

    fn kit() -> Arc<SlotMapping> {
        Arc::new(SlotMapping::from_device(
            &DeviceConfig::new("/dev/input/js0")
                .button(0, 38)
                .button(3, 46)
                .button(4, 44)
                .axis(4, 51),
        ))
    }

    fn translator(hihat: &Arc<HiHat>) -> Translator {
        Translator::new(kit(), HiHatRules::default(), hihat.clone())
    }

    fn note(n: u8) -> Note {
        Note::new(n).unwrap()
    }

    #[test]
    fn test_unmapped_controls_are_dropped() {
        let t = translator(&Arc::new(HiHat::new()));
        assert_eq!(t.translate(&RawControlEvent::button(7, true)), None);
        assert_eq!(t.translate(&RawControlEvent::axis(0, 12000)), None);
    }

    #[test]
    fn test_button_hit_and_release() {
        let t = translator(&Arc::new(HiHat::new()));
        assert_eq!(
            t.translate(&RawControlEvent::button(0, true)),
            Some(NoteEvent::on(note(38), 127))
        );
        assert_eq!(
            t.translate(&RawControlEvent::button(0, false)),
            Some(NoteEvent::off(note(38), 127))
        );
    }

    #[test]
    fn test_axis_velocity_ignores_direction() {
        let t = translator(&Arc::new(HiHat::new()));
        assert_eq!(
            t.translate(&RawControlEvent::axis(4, -32767)),
            Some(NoteEvent::on(note(51), 127))
        );
        assert_eq!(
            t.translate(&RawControlEvent::axis(4, 1024)),
            Some(NoteEvent::on(note(51), 4))
        );
        assert_eq!(
            t.translate(&RawControlEvent::axis(4, 0)),
            Some(NoteEvent::off(note(51), 0))
        );
    }

    #[test]
    fn test_axis_velocity_values() {
        assert_eq!(axis_velocity(0), 0);
        assert_eq!(axis_velocity(255), 0);
        assert_eq!(axis_velocity(256), 1);
        assert_eq!(axis_velocity(-511), 1);
        assert_eq!(axis_velocity(32767), 127);
        assert_eq!(axis_velocity(-32768), 127);
    }

    #[test]
    fn test_hihat_scenario() {
        let hihat = Arc::new(HiHat::new());
        let t = translator(&hihat);

        // Pedal down sounds the pedal and closes the hat
        assert_eq!(
            t.translate(&RawControlEvent::button(4, true)),
            Some(NoteEvent::on(note(44), 127))
        );
        assert!(hihat.pedal());
        assert_eq!(
            t.translate(&RawControlEvent::button(3, true)),
            Some(NoteEvent::on(note(42), 127))
        );

        // Pedal up opens it again
        t.translate(&RawControlEvent::button(4, false));
        assert!(!hihat.pedal());
        assert_eq!(
            t.translate(&RawControlEvent::button(3, true)),
            Some(NoteEvent::on(note(46), 127))
        );
    }

    #[test]
    fn test_silent_pedal_still_moves_modifier() {
        let hihat = Arc::new(HiHat::new());
        let rules = HiHatRules::from_config(&HiHatConfig {
            pedal_sounds: false,
            ..HiHatConfig::default()
        });
        let t = Translator::new(kit(), rules, hihat.clone());

        assert_eq!(t.translate(&RawControlEvent::button(4, true)), None);
        assert!(hihat.pedal());
        assert_eq!(
            t.translate(&RawControlEvent::button(3, true)),
            Some(NoteEvent::on(note(42), 127))
        );
    }

    #[test]
    fn test_pedal_on_one_kit_closes_hat_on_another() {
        let hihat = Arc::new(HiHat::new());
        let pedal_kit = Translator::new(
            Arc::new(SlotMapping::from_device(&DeviceConfig::new("a").button(9, 44))),
            HiHatRules::default(),
            hihat.clone(),
        );
        let cymbal_kit = translator(&hihat);

        pedal_kit.translate(&RawControlEvent::button(9, true));
        assert_eq!(
            cymbal_kit.translate(&RawControlEvent::button(3, true)).map(|e| e.note),
            Some(note(42))
        );
    }

    #[test]
    fn test_init_events_can_be_skipped() {
        let hihat = Arc::new(HiHat::new());
        let event = RawControlEvent::button(0, false).with_init(true);

        assert!(translator(&hihat).translate(&event).is_some());
        assert!(translator(&hihat).skip_init_events(true).translate(&event).is_none());
    }

    #[test]
    fn test_run_until_end_of_stream() {
        let (transport, log) = MemoryTransport::new();
        let sink = Arc::new(EventSink::open(Box::new(transport), 9).unwrap());
        log.clear();

        let (tx, source) = ChannelSource::pair();
        for event in [
            RawControlEvent::button(0, true),
            RawControlEvent::button(5, true), // unmapped
            RawControlEvent::button(0, false),
        ] {
            tx.send(event).unwrap();
        }
        drop(tx);

        let listener = Listener::new(
            0,
            "mem",
            Box::new(source),
            translator(&Arc::new(HiHat::new())),
            sink.clone(),
        );
        assert_eq!(listener.state(), ListenerState::Idle);
        let report = listener.run();

        assert_eq!(report.reason, ExitReason::EndOfStream);
        assert_eq!(report.events_read, 3);
        assert_eq!(report.notes_emitted, 2);
        assert_eq!(log.messages(), vec![vec![0x99, 38, 127], vec![0x89, 38, 0]]);
    }

    #[test]
    fn test_cancelled_listener_reads_nothing() {
        let (transport, _log) = MemoryTransport::new();
        let sink = Arc::new(EventSink::open(Box::new(transport), 9).unwrap());
        let (tx, source) = ChannelSource::pair();
        tx.send(RawControlEvent::button(0, true)).unwrap();

        let token = CancellationToken::new();
        token.cancel();
        let translator = translator(&Arc::new(HiHat::new()));
        let report = Listener::new(0, "mem", Box::new(source), translator, sink)
            .with_cancellation(token)
            .run();

        assert_eq!(report.reason, ExitReason::Cancelled);
        assert_eq!(report.events_read, 0);
    }

    proptest! {
        #[test]
        fn axis_velocity_is_scaled_magnitude(value in any::<i16>()) {
            let expected = (i32::from(value).abs() / 256).min(127) as u8;
            prop_assert_eq!(axis_velocity(value), expected);
        }

        #[test]
        fn buttons_always_full_velocity(index in 0u8..5, pressed in any::<bool>()) {
            let t = translator(&Arc::new(HiHat::new()));
            if let Some(event) = t.translate(&RawControlEvent::button(index, pressed)) {
                prop_assert_eq!(event.velocity, 127);
                prop_assert_eq!(event.on, pressed);
            }
        }
    }
}
