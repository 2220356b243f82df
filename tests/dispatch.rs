//! End-to-end runs of the dispatcher with in-memory devices and output

use std::io::Write;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use js2midi::config::{AppConfig, DeviceConfig};
use js2midi::input::joystick::encode_event;
use js2midi::input::{ChannelOpener, JoystickOpener, RawControlEvent};
use js2midi::listener::ExitReason;
use js2midi::midi::MidiMessage;
use js2midi::sink::{MemoryLog, MemoryTransport};
use js2midi::{DispatchReport, Dispatcher};

const RESET_MESSAGES: usize = 3;

fn config(devices: Vec<DeviceConfig>) -> AppConfig {
    AppConfig {
        devices,
        ..AppConfig::default()
    }
}

async fn run(config: &AppConfig, opener: Arc<ChannelOpener>) -> (DispatchReport, MemoryLog) {
    let (transport, log) = MemoryTransport::new();
    let report = Dispatcher::new(config, opener)
        .run(Box::new(transport), CancellationToken::new())
        .await
        .unwrap();
    (report, log)
}

/// Note-on/off messages only, as (note, on, velocity)
fn notes(log: &MemoryLog) -> Vec<(u8, bool, u8)> {
    log.decoded()
        .into_iter()
        .filter_map(|m| match m {
            MidiMessage::NoteOn { note, velocity, .. } => Some((note, true, velocity)),
            MidiMessage::NoteOff { note, velocity, .. } => Some((note, false, velocity)),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn concurrent_devices_never_interleave_bytes() {
    const EVENTS: usize = 1000;

    let opener = Arc::new(ChannelOpener::new());
    for path in ["kit-a", "kit-b"] {
        let tx = opener.register(path);
        for i in 0..EVENTS {
            let velocity = (i % 127) as i16 + 1;
            tx.send(RawControlEvent::axis(0, velocity * 256)).unwrap();
        }
    }

    let cfg = config(vec![
        DeviceConfig::new("kit-a").axis(0, 51),
        DeviceConfig::new("kit-b").axis(0, 54),
    ]);
    let (report, log) = run(&cfg, opener).await;

    assert_eq!(report.started, 2);
    assert_eq!(report.notes_emitted, 2 * EVENTS as u64);

    let messages = log.messages();
    assert_eq!(messages.len(), RESET_MESSAGES + 2 * EVENTS);
    for message in &messages[RESET_MESSAGES..] {
        assert_eq!(message.len(), 3);
        assert_eq!(message[0], 0x99);
    }

    // Each device's own notes arrive in the order it produced them
    let expected: Vec<u8> = (0..EVENTS).map(|i| (i % 127) as u8 + 1).collect();
    for note in [51u8, 54] {
        let velocities: Vec<u8> = notes(&log)
            .into_iter()
            .filter(|(n, _, _)| *n == note)
            .map(|(_, _, v)| v)
            .collect();
        assert_eq!(velocities, expected);
    }
}

#[tokio::test]
async fn failed_device_does_not_stop_the_others() {
    let opener = Arc::new(ChannelOpener::new());
    for path in ["left", "right"] {
        let tx = opener.register(path);
        tx.send(RawControlEvent::button(0, true)).unwrap();
    }

    let cfg = config(vec![
        DeviceConfig::new("left").button(0, 36),
        DeviceConfig::new("unplugged").button(0, 38),
        DeviceConfig::new("right").button(0, 40),
    ]);
    let (report, log) = run(&cfg, opener).await;

    assert!(report.success());
    assert_eq!(report.started, 2);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, 1);

    let mut slots: Vec<usize> = report.listeners.iter().map(|l| l.slot).collect();
    slots.sort_unstable();
    assert_eq!(slots, vec![0, 2]);

    let mut played: Vec<u8> = notes(&log).into_iter().map(|(n, _, _)| n).collect();
    played.sort_unstable();
    assert_eq!(played, vec![36, 40]);
}

#[tokio::test]
async fn sink_closes_once_after_all_sources_end() {
    let opener = Arc::new(ChannelOpener::new());
    let mut devices = Vec::new();
    for i in 0..3 {
        let path = format!("pad{}", i);
        opener.register(path.as_str());
        devices.push(DeviceConfig::new(path));
    }

    let (report, log) = run(&config(devices), opener).await;

    assert_eq!(report.listeners.len(), 3);
    assert!(report
        .listeners
        .iter()
        .all(|l| l.reason == ExitReason::EndOfStream));
    assert!(!report.interrupted);
    assert_eq!(report.joined, report.started);
    assert_eq!(log.closes(), 1);
}

#[tokio::test]
async fn every_listener_is_joined_on_a_clean_run() {
    for _ in 0..200 {
        let opener = Arc::new(ChannelOpener::new());
        let devices = (0..8)
            .map(|i| {
                let path = format!("pad{}", i);
                opener.register(path.as_str());
                DeviceConfig::new(path)
            })
            .collect();

        let (report, _) = run(&config(devices), opener).await;

        assert!(!report.interrupted);
        assert_eq!(report.started, 8);
        assert_eq!(report.joined, 8);
        assert_eq!(report.listeners.len(), 8);
    }
}

#[tokio::test]
async fn hihat_pedal_closes_open_hat() {
    let opener = Arc::new(ChannelOpener::new());
    let tx = opener.register("kit");
    for event in [
        RawControlEvent::button(4, true),  // pedal down
        RawControlEvent::button(3, true),  // open hat hit
        RawControlEvent::button(3, false), // open hat release
        RawControlEvent::button(4, false), // pedal up
        RawControlEvent::button(3, true),  // open hat hit
    ] {
        tx.send(event).unwrap();
    }
    drop(tx);

    let cfg = config(vec![DeviceConfig::new("kit").button(3, 46).button(4, 44)]);
    let (_, log) = run(&cfg, opener).await;

    assert_eq!(
        notes(&log),
        vec![
            (44, true, 127),
            (42, true, 127),
            (42, false, 0),
            (44, false, 0),
            (46, true, 127),
        ]
    );
}

#[tokio::test]
async fn unconfigured_slots_are_never_opened() {
    let opener = Arc::new(ChannelOpener::new());
    opener.register("pad");

    let cfg = config(vec![DeviceConfig::default(), DeviceConfig::new("pad")]);
    let (report, _) = run(&cfg, opener).await;

    assert_eq!(report.unconfigured, vec![0]);
    assert!(report.failed.is_empty());
    assert_eq!(report.started, 1);
    assert_eq!(report.listeners[0].slot, 1);
}

#[tokio::test]
async fn no_devices_is_not_a_success() {
    let cfg = config(vec![DeviceConfig::new("/dev/input/js-missing")]);
    let (report, log) = run(&cfg, Arc::new(ChannelOpener::new())).await;

    assert!(!report.success());
    assert_eq!(report.failed.len(), 1);
    assert_eq!(log.messages().len(), RESET_MESSAGES);
    assert_eq!(log.closes(), 1);
}

#[tokio::test]
async fn reads_joystick_records_from_a_device_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    for event in [
        RawControlEvent::button(2, false).with_init(true),
        RawControlEvent::button(2, true),
        RawControlEvent::axis(4, -12800),
    ] {
        file.write_all(&encode_event(&event)).unwrap();
    }
    file.flush().unwrap();

    let path = file.path().to_string_lossy().into_owned();
    let mut cfg = config(vec![DeviceConfig::new(path).button(2, 38).axis(4, 51)]);
    cfg.input.skip_init_events = true;

    let (transport, log) = MemoryTransport::new();
    let report = Dispatcher::new(&cfg, Arc::new(JoystickOpener))
        .run(Box::new(transport), CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.listeners[0].events_read, 3);
    assert_eq!(report.listeners[0].reason, ExitReason::EndOfStream);
    assert_eq!(notes(&log), vec![(38, true, 127), (51, true, 50)]);
}
