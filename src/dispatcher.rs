//! Dispatcher: opens every configured device, runs one listener per device
//! and waits until all of them stop or shutdown is requested.

use std::sync::Arc;
use std::thread::JoinHandle;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::AppConfig;
use crate::error::SinkError;
use crate::hihat::{HiHat, HiHatRules};
use crate::input::DeviceOpener;
use crate::listener::{ExitReason, Listener, ListenerReport, Translator};
use crate::mapping::MappingTable;
use crate::sink::{EventSink, MidiTransport};

/// Outcome of one dispatcher run
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Slots without a device path
    pub unconfigured: Vec<usize>,
    /// Slots whose device could not be opened, with the reason
    pub failed: Vec<(usize, String)>,
    /// Number of listeners that were started
    pub started: usize,
    /// Reports of the listeners that stopped before the run ended
    pub listeners: Vec<ListenerReport>,
    /// Listener threads joined before returning
    pub joined: usize,
    /// The run ended because shutdown was requested
    pub interrupted: bool,
    /// Notes emitted by the sink over the whole run
    pub notes_emitted: u64,
}

impl DispatchReport {
    /// At least one device was opened
    pub fn success(&self) -> bool {
        self.started > 0
    }
}

pub struct Dispatcher {
    slots: Vec<Option<String>>,
    mapping: MappingTable,
    rules: HiHatRules,
    hihat: Arc<HiHat>,
    channel: u8,
    skip_init: bool,
    opener: Arc<dyn DeviceOpener>,
}

impl Dispatcher {
    pub fn new(config: &AppConfig, opener: Arc<dyn DeviceOpener>) -> Self {
        Self {
            slots: config.devices.iter().map(|d| d.path.clone()).collect(),
            mapping: MappingTable::from_config(&config.devices),
            rules: HiHatRules::from_config(&config.hihat),
            hihat: Arc::new(HiHat::new()),
            channel: config.wire_channel(),
            skip_init: config.input.skip_init_events,
            opener,
        }
    }

    /// Open the sink, start the listeners and wait for them
    ///
    /// Fails only when the sink cannot be opened. Devices that fail to open
    /// are reported and skipped.
    pub async fn run(
        &self,
        transport: Box<dyn MidiTransport>,
        shutdown: CancellationToken,
    ) -> Result<DispatchReport, SinkError> {
        let sink = Arc::new(EventSink::open(transport, self.channel)?);
        let mut report = DispatchReport::default();

        let (done_tx, mut done_rx) = mpsc::unbounded_channel();
        let mut handles: Vec<(usize, JoinHandle<()>)> = Vec::new();

        for (slot, path) in self.slots.iter().enumerate() {
            let Some(path) = path else {
                debug!("Slot {} has no device configured", slot);
                report.unconfigured.push(slot);
                continue;
            };

            let source = match self.opener.open(slot, path) {
                Ok(source) => source,
                Err(e) => {
                    warn!("Could not open {} (slot {}): {}", path, slot, e);
                    report.failed.push((slot, e.to_string()));
                    continue;
                }
            };

            // Slots and mappings come from the same device list
            let mapping = self.mapping.slot(slot).unwrap_or_default();
            let translator = Translator::new(mapping, self.rules, self.hihat.clone())
                .skip_init_events(self.skip_init);
            let listener = Listener::new(slot, path.clone(), source, translator, sink.clone())
                .with_cancellation(shutdown.child_token());

            match listener.spawn(done_tx.clone()) {
                Ok(handle) => {
                    handles.push((slot, handle));
                    report.started += 1;
                }
                Err(e) => {
                    error!("Failed to start listener for {}: {}", path, e);
                    report.failed.push((slot, e.to_string()));
                }
            }
        }
        // Only listeners hold senders now; recv ends once they are all gone
        drop(done_tx);

        if report.started == 0 {
            warn!("No input device could be opened");
        } else {
            info!("{} device(s) active", report.started);
        }

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    report.interrupted = true;
                    break;
                }
                done = done_rx.recv() => match done {
                    Some(listener) => {
                        if let ExitReason::ReadError(_) = listener.reason {
                            warn!("Device {} lost", listener.path);
                        }
                        report.listeners.push(listener);
                    }
                    None => break,
                },
            }
        }

        // Reports that arrived while shutdown won the select
        while let Ok(listener) = done_rx.try_recv() {
            report.listeners.push(listener);
        }

        // Without shutdown every listener has dropped its sender, so each
        // join returns promptly. On shutdown, listeners still blocked in a
        // read are left behind; they exit on their next event or with the
        // process.
        for (slot, handle) in handles {
            if report.interrupted && !handle.is_finished() {
                debug!("Listener {} still blocked in read", slot);
                continue;
            }
            if handle.join().is_err() {
                error!("Listener {} panicked", slot);
            }
            report.joined += 1;
        }

        sink.close();
        report.notes_emitted = sink.emitted();
        info!(
            "Dispatcher stopped: {} listener(s) finished, {} notes emitted",
            report.listeners.len(),
            report.notes_emitted
        );
        Ok(report)
    }
}
