//! midir-backed MIDI output
//!
//! Either connects to an existing output port by name, or publishes a virtual
//! port that synthesizers connect to (e.g. `aconnect js2midi:0 Hydrogen:0`).

use midir::{MidiOutput, MidiOutputConnection, MidiOutputPort};
use tracing::{debug, info};

use super::MidiTransport;
use crate::config::MidiConfig;
use crate::error::SinkError;

pub struct MidirTransport {
    conn: Option<MidiOutputConnection>,
    port_name: String,
}

impl MidirTransport {
    /// Open the output described by the MIDI configuration
    pub fn open(config: &MidiConfig) -> Result<Self, SinkError> {
        match &config.output_port {
            Some(pattern) => Self::connect(&config.client_name, pattern),
            None => Self::create_virtual(&config.client_name),
        }
    }

    /// Connect to the first output port whose name contains `pattern`
    pub fn connect(client_name: &str, pattern: &str) -> Result<Self, SinkError> {
        let midi_out = MidiOutput::new(client_name).map_err(|e| SinkError::Init(e.to_string()))?;

        let (port, port_name) = find_output_port(&midi_out, pattern)
            .ok_or_else(|| SinkError::PortNotFound(pattern.to_string()))?;

        info!("Connecting to output port: {}", port_name);
        let conn = midi_out
            .connect(&port, client_name)
            .map_err(|e| SinkError::Init(e.to_string()))?;

        Ok(Self {
            conn: Some(conn),
            port_name,
        })
    }

    /// Publish a virtual output port named after the client
    #[cfg(unix)]
    pub fn create_virtual(client_name: &str) -> Result<Self, SinkError> {
        use midir::os::unix::VirtualOutput;

        let midi_out = MidiOutput::new(client_name).map_err(|e| SinkError::Init(e.to_string()))?;
        let conn = midi_out
            .create_virtual(client_name)
            .map_err(|e| SinkError::Init(e.to_string()))?;

        info!("Opened virtual output port \"{}\"", client_name);
        Ok(Self {
            conn: Some(conn),
            port_name: client_name.to_string(),
        })
    }

    #[cfg(not(unix))]
    pub fn create_virtual(_client_name: &str) -> Result<Self, SinkError> {
        Err(SinkError::Init(
            "virtual ports are not supported on this platform, set midi.output_port".to_string(),
        ))
    }
}

impl MidiTransport for MidirTransport {
    fn name(&self) -> &str {
        &self.port_name
    }

    fn send(&mut self, bytes: &[u8]) -> Result<(), SinkError> {
        let conn = self.conn.as_mut().ok_or(SinkError::Closed)?;
        conn.send(bytes).map_err(|e| SinkError::Send(e.to_string()))
    }

    // midir writes each message straight to the driver, nothing to flush

    fn close(&mut self) {
        if let Some(conn) = self.conn.take() {
            conn.close();
            debug!("Released output port '{}'", self.port_name);
        }
    }
}

/// Find an output port by case-insensitive substring match
fn find_output_port(midi_out: &MidiOutput, pattern: &str) -> Option<(MidiOutputPort, String)> {
    let pattern = pattern.to_lowercase();
    midi_out.ports().into_iter().find_map(|port| {
        let name = midi_out.port_name(&port).ok()?;
        if name.to_lowercase().contains(&pattern) {
            debug!("Found port '{}' matching pattern '{}'", name, pattern);
            Some((port, name))
        } else {
            None
        }
    })
}

/// Names of all MIDI output ports currently visible
pub fn list_output_ports(client_name: &str) -> Result<Vec<String>, SinkError> {
    let midi_out = MidiOutput::new(client_name).map_err(|e| SinkError::Init(e.to_string()))?;
    Ok(midi_out
        .ports()
        .iter()
        .filter_map(|port| midi_out.port_name(port).ok())
        .collect())
}
