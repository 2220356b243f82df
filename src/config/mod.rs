//! Configuration management for js2midi
//!
//! Handles loading, validating and persisting the YAML configuration that
//! describes the MIDI output, the hi-hat rules and every device slot.

pub mod legacy;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt::Write as _;
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

use crate::midi::{gm_drum_name, MAX_DATA};

/// Root configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub midi: MidiConfig,
    #[serde(default)]
    pub hihat: HiHatConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub devices: Vec<DeviceConfig>,
}

/// MIDI output configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MidiConfig {
    /// Client/port name other applications see
    #[serde(default = "default_client_name")]
    pub client_name: String,
    /// Substring of an existing output port; a virtual port is created when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_port: Option<String>,
    /// Output channel (1-16)
    #[serde(default = "default_channel")]
    pub channel: u8,
}

/// Hi-hat pedal rules
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct HiHatConfig {
    #[serde(default = "default_pedal_note")]
    pub pedal_note: u8,
    #[serde(default = "default_open_note")]
    pub open_note: u8,
    #[serde(default = "default_closed_note")]
    pub closed_note: u8,
    /// Whether the pedal itself sounds a note in addition to moving the modifier
    #[serde(default = "default_true")]
    pub pedal_sounds: bool,
}

/// Input handling options
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct InputConfig {
    /// Drop the synthetic events a joystick driver sends right after open
    #[serde(default)]
    pub skip_init_events: bool,
}

/// One device slot
///
/// A slot without a path is kept so that slot numbering stays stable, but it
/// is never opened. Notes of 0 are treated as unmapped.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct DeviceConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub buttons: BTreeMap<u8, u8>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub axes: BTreeMap<u8, u8>,
}

impl DeviceConfig {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    pub fn button(mut self, index: u8, note: u8) -> Self {
        self.buttons.insert(index, note);
        self
    }

    pub fn axis(mut self, index: u8, note: u8) -> Self {
        self.axes.insert(index, note);
        self
    }
}

impl Default for MidiConfig {
    fn default() -> Self {
        Self {
            client_name: default_client_name(),
            output_port: None,
            channel: default_channel(),
        }
    }
}

impl Default for HiHatConfig {
    fn default() -> Self {
        Self {
            pedal_note: default_pedal_note(),
            open_note: default_open_note(),
            closed_note: default_closed_note(),
            pedal_sounds: true,
        }
    }
}

impl Default for AppConfig {
    /// Two Rock Band kits: js0 with cymbals and hi-hat, js1 with toms and pads
    fn default() -> Self {
        let kit = DeviceConfig::new("/dev/input/js0")
            .button(0, 59)
            .button(1, 49)
            .button(2, 38)
            .button(3, 46)
            .button(4, 44)
            .axis(4, 51)
            .axis(5, 54);

        let toms = DeviceConfig::new("/dev/input/js1")
            .button(0, 41)
            .button(1, 48)
            .button(2, 43)
            .button(3, 45)
            .button(4, 35)
            .button(6, 55)
            .button(7, 52)
            .button(8, 53)
            .button(11, 60)
            .button(12, 61)
            .button(13, 62)
            .button(14, 63);

        Self {
            midi: MidiConfig::default(),
            hihat: HiHatConfig::default(),
            input: InputConfig::default(),
            devices: vec![kit, toms],
        }
    }
}

impl AppConfig {
    /// Load configuration from file with validation
    pub async fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("Failed to parse YAML config: {}", path.display()))?;

        config.validate()?;

        Ok(config)
    }

    /// Save configuration to file, with the note reference as a comment header
    pub async fn save(&self, path: &Path) -> Result<()> {
        let yaml = serde_yaml::to_string(self).context("Failed to serialize config to YAML")?;

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await.with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }

        fs::write(path, format!("{}{}", config_header(), yaml))
            .await
            .with_context(|| format!("Failed to write config file: {}", path.display()))?;

        Ok(())
    }

    /// Validate configuration for correctness and consistency
    pub fn validate(&self) -> Result<()> {
        if !(1..=16).contains(&self.midi.channel) {
            anyhow::bail!("MIDI channel {} is invalid (must be 1-16)", self.midi.channel);
        }
        if self.midi.client_name.trim().is_empty() {
            anyhow::bail!("MIDI client_name cannot be empty");
        }

        for (name, note) in [
            ("pedal_note", self.hihat.pedal_note),
            ("open_note", self.hihat.open_note),
            ("closed_note", self.hihat.closed_note),
        ] {
            if note > MAX_DATA {
                anyhow::bail!("hihat.{} {} is invalid (must be 0-127)", name, note);
            }
        }

        let mut paths = HashSet::new();
        for (slot, device) in self.devices.iter().enumerate() {
            if let Some(path) = &device.path {
                if path.trim().is_empty() {
                    anyhow::bail!("Device {} path cannot be empty", slot);
                }
                if !paths.insert(path.as_str()) {
                    anyhow::bail!("Device path '{}' is configured more than once", path);
                }
            }

            let controls = device
                .buttons
                .iter()
                .map(|(i, n)| ('b', i, n))
                .chain(device.axes.iter().map(|(i, n)| ('a', i, n)));
            for (kind, index, note) in controls {
                if *note > MAX_DATA {
                    anyhow::bail!(
                        "Device {} control {}{} has invalid note {} (must be 0-127)",
                        slot, kind, index, note
                    );
                }
            }
        }

        Ok(())
    }

    /// Output channel as sent on the wire (0-15)
    pub fn wire_channel(&self) -> u8 {
        self.midi.channel.saturating_sub(1) & 0x0F
    }

    /// Human-readable dump of the effective mapping
    pub fn describe(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "MIDI: client '{}', output {}, channel {}",
            self.midi.client_name,
            self.midi.output_port.as_deref().unwrap_or("<virtual port>"),
            self.midi.channel
        );
        let _ = writeln!(
            out,
            "Hi-hat: pedal {} / open {} / closed {}{}",
            self.hihat.pedal_note,
            self.hihat.open_note,
            self.hihat.closed_note,
            if self.hihat.pedal_sounds { "" } else { " (pedal silent)" }
        );

        for (slot, device) in self.devices.iter().enumerate() {
            let _ = writeln!(
                out,
                "[{}] {}",
                slot,
                device.path.as_deref().unwrap_or("<unconfigured>")
            );
            for (index, note) in device.buttons.iter().filter(|(_, n)| **n != 0) {
                let name = gm_drum_name(*note).unwrap_or("");
                let _ = writeln!(out, "  b{}={} {}", index, note, name);
            }
            for (index, note) in device.axes.iter().filter(|(_, n)| **n != 0) {
                let name = gm_drum_name(*note).unwrap_or("");
                let _ = writeln!(out, "  a{}={} {}", index, note, name);
            }
        }
        out
    }
}

/// Load the configuration, falling back to defaults instead of failing
///
/// A missing file is created with the default mapping. A file that cannot be
/// parsed or validated is left untouched and the defaults are used for this run.
pub async fn load_or_init(path: &Path) -> AppConfig {
    if !fs::try_exists(path).await.unwrap_or(false) {
        info!("No config at {}, creating one with the default mapping", path.display());
        let config = AppConfig::default();
        if let Err(e) = config.save(path).await {
            warn!("Failed to write default config: {:#}", e);
        }
        return config;
    }

    match AppConfig::load(path).await {
        Ok(config) => {
            info!("Found config {}", path.display());
            config
        }
        Err(e) => {
            warn!("Invalid config, using the default mapping for this run: {:#}", e);
            AppConfig::default()
        }
    }
}

fn config_header() -> String {
    let mut header = String::from("# js2midi configuration\n#\n# General MIDI percussion notes:\n");
    for note in 35..=81u8 {
        if let Some(name) = gm_drum_name(note) {
            let _ = writeln!(header, "#   {} {}", note, name);
        }
    }
    header.push_str(concat!(
        "#\n",
        "# Wii Rock Band: b0 blue, b1 green, b2 red, b3 yellow, b4 orange,\n",
        "#   b8 -, b9 +, a4 dpad up/down, a5 dpad left/right\n",
        "# Xbox Rock Band: b0 green, b1 red, b2 blue, b3 yellow, b4 orange,\n",
        "#   b6 select, b7 start, b8 xbox, b11-b14 dpad left/right/up/down\n",
        "#\n",
        "# A note of 0 leaves a control unmapped.\n\n",
    ));
    header
}

// Default value functions
fn default_client_name() -> String { "js2midi".to_string() }
fn default_channel() -> u8 { 10 }
fn default_pedal_note() -> u8 { 44 }
fn default_open_note() -> u8 { 46 }
fn default_closed_note() -> u8 { 42 }
fn default_true() -> bool { true }
