//! Importer for the legacy `.js2midirc` text format
//!
//! ```text
//! # comment
//! [/dev/input/js0]
//! b0=59
//! a4=51
//! ```
//!
//! A `[DEVICE]` header starts a new slot; `bN=NOTE` and `aN=NOTE` map a button
//! or axis of the most recent slot. Everything after `#` is ignored.

use anyhow::{Context, Result};
use std::path::Path;
use tokio::fs;
use tracing::{debug, warn};

use super::{AppConfig, DeviceConfig};
use crate::midi::MAX_DATA;

/// Parse rc text into device slots, skipping lines that cannot be applied
pub fn parse_rc(text: &str) -> Vec<DeviceConfig> {
    let mut devices: Vec<DeviceConfig> = Vec::new();

    for (line_no, raw) in text.lines().enumerate() {
        let line: String = raw
            .split('#')
            .next()
            .unwrap_or_default()
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        if line.is_empty() {
            continue;
        }

        if let Some(path) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
            debug!("rc: device [{}]", path);
            devices.push(DeviceConfig::new(path));
            continue;
        }

        let mut chars = line.chars();
        let kind = chars.next().unwrap_or_default();
        let rest = chars.as_str();
        if kind != 'b' && kind != 'a' {
            warn!("rc line {}: ignoring '{}'", line_no + 1, raw.trim());
            continue;
        }

        let Some((index, note)) = parse_assignment(rest) else {
            warn!("rc line {}: malformed mapping '{}'", line_no + 1, raw.trim());
            continue;
        };

        let Some(device) = devices.last_mut() else {
            warn!("rc line {}: mapping before any [device] header", line_no + 1);
            continue;
        };

        let controls = if kind == 'b' {
            &mut device.buttons
        } else {
            &mut device.axes
        };
        // A later 0 unmaps whatever an earlier line assigned
        if note == 0 {
            controls.remove(&index);
        } else {
            controls.insert(index, note);
        }
    }

    devices
}

/// Read an rc file and build a configuration around its devices
pub async fn import_rc(path: &Path) -> Result<AppConfig> {
    let text = fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read rc file: {}", path.display()))?;

    let config = AppConfig {
        devices: parse_rc(&text),
        ..AppConfig::default()
    };
    config.validate()?;

    Ok(config)
}

/// `N=NOTE` with N a control index and NOTE a 7-bit note number
fn parse_assignment(text: &str) -> Option<(u8, u8)> {
    let (index, note) = text.split_once('=')?;
    let index = index.parse::<u8>().ok()?;
    let note = note.parse::<u8>().ok().filter(|n| *n <= MAX_DATA)?;
    Some((index, note))
}
