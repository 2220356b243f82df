//! Where the configuration lives.
//!
//! - **Debug builds**: `config.yaml` in the working directory, if present.
//! - **Portable mode**: a `.portable` marker next to the executable keeps
//!   `config.yaml` beside it.
//! - **Installed mode** (default): `<config_dir>/js2midi/config.yaml`, e.g.
//!   `~/.config/js2midi/config.yaml` on Linux.

use std::path::{Path, PathBuf};

/// Application name used for directories in installed mode
const APP_NAME: &str = "js2midi";

/// Name of the pre-YAML mapping file in the home directory
const LEGACY_RC: &str = ".js2midirc";

#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Path to the configuration file
    pub config: PathBuf,
    /// Whether the config sits next to the executable (or in the cwd)
    pub is_portable: bool,
}

impl AppPaths {
    /// Detect the config location from the environment.
    ///
    /// Called before logging is initialized, hence eprintln for diagnostics.
    pub fn detect() -> Self {
        let exe_dir = std::env::current_exe()
            .ok()
            .and_then(|p| p.parent().map(Path::to_path_buf))
            .unwrap_or_else(|| PathBuf::from("."));

        #[cfg(debug_assertions)]
        {
            let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
            let cwd_config = cwd.join("config.yaml");
            if cwd_config.exists() {
                eprintln!("[paths] DEV mode, using {}", cwd_config.display());
                return Self {
                    config: cwd_config,
                    is_portable: true,
                };
            }
        }

        Self::resolve(&exe_dir, dirs::config_dir())
    }

    /// Pick portable or installed mode given the executable's directory and
    /// the platform config directory
    pub fn resolve(exe_dir: &Path, config_dir: Option<PathBuf>) -> Self {
        if exe_dir.join(".portable").exists() {
            #[cfg(debug_assertions)]
            eprintln!("[paths] PORTABLE mode (.portable marker found)");
            return Self {
                config: exe_dir.join("config.yaml"),
                is_portable: true,
            };
        }

        let base = config_dir.unwrap_or_else(|| {
            eprintln!("[paths] WARNING: no config directory, falling back to exe dir");
            exe_dir.to_path_buf()
        });
        Self {
            config: base.join(APP_NAME).join("config.yaml"),
            is_portable: false,
        }
    }

    /// `~/.js2midirc`, if a home directory is known
    pub fn legacy_rc() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(LEGACY_RC))
    }
}
