//! Configuration for the XWayland bridge
//!
//! Loads configuration from TOML file at `~/.config/area/xwayland.toml`
//! Auto-generates default config file on first run if missing.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub xwayland: XwaylandConfig,
}

impl Config {
    /// Load configuration from file, or use defaults if file doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        Self::load_from(&config_path)
    }

    /// Load configuration from an explicit path
    pub fn load_from(config_path: &Path) -> Result<Self> {
        if !config_path.exists() {
            info!("Config file not found at {:?}, using defaults", config_path);
            if let Err(e) = Self::save_default(config_path) {
                warn!("Failed to create default config file: {}", e);
            }
            return Ok(Self::default());
        }

        let content = fs::read_to_string(config_path).context("Failed to read config file")?;
        let config = Self::from_toml_str(&content)?;

        info!("Configuration loaded from {:?}", config_path);
        debug!("Config: {:?}", config);

        Ok(config)
    }

    /// Parse configuration from TOML, filling missing fields with defaults
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse config file")
    }

    /// Get the path to the config file
    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("area");

        Ok(config_dir.join("xwayland.toml"))
    }

    /// Save default configuration to file
    fn save_default(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let toml_string = toml::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;

        fs::write(path, toml_string).context("Failed to write default config file")?;

        info!("Created default config file at {:?}", path);
        Ok(())
    }
}

/// XWayland window management behaviour
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct XwaylandConfig {
    /// Log per-window state transitions, transient-for resolution and close handling
    pub verbose_logging: bool,
    /// Desktop number written to `_NET_WM_DESKTOP` when a window is mapped
    pub workspace: u32,
    /// Send `WM_TAKE_FOCUS` to clients that declare it
    pub honor_take_focus: bool,
    /// Restack the X window above its siblings whenever it gains focus
    pub raise_on_focus: bool,
}

impl Default for XwaylandConfig {
    fn default() -> Self {
        Self {
            verbose_logging: false,
            workspace: 1,
            honor_take_focus: true,
            raise_on_focus: true,
        }
    }
}
