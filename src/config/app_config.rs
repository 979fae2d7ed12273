//! Application configuration management

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main application configuration, read from `avrbrew.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AvrBrewConfig {
    /// Hardware search roots (IDE bundle hardware dir, sketchbook hardware dirs)
    pub hardware_dirs: Vec<PathBuf>,
    /// Library search directories, colon-joined into the build driver's `libs=`
    pub library_dirs: Vec<PathBuf>,
    /// Toolchain configuration
    pub toolchain: ToolchainConfig,
    /// Serial port configuration
    pub serial: SerialConfig,
    /// Upload behavior tuning
    pub upload: UploadConfig,
}

/// External toolchain locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolchainConfig {
    /// Root of the cross-compilation toolchain
    pub root: PathBuf,
    /// Build driver executable invoked for compilation
    pub build_driver: PathBuf,
    /// avrdude executable
    pub avrdude: PathBuf,
    /// avrdude configuration file, passed via -C
    pub avrdude_conf: PathBuf,
}

/// Serial device discovery configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Device filesystem directory to enumerate
    pub device_dir: PathBuf,
    /// Polling interval for the ports watcher, in milliseconds
    pub watch_interval_ms: u64,
}

/// Upload behavior tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    /// How many times -v is repeated on the avrdude command line
    pub verbosity: u8,
    /// How long the 1200-baud touch holds the port open, in milliseconds
    pub touch_hold_ms: u64,
    /// Maximum polls for the port to reappear after a touch reset
    pub reset_retries: u32,
    /// Sleep between reappearance polls, in milliseconds
    pub reset_poll_ms: u64,
    /// Delay before signaling the port available again after an upload,
    /// in milliseconds
    pub settle_ms: u64,
}

impl Default for AvrBrewConfig {
    fn default() -> Self {
        Self {
            hardware_dirs: Vec::new(),
            library_dirs: Vec::new(),
            toolchain: ToolchainConfig::default(),
            serial: SerialConfig::default(),
            upload: UploadConfig::default(),
        }
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("/usr/local/CrossPack-AVR"),
            build_driver: PathBuf::from("BuildProject"),
            avrdude: PathBuf::from("/usr/local/CrossPack-AVR/bin/avrdude"),
            avrdude_conf: PathBuf::from("/usr/local/CrossPack-AVR/etc/avrdude.conf"),
        }
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device_dir: PathBuf::from("/dev"),
            watch_interval_ms: 1000,
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            verbosity: 4,
            touch_hold_ms: 250,
            reset_retries: 40,
            reset_poll_ms: 250,
            settle_ms: 1000,
        }
    }
}

impl AvrBrewConfig {
    /// Load configuration from an explicit path, or from the default
    /// location when none is given. A missing file yields the defaults.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path(),
        };

        if !path.exists() {
            log::debug!("No config file at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
        log::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Persist configuration to the default location.
    pub fn save(&self) -> anyhow::Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Default configuration file location
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("avrbrew")
            .join("avrbrew.toml")
    }
}
