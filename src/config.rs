//! Configuration loading and defaults
//!
//! A toml file with defaults for every field, resolved from `--config` or
//! the XDG config dir, with CLI flags overriding individual values. The
//! built-in device identity is the Fujitsu G60 scanner the bridge was
//! written for; everything about it is overridable.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node: NodeSettings,
    pub device: DeviceSettings,
    pub backend: BackendSettings,
    /// Print a hex trace of all transferred bytes.
    pub trace: bool,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            node: NodeSettings::default(),
            device: DeviceSettings::default(),
            backend: BackendSettings::default(),
            trace: false,
            log_level: "info".to_string(),
        }
    }
}

/// Device-node registration parameters, forwarded to the glue layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeSettings {
    /// Device major number (0 lets the kernel pick).
    pub major: u32,
    /// Device minor number.
    pub minor: u32,
    /// Device name. Mandatory, but may come from the CLI instead.
    pub name: Option<String>,
}

impl Default for NodeSettings {
    fn default() -> Self {
        Self {
            major: 0,
            minor: 0,
            name: None,
        }
    }
}

/// USB identity and endpoints of the bridged device.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceSettings {
    pub vendor_id: u16,
    pub product_id: u16,
    pub interface: u8,
    pub endpoint_in: u8,
    pub endpoint_out: u8,
    /// Bulk transfer timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for DeviceSettings {
    fn default() -> Self {
        Self {
            vendor_id: 0x04c5,
            product_id: 0x124a,
            interface: 0,
            endpoint_in: 0x81,
            endpoint_out: 0x02,
            timeout_ms: 200,
        }
    }
}

/// Which backing store sits behind the device node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// The real USB device.
    Usb,
    /// Growable in-memory store with sparse semantics.
    Growable,
    /// Fixed-capacity in-memory store, writes at offset zero.
    Fixed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub kind: BackendKind,
    /// Capacity of the fixed store, in bytes. Ignored by other backends.
    pub capacity: usize,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: BackendKind::Usb,
            capacity: 0x1000,
        }
    }
}

impl Config {
    /// Default config file location: `~/.config/usbchar/config.toml` (or the
    /// platform equivalent).
    pub fn default_path() -> PathBuf {
        if let Some(config_dir) = dirs::config_dir() {
            config_dir.join("usbchar").join("config.toml")
        } else {
            PathBuf::from("/etc/usbchar/config.toml")
        }
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("could not read config file {}", path.display()))?;
        toml::from_str(&text)
            .with_context(|| format!("could not parse config file {}", path.display()))
    }

    /// Load an explicit path (errors propagate), or fall back to the default
    /// location (a broken default file falls back to built-in defaults).
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_file(p),
            None => Ok(Self::load_or_default()),
        }
    }

    pub fn load_or_default() -> Self {
        let path = Self::default_path();
        if path.exists() {
            Self::from_file(&path).unwrap_or_else(|e| {
                warn!("ignoring config file: {:#}", e);
                Self::default()
            })
        } else {
            Self::default()
        }
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("could not create {}", parent.display()))?;
        }
        let text = toml::to_string_pretty(self).context("could not serialize configuration")?;
        fs::write(path, text)
            .with_context(|| format!("could not write config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_defaults_match_reference_device() {
        let config = Config::default();
        assert_eq!(config.device.vendor_id, 0x04c5);
        assert_eq!(config.device.product_id, 0x124a);
        assert_eq!(config.device.endpoint_in, 0x81);
        assert_eq!(config.device.endpoint_out, 0x02);
        assert_eq!(config.device.timeout_ms, 200);
        assert_eq!(config.backend.kind, BackendKind::Usb);
        assert!(config.node.name.is_none());
        assert!(!config.trace);
    }

    #[test]
    fn test_save_and_reload_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.node.name = Some("g60".to_string());
        config.backend.kind = BackendKind::Fixed;
        config.backend.capacity = 64;
        config.save(&path).unwrap();

        let reloaded = Config::from_file(&path).unwrap();
        assert_eq!(reloaded, config);
    }

    #[test]
    fn test_partial_file_fills_in_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        fs::write(
            &path,
            r#"
trace = true

[node]
name = "scanner"

[device]
vendor_id = 0x1234
"#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert!(config.trace);
        assert_eq!(config.node.name.as_deref(), Some("scanner"));
        assert_eq!(config.device.vendor_id, 0x1234);
        // Untouched fields keep their defaults.
        assert_eq!(config.device.product_id, 0x124a);
        assert_eq!(config.log_level, "info");
    }

    #[test]
    fn test_backend_kind_parses_lowercase() {
        let config: Config = toml::from_str("[backend]\nkind = \"growable\"\n").unwrap();
        assert_eq!(config.backend.kind, BackendKind::Growable);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(Config::from_file(Path::new("/nonexistent/usbchar.toml")).is_err());
    }
}
