//! Catalog configuration
//!
//! Settings come from a TOML file in the user's config directory:
//! - Linux: ~/.config/parts-catalog/config.toml
//! - macOS: ~/Library/Application Support/parts-catalog/config.toml
//! - Windows: %APPDATA%\parts-catalog\config.toml
//!
//! A missing file means defaults. Command-line flags override file values.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::{CatalogError, Result};
use crate::probe::DEFAULT_PROBE_TIMEOUT;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CatalogConfig {
    /// The `images.json` document to load and save
    pub data_file: PathBuf,
    /// Per-image probe timeout in milliseconds
    pub probe_timeout_ms: u64,
    /// Directory relative image paths resolve against. Defaults to the
    /// data file's directory.
    pub image_root: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("images.json"),
            probe_timeout_ms: DEFAULT_PROBE_TIMEOUT.as_millis() as u64,
            image_root: None,
        }
    }
}

impl CatalogConfig {
    /// Where the config file lives when none is given explicitly
    pub fn default_path() -> Option<PathBuf> {
        let mut path = dirs::config_dir()?;
        path.push("parts-catalog");
        path.push("config.toml");
        Some(path)
    }

    /// Load from `path`, or from the default location when `None`
    ///
    /// An explicit path must exist; the default location may be absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::read(path),
            None => match Self::default_path() {
                Some(path) if path.exists() => Self::read(&path),
                _ => Ok(Self::default()),
            },
        }
    }

    fn read(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| CatalogError::io(path, e))?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).map_err(|e| CatalogError::Format(format!("config: {e}")))
    }

    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    /// The configured image root, else the data file's directory
    pub fn resolved_image_root(&self) -> PathBuf {
        if let Some(root) = &self.image_root {
            return root.clone();
        }
        match self.data_file.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }
}
