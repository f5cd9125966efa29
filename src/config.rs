//! Tool configuration, read from `weighlabel.toml`.
//!
//! ```toml
//! output_dir = "labels"
//!
//! [lookup]
//! base_url = "http://localhost:3001/api/products"
//! timeout_secs = 10
//!
//! [label]
//! font_path = "fonts/Arial.ttf"  # optional; DejaVu Sans is bundled
//! scale = 3
//! render_timeout_ms = 2000
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::consts::{MAX_SCALE, RENDER_TIMEOUT_MS, SCALE};
use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self { base_url: "http://localhost:3001/api/products".into(), timeout_secs: 10 }
    }
}

impl LookupConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LabelConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_path: Option<PathBuf>,
    pub scale: u32,
    pub render_timeout_ms: u64,
}

impl Default for LabelConfig {
    fn default() -> Self {
        Self { font_path: None, scale: SCALE, render_timeout_ms: RENDER_TIMEOUT_MS }
    }
}

impl LabelConfig {
    pub fn render_timeout(&self) -> Duration {
        Duration::from_millis(self.render_timeout_ms)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub output_dir: PathBuf,
    pub lookup: LookupConfig,
    pub label: LabelConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self { output_dir: PathBuf::from("."), lookup: LookupConfig::default(), label: LabelConfig::default() }
    }
}

impl AppConfig {
    pub const FILE_NAME: &'static str = "weighlabel.toml";

    /// Load from `path`, or defaults when the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::debug!("No config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig =
            toml::from_str(&content).map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        if !(1..=MAX_SCALE).contains(&config.label.scale) {
            return Err(Error::Config(format!(
                "label.scale must be between 1 and {MAX_SCALE}, got {}",
                config.label.scale
            )));
        }
        Ok(config)
    }
}
