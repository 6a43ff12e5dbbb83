//! Service configuration.
//!
//! Handles loading, validating, and merging `image-ingest.toml`. Stock
//! defaults are serialized to a TOML table, the user file is merged on top of
//! it key by key, and the result is deserialized and validated.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [storage]
//! root = "wwwroot"          # Web root; web paths are relative to it
//! upload_dir = "u/d"        # Upload directory, relative to root
//! public_host = ""          # Prefix for web paths, e.g. "https://cdn.example"
//! naming = "random"         # "random" or "preserve"
//!
//! [uploads]
//! permitted_extensions = [".txt", ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".tif", ".tiff"]
//!
//! [transform.resize]
//! enabled = false
//!
//! [transform.compress]
//! codec = "jpeg"
//! quality = 75
//!
//! [transform.advanced]
//! chroma_subsampling = "4:2:0"
//!
//! [processing]
//! max_threads = 4           # Max rayon workers (omit for auto = CPU cores)
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Override just the values you want:
//!
//! ```toml
//! [transform.compress]
//! codec = "png"
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::TransformOptions;
use crate::storage::StorageLayout;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use thiserror::Error;

/// Config file looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "image-ingest.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Full service configuration.
///
/// All fields have defaults. User config files need only specify the values
/// they want to override. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IngestConfig {
    pub storage: StorageConfig,
    pub uploads: UploadsConfig,
    /// Options applied to every image upload unless the caller passes its own.
    pub transform: TransformOptions,
    pub processing: ProcessingConfig,
}

impl IngestConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let upload_dir = Path::new(&self.storage.upload_dir);
        if upload_dir.is_absolute()
            || upload_dir
                .components()
                .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(ConfigError::Validation(
                "storage.upload_dir must be a relative path inside storage.root".into(),
            ));
        }
        if self.uploads.permitted_extensions.is_empty() {
            return Err(ConfigError::Validation(
                "uploads.permitted_extensions must not be empty".into(),
            ));
        }
        for ext in &self.uploads.permitted_extensions {
            if !ext.starts_with('.') || ext.len() < 2 || *ext != ext.to_ascii_lowercase() {
                return Err(ConfigError::Validation(format!(
                    "uploads.permitted_extensions entries must be lowercase and start with '.', got '{ext}'"
                )));
            }
        }
        if self.processing.max_threads == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_threads must be at least 1".into(),
            ));
        }
        Ok(())
    }

    pub fn layout(&self) -> StorageLayout {
        StorageLayout::new(
            &self.storage.root,
            &self.storage.upload_dir,
            &self.storage.public_host,
        )
    }
}

/// How stored uploads are named.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NamingMode {
    /// `{unix_seconds}_{token}.{ext}`
    #[default]
    Random,
    /// Client file name, sanitized, with ` (n)` counters on collision.
    Preserve,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StorageConfig {
    pub root: PathBuf,
    pub upload_dir: PathBuf,
    pub public_host: String,
    pub naming: NamingMode,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("wwwroot"),
            upload_dir: PathBuf::from("u/d"),
            public_host: String::new(),
            naming: NamingMode::default(),
        }
    }
}

/// Upload acceptance rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UploadsConfig {
    /// Lowercase extensions, with the dot, that may be uploaded at all.
    pub permitted_extensions: Vec<String>,
}

impl UploadsConfig {
    pub fn permits(&self, extension: &str) -> bool {
        self.permitted_extensions.iter().any(|e| e == extension)
    }
}

impl Default for UploadsConfig {
    fn default() -> Self {
        Self {
            permitted_extensions: [
                ".txt", ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".tif", ".tiff",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of rayon workers for per-pixel steps.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_threads.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Stock defaults as a TOML table, the base every user file merges onto.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(IngestConfig::default())?)
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Read a config file as a raw TOML value.
pub fn load_raw_config(path: &Path) -> Result<toml::Value, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Merge an optional overlay onto a base value, then deserialize and validate.
pub fn resolve_config(
    base: toml::Value,
    overlay: Option<toml::Value>,
) -> Result<IngestConfig, ConfigError> {
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: IngestConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from an explicit file, or stock defaults for `None`.
///
/// An explicit path that does not exist is an error.
pub fn load_config(path: Option<&Path>) -> Result<IngestConfig, ConfigError> {
    let overlay = path.map(load_raw_config).transpose()?;
    resolve_config(stock_defaults_value()?, overlay)
}

/// Load [`DEFAULT_CONFIG_FILE`] from `dir` if present, stock defaults otherwise.
pub fn load_config_from_dir(dir: &Path) -> Result<IngestConfig, ConfigError> {
    let candidate = dir.join(DEFAULT_CONFIG_FILE);
    if candidate.exists() {
        load_config(Some(&candidate))
    } else {
        load_config(None)
    }
}

/// Returns a fully-commented stock `image-ingest.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# image-ingest configuration
# ==========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Storage layout
# ---------------------------------------------------------------------------
[storage]
# Web root. Web paths are computed relative to this directory.
root = "wwwroot"

# Directory uploads are written to, relative to root.
upload_dir = "u/d"

# Prefix for returned web paths, e.g. "https://cdn.example".
# Empty gives root-relative paths like "/u/d/1700000000_3f2a9c01b4de.jpg".
public_host = ""

# "random":   {unix_seconds}_{12 hex chars}.{ext}
# "preserve": the client file name, sanitized, with " (n)" on collision
naming = "random"

# ---------------------------------------------------------------------------
# Upload acceptance
# ---------------------------------------------------------------------------
[uploads]
# Lowercase, with the dot. Anything else is rejected before processing.
permitted_extensions = [".txt", ".pdf", ".jpg", ".jpeg", ".png", ".gif", ".bmp", ".webp", ".tif", ".tiff"]

# ---------------------------------------------------------------------------
# Image transform, applied to uploads whose bytes sniff as an image
# ---------------------------------------------------------------------------
[transform.resize]
enabled = false

# Target size, at most 16384 per axis. 0 on one axis derives it from the
# other axis and the source aspect ratio; 0 on both keeps the source size.
width = 0
height = 0

# "nearest", "triangle", "catmull-rom", "gaussian", "lanczos3"
resampler = "lanczos3"

# "manual", "stretch", "contain", "cover", "pad"
fit = "manual"

# Treat "manual" and "stretch" as "contain".
maintain_aspect_ratio = false

# Multiply color by alpha after resampling.
premultiply_alpha = true

# Resample in linear light instead of on gamma-encoded values.
linear_rgb = true

# Brightness multiplier applied in linear light after resampling.
# 1.1 reproduces the brightening older releases applied with linear_rgb.
brightness_factor = 1.0

[transform.compress]
# "original" keeps the upload's own format (from its extension), or one of
# "bmp", "gif", "jpeg", "pbm", "png", "qoi", "tga", "tiff", "webp"
codec = "jpeg"

# Lossy quality, 1-100. Out-of-range values are clamped.
quality = 75

[transform.advanced]
# "4:2:0", "4:4:4", "4:2:2", "4:1:1", "4:1:0"
chroma_subsampling = "4:2:0"

# Gaussian smoothing radius, 0-100. 0 disables smoothing.
smooth_radius = 0

# Posterize each channel to this many levels. 0 disables, otherwise 2-255.
quantization_level = 0

# Pass pixels through an in-memory JPEG at the quality and chroma settings
# above before the final encode.
reencode_baseline = true

# ---------------------------------------------------------------------------
# Parallel processing
# ---------------------------------------------------------------------------
[processing]
# Maximum rayon workers for per-pixel steps.
# Omit to use all CPU cores. Values above the core count are clamped down.
# max_threads = 4
"##
}
