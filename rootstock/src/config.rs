//! Configuration for the acquisition pipeline.
//!
//! Two layers: [`AcquireConfig`] is the in-process builder-style settings
//! struct the pipeline consumes; [`ConfigFile`] handles the optional
//! `~/.rootstock/config.ini` user file the CLI reads defaults from.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use crate::catalog::Architecture;

/// Default HTTP timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Settings consumed by the acquisition pipeline.
#[derive(Debug, Clone)]
pub struct AcquireConfig {
    /// Directory for download temp files and extraction scratch space.
    pub staging_dir: PathBuf,

    /// HTTP request timeout.
    pub timeout: Duration,

    /// Whether to verify checksums when an expected digest is known.
    pub verify_checksums: bool,
}

impl Default for AcquireConfig {
    fn default() -> Self {
        Self {
            staging_dir: std::env::temp_dir().join("rootstock-staging"),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            verify_checksums: true,
        }
    }
}

impl AcquireConfig {
    /// Create a configuration with the given staging directory.
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            ..Default::default()
        }
    }

    /// Set the HTTP timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Enable or disable checksum verification.
    pub fn with_verify_checksums(mut self, verify: bool) -> Self {
        self.verify_checksums = verify;
        self
    }
}

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or parse the config file.
    #[error("failed to read config file: {0}")]
    Read(#[from] ini::Error),

    /// Failed to write the config file.
    #[error("failed to write config file: {0}")]
    Write(String),

    /// A value could not be interpreted.
    #[error("invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

/// User configuration from `~/.rootstock/config.ini`.
///
/// Every field is optional; unset values fall back to built-in defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigFile {
    /// Staging directory override.
    pub staging_dir: Option<PathBuf>,
    /// Directory for normalized artifacts.
    pub artifacts_dir: Option<PathBuf>,
    /// Path of the catalog index file.
    pub catalog_path: Option<PathBuf>,
    /// HTTP timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Default target architecture for new records.
    pub architecture: Option<Architecture>,
}

impl ConfigFile {
    /// Load from the default path, or defaults if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load from a specific path, or defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let ini = Ini::load_from_file(path)?;
        Self::from_ini(&ini)
    }

    /// Save to a specific path, creating parent directories as needed.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigFileError::Write(e.to_string()))?;
        }

        self.to_ini()
            .write_to_file(path)
            .map_err(|e| ConfigFileError::Write(e.to_string()))
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigFileError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("acquire")) {
            if let Some(value) = section.get("staging_dir") {
                config.staging_dir = Some(PathBuf::from(value));
            }
            if let Some(value) = section.get("timeout_secs") {
                config.timeout_secs =
                    Some(
                        value
                            .parse()
                            .map_err(|_| ConfigFileError::InvalidValue {
                                section: "acquire".to_string(),
                                key: "timeout_secs".to_string(),
                                value: value.to_string(),
                                reason: "expected an integer".to_string(),
                            })?,
                    );
            }
            if let Some(value) = section.get("architecture") {
                config.architecture =
                    Some(
                        value
                            .parse()
                            .map_err(|reason| ConfigFileError::InvalidValue {
                                section: "acquire".to_string(),
                                key: "architecture".to_string(),
                                value: value.to_string(),
                                reason,
                            })?,
                    );
            }
        }

        if let Some(section) = ini.section(Some("catalog")) {
            if let Some(value) = section.get("artifacts_dir") {
                config.artifacts_dir = Some(PathBuf::from(value));
            }
            if let Some(value) = section.get("index_path") {
                config.catalog_path = Some(PathBuf::from(value));
            }
        }

        Ok(config)
    }

    fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();

        if let Some(dir) = &self.staging_dir {
            ini.set_to(Some("acquire"), "staging_dir".into(), dir.display().to_string());
        }
        if let Some(secs) = self.timeout_secs {
            ini.set_to(Some("acquire"), "timeout_secs".into(), secs.to_string());
        }
        if let Some(arch) = self.architecture {
            ini.set_to(Some("acquire"), "architecture".into(), arch.to_string());
        }
        if let Some(dir) = &self.artifacts_dir {
            ini.set_to(Some("catalog"), "artifacts_dir".into(), dir.display().to_string());
        }
        if let Some(path) = &self.catalog_path {
            ini.set_to(Some("catalog"), "index_path".into(), path.display().to_string());
        }

        ini
    }
}

/// Path of the config directory (`~/.rootstock`).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".rootstock")
}

/// Path of the config file (`~/.rootstock/config.ini`).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}
