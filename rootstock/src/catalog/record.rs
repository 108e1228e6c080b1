//! Catalog record types for acquirable distributions.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Target CPU architecture of a distribution image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Architecture {
    /// 64-bit x86.
    X64,
    /// 64-bit ARM.
    Arm64,
}

impl Architecture {
    /// Name fragments vendors use for this architecture in package names.
    pub fn tokens(&self) -> &'static [&'static str] {
        match self {
            Self::X64 => &["x64", "amd64", "x86_64"],
            Self::Arm64 => &["arm64", "aarch64"],
        }
    }

    /// All known architecture tokens, across every variant.
    pub fn all_tokens() -> impl Iterator<Item = &'static str> {
        [Self::X64, Self::Arm64]
            .into_iter()
            .flat_map(|a| a.tokens().iter().copied())
    }

    /// Architecture of the host this process runs on.
    pub fn host() -> Self {
        if cfg!(target_arch = "aarch64") {
            Self::Arm64
        } else {
            Self::X64
        }
    }

    /// Case-insensitive check whether a file name carries one of this
    /// architecture's tokens.
    pub fn matches_name(&self, file_name: &str) -> bool {
        let lower = file_name.to_ascii_lowercase();
        self.tokens().iter().any(|t| lower.contains(t))
    }
}

// Display/FromStr keep the same spellings serde uses, so CLI flags, config
// values, and the JSON store all round-trip.
impl fmt::Display for Architecture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::X64 => write!(f, "x64"),
            Self::Arm64 => write!(f, "arm64"),
        }
    }
}

impl FromStr for Architecture {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "x64" | "amd64" | "x86_64" => Ok(Self::X64),
            "arm64" | "aarch64" => Ok(Self::Arm64),
            other => Err(format!("unknown architecture: {}", other)),
        }
    }
}

/// A catalog entry for an acquirable distribution.
///
/// `local_file_path`, `size_bytes` and `acquired_at` are absent until an
/// acquisition succeeds, and are only ever written by the orchestrator's
/// finalization step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionRecord {
    /// Unique stable identifier (slug), e.g. "alpine-3.19".
    pub name: String,

    /// Human-readable name for presentation.
    pub display_name: String,

    /// Optional longer description.
    #[serde(default)]
    pub description: String,

    /// Vendor version string (not necessarily semver, e.g. "22.04").
    #[serde(default)]
    pub version: String,

    /// Target CPU architecture.
    pub architecture: Architecture,

    /// Remote location of the distributable package, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,

    /// Expected SHA-256 hex digest of the downloaded package.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_checksum: Option<String>,

    /// Path of the normalized artifact once acquired.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_file_path: Option<PathBuf>,

    /// Size of the final artifact in bytes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size_bytes: Option<u64>,

    /// When the artifact was last acquired (UTC).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acquired_at: Option<DateTime<Utc>>,
}

impl DistributionRecord {
    /// Create a record with only the required fields set.
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        architecture: Architecture,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            description: String::new(),
            version: String::new(),
            architecture,
            source_url: None,
            expected_checksum: None,
            local_file_path: None,
            size_bytes: None,
            acquired_at: None,
        }
    }

    /// Set the source URL.
    pub fn with_source_url(mut self, url: impl Into<String>) -> Self {
        self.source_url = Some(url.into());
        self
    }

    /// Set the expected SHA-256 digest.
    pub fn with_checksum(mut self, digest: impl Into<String>) -> Self {
        self.expected_checksum = Some(digest.into());
        self
    }

    /// Set the version string.
    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// Set the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Whether a local artifact has been recorded for this distribution.
    pub fn is_acquired(&self) -> bool {
        self.local_file_path.is_some()
    }
}
