//! JSON-backed distribution catalog.
//!
//! The catalog is a simple record store mapping distribution names to
//! [`DistributionRecord`]s, persisted as pretty-printed JSON. Artifact paths
//! are derived deterministically from the name, independent of acquisition
//! state, so callers can compute destinations before anything is downloaded.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use thiserror::Error;

use super::record::DistributionRecord;

/// Errors from catalog persistence.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// Failed to read the catalog index file.
    #[error("failed to read catalog {}: {source}", path.display())]
    ReadFailed { path: PathBuf, source: io::Error },

    /// Failed to write the catalog index file.
    #[error("failed to write catalog {}: {source}", path.display())]
    WriteFailed { path: PathBuf, source: io::Error },

    /// The catalog index file is not valid JSON.
    #[error("failed to parse catalog {}: {source}", path.display())]
    ParseFailed {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Catalog collaborator consumed by the acquisition orchestrator.
pub trait Catalog: Send + Sync {
    /// Look up a record by name.
    fn get_distribution(&self, name: &str) -> Option<DistributionRecord>;

    /// Replace (or insert) a record and persist the change.
    fn update_distribution(&self, record: DistributionRecord) -> Result<(), CatalogError>;

    /// Deterministic on-disk location of the normalized artifact for `name`.
    ///
    /// Independent of whether the artifact exists yet. The extension is
    /// always `.rootfs.tar`; the payload inside may be gzip-compressed, and
    /// consumers route on sniffed format rather than extension.
    fn canonical_path(&self, name: &str) -> PathBuf;
}

/// File-backed [`Catalog`] implementation.
#[derive(Debug)]
pub struct JsonCatalog {
    index_path: PathBuf,
    artifacts_dir: PathBuf,
    records: Mutex<BTreeMap<String, DistributionRecord>>,
}

impl JsonCatalog {
    /// Open a catalog, loading the index file if it exists.
    pub fn open(
        index_path: impl Into<PathBuf>,
        artifacts_dir: impl Into<PathBuf>,
    ) -> Result<Self, CatalogError> {
        let index_path = index_path.into();

        let records = if index_path.exists() {
            let content =
                fs::read_to_string(&index_path).map_err(|e| CatalogError::ReadFailed {
                    path: index_path.clone(),
                    source: e,
                })?;
            serde_json::from_str(&content).map_err(|e| CatalogError::ParseFailed {
                path: index_path.clone(),
                source: e,
            })?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            index_path,
            artifacts_dir: artifacts_dir.into(),
            records: Mutex::new(records),
        })
    }

    /// Insert records that are not yet present, then persist.
    ///
    /// Existing records win so a re-seed never clobbers acquisition state.
    pub fn seed(&self, records: Vec<DistributionRecord>) -> Result<(), CatalogError> {
        let mut map = self.records.lock();
        for record in records {
            map.entry(record.name.clone()).or_insert(record);
        }
        self.save(&map)
    }

    /// All records, ordered by name.
    pub fn list(&self) -> Vec<DistributionRecord> {
        self.records.lock().values().cloned().collect()
    }

    /// Remove a record entirely and persist.
    pub fn remove(&self, name: &str) -> Result<Option<DistributionRecord>, CatalogError> {
        let mut map = self.records.lock();
        let removed = map.remove(name);
        if removed.is_some() {
            self.save(&map)?;
        }
        Ok(removed)
    }

    /// Path of the backing index file.
    pub fn index_path(&self) -> &Path {
        &self.index_path
    }

    /// Directory where normalized artifacts are placed.
    pub fn artifacts_dir(&self) -> &Path {
        &self.artifacts_dir
    }

    fn save(&self, map: &BTreeMap<String, DistributionRecord>) -> Result<(), CatalogError> {
        if let Some(parent) = self.index_path.parent() {
            fs::create_dir_all(parent).map_err(|e| CatalogError::WriteFailed {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }

        let content = serde_json::to_string_pretty(map).map_err(|e| CatalogError::ParseFailed {
            path: self.index_path.clone(),
            source: e,
        })?;

        fs::write(&self.index_path, content).map_err(|e| CatalogError::WriteFailed {
            path: self.index_path.clone(),
            source: e,
        })
    }
}

impl Catalog for JsonCatalog {
    fn get_distribution(&self, name: &str) -> Option<DistributionRecord> {
        self.records.lock().get(name).cloned()
    }

    fn update_distribution(&self, record: DistributionRecord) -> Result<(), CatalogError> {
        let mut map = self.records.lock();
        map.insert(record.name.clone(), record);
        self.save(&map)
    }

    fn canonical_path(&self, name: &str) -> PathBuf {
        self.artifacts_dir.join(format!("{}.rootfs.tar", name))
    }
}
