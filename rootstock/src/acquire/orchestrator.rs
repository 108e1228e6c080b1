//! End-to-end acquisition of a named distribution.
//!
//! Drives the full pipeline as a state machine:
//!
//! ```text
//! Pending → ValidatingSource → Downloading → Verifying
//!         → ResolvingPayload → Finalizing → Done
//! ```
//!
//! Any step can fail; failures clean up their temp state before propagating.
//! At most one acquisition per distribution name is in flight at a time,
//! enforced by an in-memory registry that doubles as the cancellation
//! routing table. The canonical artifact path is only ever written by the
//! finalization step, via a same-directory rename, so a cancelled or failed
//! acquisition can never leave a half-written artifact behind.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::Utc;
use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::catalog::Catalog;
use crate::config::AcquireConfig;

use super::checksum::{calculate_file_checksum, verify_checksum};
use super::download::{DownloadOptions, HttpDownloader, ProgressCallback};
use super::error::{AcquireError, AcquireResult};
use super::extract::{ContainerExtract, ToolExtractor};
use super::resolve::BundleResolver;
use super::tool::SystemToolRunner;

/// Stages of one acquisition, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquireStage {
    /// Acquisition accepted, nothing started yet.
    Pending,
    /// Probing the source URL.
    ValidatingSource,
    /// Transferring the package.
    Downloading,
    /// Verifying the downloaded package digest.
    Verifying,
    /// Locating the payload inside the package.
    ResolvingPayload,
    /// Placing the artifact and updating the catalog.
    Finalizing,
    /// Acquisition complete.
    Done,
}

impl AcquireStage {
    /// Human-readable stage label.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pending => "Pending",
            Self::ValidatingSource => "Validating source",
            Self::Downloading => "Downloading",
            Self::Verifying => "Verifying",
            Self::ResolvingPayload => "Resolving payload",
            Self::Finalizing => "Finalizing",
            Self::Done => "Done",
        }
    }
}

/// Stage callback: `(stage, progress_within_stage_0_to_1, message)`.
pub type StageCallback = Box<dyn Fn(AcquireStage, f64, &str) + Send + Sync>;

/// Options for one acquisition.
#[derive(Default)]
pub struct AcquireOptions {
    /// Called at stage transitions.
    pub on_stage: Option<StageCallback>,
    /// Called with download byte progress (throttled by the downloader).
    pub on_download: Option<ProgressCallback>,
    /// Overrides the record's expected checksum when set.
    pub expected_checksum: Option<String>,
}

impl AcquireOptions {
    /// Attach a stage callback.
    pub fn with_stage_callback(mut self, cb: StageCallback) -> Self {
        self.on_stage = Some(cb);
        self
    }

    /// Attach a download progress callback.
    pub fn with_download_callback(mut self, cb: ProgressCallback) -> Self {
        self.on_download = Some(cb);
        self
    }

    /// Override the expected checksum.
    pub fn with_expected_checksum(mut self, digest: impl Into<String>) -> Self {
        self.expected_checksum = Some(digest.into());
        self
    }
}

/// Result of a successful acquisition.
#[derive(Debug, Clone)]
pub struct AcquireOutcome {
    /// Distribution name.
    pub name: String,
    /// Canonical artifact path, now populated.
    pub artifact_path: PathBuf,
    /// Size of the artifact in bytes.
    pub size_bytes: u64,
    /// Bytes transferred over the network (0 when skipped).
    pub bytes_downloaded: u64,
    /// Whether the existing verified artifact was reused without a transfer.
    pub skipped: bool,
}

/// Coordinates acquisitions against a catalog.
pub struct AcquisitionManager<C: Catalog, E: ContainerExtract = ToolExtractor<SystemToolRunner>> {
    catalog: Arc<C>,
    extractor: E,
    config: AcquireConfig,
    downloader: HttpDownloader,
    in_flight: Mutex<HashMap<String, CancellationToken>>,
}

impl<C: Catalog> AcquisitionManager<C> {
    /// Create a manager using the system tool extractor.
    pub fn new(catalog: Arc<C>, config: AcquireConfig) -> Self {
        Self::with_extractor(catalog, config, ToolExtractor::new())
    }
}

impl<C: Catalog, E: ContainerExtract> AcquisitionManager<C, E> {
    /// Create a manager with a custom extractor (used by tests).
    pub fn with_extractor(catalog: Arc<C>, config: AcquireConfig, extractor: E) -> Self {
        let downloader = HttpDownloader::with_timeout(config.timeout);
        Self {
            catalog,
            extractor,
            config,
            downloader,
            in_flight: Mutex::new(HashMap::new()),
        }
    }

    /// Acquire a named distribution, driving the full state machine.
    ///
    /// Rejects with [`AcquireError::AcquisitionInProgress`] when another
    /// acquisition for the same name is running.
    pub fn acquire(&self, name: &str, options: AcquireOptions) -> AcquireResult<AcquireOutcome> {
        let cancel = CancellationToken::new();
        let _guard = self.register(name, cancel.clone())?;

        let result = self.run_pipeline(name, options, &cancel);
        match &result {
            Ok(outcome) if outcome.skipped => {
                info!(name, "acquisition skipped, artifact already present")
            }
            Ok(outcome) => info!(
                name,
                size_bytes = outcome.size_bytes,
                "acquisition complete"
            ),
            Err(err) => warn!(name, error = %err, "acquisition failed"),
        }
        result
    }

    /// Cancel an in-flight acquisition by name. No-op when none is running.
    pub fn cancel_acquisition(&self, name: &str) {
        if let Some(token) = self.in_flight.lock().get(name) {
            token.cancel();
        }
    }

    /// Whether an acquisition for `name` is currently in flight.
    pub fn is_acquiring(&self, name: &str) -> bool {
        self.in_flight.lock().contains_key(name)
    }

    fn register(&self, name: &str, cancel: CancellationToken) -> AcquireResult<InFlightGuard<'_>> {
        let mut map = self.in_flight.lock();
        if map.contains_key(name) {
            return Err(AcquireError::AcquisitionInProgress {
                name: name.to_string(),
            });
        }
        map.insert(name.to_string(), cancel);
        Ok(InFlightGuard {
            registry: &self.in_flight,
            name: name.to_string(),
        })
    }

    fn run_pipeline(
        &self,
        name: &str,
        options: AcquireOptions,
        cancel: &CancellationToken,
    ) -> AcquireResult<AcquireOutcome> {
        let AcquireOptions {
            on_stage,
            on_download,
            expected_checksum,
        } = options;

        let report = |stage: AcquireStage, progress: f64, message: &str| {
            debug!(name, stage = stage.name(), progress, message, "stage");
            if let Some(cb) = &on_stage {
                cb(stage, progress, message);
            }
        };

        let record =
            self.catalog
                .get_distribution(name)
                .ok_or_else(|| AcquireError::UnknownDistribution {
                    name: name.to_string(),
                })?;
        let canonical = self.catalog.canonical_path(name);
        let expected = expected_checksum.or_else(|| record.expected_checksum.clone());

        report(AcquireStage::Pending, 0.0, "starting acquisition");

        // Idempotent re-acquisition: a verified artifact needs no transfer.
        if canonical.exists() && self.config.verify_checksums {
            if let Some(exp) = expected.as_deref() {
                if verify_checksum(&canonical, exp)? {
                    let size = file_size(&canonical)?;
                    self.finalize_record(record.clone(), &canonical, size)?;
                    report(AcquireStage::Done, 1.0, "artifact already present and verified");
                    return Ok(AcquireOutcome {
                        name: name.to_string(),
                        artifact_path: canonical,
                        size_bytes: size,
                        bytes_downloaded: 0,
                        skipped: true,
                    });
                }
            }
        }

        let url = record
            .source_url
            .clone()
            .ok_or_else(|| AcquireError::MissingSourceUrl {
                name: name.to_string(),
            })?;

        report(AcquireStage::ValidatingSource, 0.0, "checking source availability");
        self.downloader.check_reachable(&url)?;

        if cancel.is_cancelled() {
            return Err(AcquireError::Cancelled);
        }

        fs::create_dir_all(&self.config.staging_dir).map_err(|e| {
            AcquireError::CreateDirFailed {
                path: self.config.staging_dir.clone(),
                source: e,
            }
        })?;
        let download_path = self.config.staging_dir.join(format!("{}.download", name));
        let payload_path = self.config.staging_dir.join(format!("{}.payload", name));

        // Resume a previous partial transfer for this name, if one is left.
        let resume_from = download_path.metadata().map(|m| m.len()).unwrap_or(0);

        report(AcquireStage::Downloading, 0.0, "downloading package");
        let mut download_opts = DownloadOptions::default()
            .with_cancellation(cancel.clone())
            .resume_from(resume_from)
            .keep_partial_on_error(true);
        if let Some(cb) = on_download {
            download_opts = download_opts.with_progress(cb);
        }
        let bytes_downloaded = self.downloader.download(&url, &download_path, &download_opts)?;
        report(AcquireStage::Downloading, 1.0, "download complete");

        report(AcquireStage::Verifying, 0.0, "verifying package digest");
        if let Some(exp) = expected.as_deref() {
            if self.config.verify_checksums {
                let actual = calculate_file_checksum(&download_path)?;
                if !actual.eq_ignore_ascii_case(exp.trim()) {
                    fs::remove_file(&download_path).ok();
                    return Err(AcquireError::ChecksumMismatch {
                        filename: file_name(&download_path),
                        expected: exp.to_string(),
                        actual,
                    });
                }
            }
        } else {
            warn!(name, "no expected checksum recorded; proceeding unverified");
        }
        report(AcquireStage::Verifying, 1.0, "package verified");

        if cancel.is_cancelled() {
            fs::remove_file(&download_path).ok();
            return Err(AcquireError::Cancelled);
        }

        report(AcquireStage::ResolvingPayload, 0.0, "resolving payload archive");
        let resolver = BundleResolver::new(
            &self.extractor,
            record.architecture,
            &self.config.staging_dir,
        )
        .with_cancellation(cancel.clone());

        let payload = match resolver.resolve_payload(&download_path, &payload_path) {
            Ok(Some(path)) => path,
            Ok(None) => {
                let err = AcquireError::PayloadNotFound {
                    path: download_path.clone(),
                };
                fs::remove_file(&download_path).ok();
                return Err(err);
            }
            Err(err) => {
                fs::remove_file(&download_path).ok();
                fs::remove_file(&payload_path).ok();
                return Err(err);
            }
        };
        report(AcquireStage::ResolvingPayload, 1.0, "payload located");

        if cancel.is_cancelled() {
            fs::remove_file(&download_path).ok();
            fs::remove_file(&payload_path).ok();
            return Err(AcquireError::Cancelled);
        }

        report(AcquireStage::Finalizing, 0.0, "placing artifact");
        place_atomically(&payload, &canonical)?;
        let size = file_size(&canonical)?;
        self.finalize_record(record, &canonical, size)?;

        fs::remove_file(&download_path).ok();
        fs::remove_file(&payload_path).ok();

        report(AcquireStage::Done, 1.0, "acquisition complete");
        Ok(AcquireOutcome {
            name: name.to_string(),
            artifact_path: canonical,
            size_bytes: size,
            bytes_downloaded,
            skipped: false,
        })
    }

    fn finalize_record(
        &self,
        mut record: crate::catalog::DistributionRecord,
        canonical: &Path,
        size: u64,
    ) -> AcquireResult<()> {
        record.local_file_path = Some(canonical.to_path_buf());
        record.size_bytes = Some(size);
        record.acquired_at = Some(Utc::now());
        self.catalog.update_distribution(record)?;
        Ok(())
    }
}

/// Removes the in-flight registry entry when an acquisition ends, on every
/// path out of `acquire`.
struct InFlightGuard<'a> {
    registry: &'a Mutex<HashMap<String, CancellationToken>>,
    name: String,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.registry.lock().remove(&self.name);
    }
}

/// Stage a copy next to the canonical path, then rename into place. The
/// rename stays within one directory, so the artifact is never observable
/// half-written.
fn place_atomically(payload: &Path, canonical: &Path) -> AcquireResult<()> {
    let parent = canonical.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| AcquireError::CreateDirFailed {
        path: parent.to_path_buf(),
        source: e,
    })?;

    let staged = parent.join(format!(".{}.partial", file_name(canonical)));
    fs::copy(payload, &staged).map_err(|e| AcquireError::WriteFailed {
        path: staged.clone(),
        source: e,
    })?;

    fs::rename(&staged, canonical).map_err(|e| {
        fs::remove_file(&staged).ok();
        AcquireError::WriteFailed {
            path: canonical.to_path_buf(),
            source: e,
        }
    })
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

fn file_size(path: &Path) -> AcquireResult<u64> {
    path.metadata()
        .map(|m| m.len())
        .map_err(|e| AcquireError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })
}
