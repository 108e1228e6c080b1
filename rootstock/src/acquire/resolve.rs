//! Nested-bundle resolution: locate the payload archive inside a download.
//!
//! Vendors publish rootfs images in several shapes: the payload tar (plain
//! or gzipped) directly, a ZIP wrapped around it, or an app-package bundle
//! holding one sub-package per CPU architecture, each itself a container
//! around the real payload. Resolution walks these layers with a bounded
//! number of unpacking steps, routing purely on sniffed format.
//!
//! Every extraction step gets its own [`ExtractionWorkspace`], and all
//! workspaces are released on every exit path, including errors.

use std::fs;
use std::path::{Path, PathBuf};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::catalog::Architecture;

use super::error::{AcquireError, AcquireResult};
use super::extract::ContainerExtract;
use super::format::{detect_format, ArchiveFormat};
use super::workspace::ExtractionWorkspace;

/// Maximum number of container layers unpacked before giving up.
///
/// Two covers every shape seen in the wild (bundle → per-arch package →
/// payload); the bound keeps adversarial inputs from recursing forever.
pub const MAX_NESTING_DEPTH: usize = 2;

/// Outcome of inspecting one extracted container layer.
enum LayerContent {
    /// The layer holds per-architecture sub-packages to descend into.
    Bundles(Vec<PathBuf>),
    /// The layer holds a payload archive directly.
    Payload(PathBuf),
    /// Nothing usable at this layer.
    Empty,
}

/// Locates and stages the payload archive from a downloaded package.
pub struct BundleResolver<'a, E: ContainerExtract> {
    extractor: &'a E,
    architecture: Architecture,
    staging_dir: PathBuf,
    cancel: CancellationToken,
}

impl<'a, E: ContainerExtract> BundleResolver<'a, E> {
    /// Create a resolver that unpacks into `staging_dir`.
    pub fn new(extractor: &'a E, architecture: Architecture, staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            extractor,
            architecture,
            staging_dir: staging_dir.into(),
            cancel: CancellationToken::new(),
        }
    }

    /// Attach a cancellation token, checked before each resolution step.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Resolve `downloaded` to a payload archive copied to `dest`.
    ///
    /// Returns `Ok(None)` when the search exhausts every layer without
    /// finding a payload, a reportable condition rather than a crash. The caller
    /// keeps ownership of `downloaded`; `dest` is only written on success.
    pub fn resolve_payload(
        &self,
        downloaded: &Path,
        dest: &Path,
    ) -> AcquireResult<Option<PathBuf>> {
        // Workspaces stay alive across layers because the current candidate
        // lives inside the previous layer's directory; all of them are
        // removed when this scope exits, on any path.
        let mut workspaces: Vec<ExtractionWorkspace> = Vec::new();
        let mut current = downloaded.to_path_buf();

        for depth in 0..=MAX_NESTING_DEPTH {
            if self.cancel.is_cancelled() {
                return Err(AcquireError::Cancelled);
            }

            let format = detect_format(&current)?;
            debug!(path = %current.display(), %format, depth, "inspecting candidate");

            match format {
                ArchiveFormat::Tar | ArchiveFormat::Gzip => {
                    // The candidate already is the payload.
                    stage_payload(&current, dest)?;
                    return Ok(Some(dest.to_path_buf()));
                }
                ArchiveFormat::Zip => {
                    let workspace = ExtractionWorkspace::create(&self.staging_dir)?;
                    self.extractor.extract(&current, workspace.path())?;

                    match self.inspect_layer(workspace.path())? {
                        LayerContent::Bundles(candidates) => {
                            let selected = self.select_bundle(candidates);
                            info!(
                                selected = %selected.display(),
                                depth,
                                "descending into nested package"
                            );
                            current = selected;
                            workspaces.push(workspace);
                        }
                        LayerContent::Payload(payload) => {
                            stage_payload(&payload, dest)?;
                            return Ok(Some(dest.to_path_buf()));
                        }
                        LayerContent::Empty => return Ok(None),
                    }
                }
                ArchiveFormat::Xz | ArchiveFormat::Unknown => {
                    // Not a payload and not a container we can open.
                    debug!(path = %current.display(), %format, "candidate is not usable");
                    return Ok(None);
                }
            }
        }

        // Still nested after the last allowed unpacking step.
        Ok(None)
    }

    /// Classify an extracted layer: nested packages win over direct payloads.
    fn inspect_layer(&self, root: &Path) -> AcquireResult<LayerContent> {
        let files = list_files_sorted(root)?;

        let bundles: Vec<PathBuf> = files
            .iter()
            .filter(|p| file_name_has_architecture_token(p))
            .cloned()
            .collect();
        if !bundles.is_empty() {
            return Ok(LayerContent::Bundles(bundles));
        }

        // No sub-packages; look for a payload archive by sniffed format,
        // preferring the conventional "install" name.
        let mut payloads: Vec<&PathBuf> = Vec::new();
        for path in &files {
            if detect_format(path)?.is_payload() {
                payloads.push(path);
            }
        }

        let preferred = payloads
            .iter()
            .find(|p| {
                let name = file_name_lower(p);
                name.contains("install") && (name.ends_with(".tar") || name.ends_with(".tar.gz"))
            })
            .or_else(|| payloads.first());

        Ok(match preferred {
            Some(path) => LayerContent::Payload((*path).clone()),
            None => LayerContent::Empty,
        })
    }

    /// Pick the sub-package for the requested architecture, falling back to
    /// the first candidate (candidates arrive lexicographically sorted, so
    /// the tie-break is reproducible across platforms and tools).
    fn select_bundle(&self, candidates: Vec<PathBuf>) -> PathBuf {
        candidates
            .iter()
            .find(|p| self.architecture.matches_name(&file_name_lower(p)))
            .cloned()
            .unwrap_or_else(|| candidates[0].clone())
    }
}

/// Copy (never move) a payload into place; the source may live in a scratch
/// directory on another filesystem.
fn stage_payload(payload: &Path, dest: &Path) -> AcquireResult<()> {
    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent).map_err(|e| AcquireError::CreateDirFailed {
            path: parent.to_path_buf(),
            source: e,
        })?;
    }

    fs::copy(payload, dest).map_err(|e| AcquireError::WriteFailed {
        path: dest.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// All regular files under `root`, lexicographically sorted by path.
fn list_files_sorted(root: &Path) -> AcquireResult<Vec<PathBuf>> {
    let mut files = Vec::new();
    collect_files(root, &mut files)?;
    files.sort();
    Ok(files)
}

fn collect_files(dir: &Path, out: &mut Vec<PathBuf>) -> AcquireResult<()> {
    let entries = fs::read_dir(dir).map_err(|e| AcquireError::ReadFailed {
        path: dir.to_path_buf(),
        source: e,
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| AcquireError::ReadFailed {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        if path.is_dir() {
            collect_files(&path, out)?;
        } else {
            out.push(path);
        }
    }

    Ok(())
}

fn file_name_lower(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_default()
}

fn file_name_has_architecture_token(path: &Path) -> bool {
    let name = file_name_lower(path);
    Architecture::all_tokens().any(|t| name.contains(t))
}
