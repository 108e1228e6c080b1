//! ZIP-family container extraction via platform tools.
//!
//! App-package bundles and plain ZIPs are unpacked with whatever the host
//! toolchain provides rather than an in-process decoder: `unzip` (or
//! `bsdtar`) on POSIX hosts, `Expand-Archive` on Windows. Some of these
//! tools dispatch on the file extension, so mislabeled containers are copied
//! to a `.zip`-suffixed shim path first where required.

use std::fs;
use std::path::Path;
#[cfg(windows)]
use std::path::PathBuf;

use tracing::debug;

use super::error::{AcquireError, AcquireResult};
use super::tool::{SystemToolRunner, ToolRunner};

/// Extraction seam: unpack a ZIP-family container into a directory.
pub trait ContainerExtract: Send + Sync {
    /// Extract `container` into `out_dir`, creating the directory if needed.
    fn extract(&self, container: &Path, out_dir: &Path) -> AcquireResult<()>;
}

/// Production extractor that shells out through a [`ToolRunner`].
#[derive(Debug, Default)]
pub struct ToolExtractor<R: ToolRunner = SystemToolRunner> {
    runner: R,
}

impl ToolExtractor<SystemToolRunner> {
    /// Create an extractor backed by the system process runner.
    pub fn new() -> Self {
        Self {
            runner: SystemToolRunner::new(),
        }
    }
}

impl<R: ToolRunner> ToolExtractor<R> {
    /// Create an extractor with a custom runner (used by tests).
    pub fn with_runner(runner: R) -> Self {
        Self { runner }
    }

    fn run_extraction(&self, tool: &str, args: &[&str]) -> AcquireResult<()> {
        debug!(tool, ?args, "running extraction tool");

        let output =
            self.runner
                .run(tool, args)
                .map_err(|e| AcquireError::ExtractionToolFailed {
                    tool: tool.to_string(),
                    status: -1,
                    stderr: e.to_string(),
                })?;

        if !output.success() {
            return Err(AcquireError::ExtractionToolFailed {
                tool: tool.to_string(),
                status: output.exit_code,
                stderr: output.stderr.trim().to_string(),
            });
        }

        Ok(())
    }

    #[cfg(not(windows))]
    fn extract_container(&self, container: &Path, out_dir: &Path) -> AcquireResult<()> {
        let container_str = container.to_str().unwrap_or("");
        let out_str = out_dir.to_str().unwrap_or("");

        // unzip ignores extensions entirely; bsdtar is the fallback on hosts
        // without it.
        if self.runner.is_available("unzip", "-v") {
            self.run_extraction("unzip", &["-o", "-q", container_str, "-d", out_str])
        } else {
            self.run_extraction("bsdtar", &["-xf", container_str, "-C", out_str])
        }
    }

    #[cfg(windows)]
    fn extract_container(&self, container: &Path, out_dir: &Path) -> AcquireResult<()> {
        // Expand-Archive refuses anything not named *.zip, and vendors ship
        // bundles under other extensions; extract through a renamed shim copy
        // and drop it afterwards whatever the outcome.
        let shim = ZipShim::create(container)?;

        let command = format!(
            "Expand-Archive -LiteralPath '{}' -DestinationPath '{}' -Force",
            shim.path().display(),
            out_dir.display()
        );

        self.run_extraction(
            "powershell",
            &["-NoProfile", "-NonInteractive", "-Command", &command],
        )
    }
}

impl<R: ToolRunner> ContainerExtract for ToolExtractor<R> {
    fn extract(&self, container: &Path, out_dir: &Path) -> AcquireResult<()> {
        fs::create_dir_all(out_dir).map_err(|e| AcquireError::CreateDirFailed {
            path: out_dir.to_path_buf(),
            source: e,
        })?;

        self.extract_container(container, out_dir)
    }
}

/// Temporary `.zip`-suffixed copy of a container, for extension-dispatching
/// tools. Removed on drop.
#[cfg(windows)]
struct ZipShim {
    path: PathBuf,
    owned: bool,
}

#[cfg(windows)]
impl ZipShim {
    fn create(container: &Path) -> AcquireResult<Self> {
        if container
            .extension()
            .map(|e| e.eq_ignore_ascii_case("zip"))
            .unwrap_or(false)
        {
            return Ok(Self {
                path: container.to_path_buf(),
                owned: false,
            });
        }

        let shim = container.with_extension("shim.zip");
        fs::copy(container, &shim).map_err(|e| AcquireError::WriteFailed {
            path: shim.clone(),
            source: e,
        })?;

        Ok(Self {
            path: shim,
            owned: true,
        })
    }

    fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(windows)]
impl Drop for ZipShim {
    fn drop(&mut self) {
        if self.owned {
            fs::remove_file(&self.path).ok();
        }
    }
}

/// Check that a usable extraction tool is installed on this host.
pub fn check_extraction_tools() -> AcquireResult<()> {
    let runner = SystemToolRunner::new();

    #[cfg(windows)]
    let found = runner.is_available("powershell", "-Help");
    #[cfg(not(windows))]
    let found = runner.is_available("unzip", "-v") || runner.is_available("bsdtar", "--version");

    if !found {
        return Err(AcquireError::ExtractionToolFailed {
            tool: if cfg!(windows) {
                "powershell".to_string()
            } else {
                "unzip/bsdtar".to_string()
            },
            status: -1,
            stderr: "no archive extraction tool found on this host".to_string(),
        });
    }

    Ok(())
}
