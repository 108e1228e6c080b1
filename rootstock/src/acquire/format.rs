//! Container format detection by magic bytes.
//!
//! Distribution vendors routinely mislabel files (ZIP content served with a
//! `.tar` extension has been observed in the wild), so every routing decision
//! in the pipeline is made from the file's leading bytes. The extension is
//! never consulted.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use super::error::{AcquireError, AcquireResult};

/// Number of leading bytes inspected; covers the tar magic at offset 257.
const SNIFF_LEN: u64 = 512;

/// Byte offset of the "ustar" magic within a tar header.
const TAR_MAGIC_OFFSET: usize = 257;

/// Container formats the pipeline can route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// Uncompressed POSIX tar archive.
    Tar,
    /// Gzip stream (in practice a compressed tar).
    Gzip,
    /// ZIP-family container, including app-package bundles.
    Zip,
    /// XZ stream.
    Xz,
    /// None of the known magics matched.
    Unknown,
}

impl ArchiveFormat {
    /// Whether this format is directly consumable as a payload archive
    /// (TAR, optionally gzip-compressed) without further unpacking.
    pub fn is_payload(&self) -> bool {
        matches!(self, Self::Tar | Self::Gzip)
    }

    /// Short lowercase label for logs and messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Tar => "tar",
            Self::Gzip => "gzip",
            Self::Zip => "zip",
            Self::Xz => "xz",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Classify a file by its leading bytes.
///
/// Reads at most the first 512 bytes. Checks are ordered so that container
/// magics at offset zero win over the deeper tar magic.
pub fn detect_format(path: &Path) -> AcquireResult<ArchiveFormat> {
    let file = File::open(path).map_err(|e| AcquireError::ReadFailed {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut header = Vec::with_capacity(SNIFF_LEN as usize);
    file.take(SNIFF_LEN)
        .read_to_end(&mut header)
        .map_err(|e| AcquireError::ReadFailed {
            path: path.to_path_buf(),
            source: e,
        })?;

    Ok(classify(&header))
}

/// Classification rules, in priority order.
fn classify(header: &[u8]) -> ArchiveFormat {
    if header.len() >= 2 && header[0] == 0x1F && header[1] == 0x8B {
        return ArchiveFormat::Gzip;
    }
    if header.len() >= 2 && header[0] == b'P' && header[1] == b'K' {
        return ArchiveFormat::Zip;
    }
    if header.len() >= 5 && header[..5] == [0xFD, b'7', b'z', b'X', b'Z'] {
        return ArchiveFormat::Xz;
    }
    if header.len() >= TAR_MAGIC_OFFSET + 5 && &header[TAR_MAGIC_OFFSET..TAR_MAGIC_OFFSET + 5] == b"ustar" {
        return ArchiveFormat::Tar;
    }
    ArchiveFormat::Unknown
}
