//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting,
//! kind-specific remediation hints, and appropriate exit codes.

use std::fmt;
use std::process;

use rootstock::acquire::AcquireError;
use rootstock::catalog::CatalogError;
use rootstock::config::ConfigFileError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Configuration error
    Config(String),
    /// Catalog could not be opened or written
    Catalog(CatalogError),
    /// An acquisition failed
    Acquire(AcquireError),
    /// A named distribution does not exist in the catalog
    UnknownDistribution(String),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        // Cancellation is a normal outcome, not an error report.
        if let CliError::Acquire(AcquireError::Cancelled) = self {
            eprintln!("Cancelled.");
            process::exit(130);
        }

        eprintln!("Error: {}", self);

        // Print additional help for specific errors
        match self {
            CliError::Acquire(AcquireError::SourceUnreachable { .. }) => {
                eprintln!();
                eprintln!("The distribution source could not be reached. Check:");
                eprintln!("  1. Your network connection");
                eprintln!("  2. The source URL recorded in the catalog (rootstock info <name>)");
            }
            CliError::Acquire(AcquireError::ChecksumMismatch { .. }) => {
                eprintln!();
                eprintln!("The downloaded package did not match its recorded digest.");
                eprintln!("The transfer may have been corrupted; try acquiring again.");
            }
            CliError::Acquire(AcquireError::ExtractionToolFailed { .. }) => {
                eprintln!();
                eprintln!("An external extraction tool is required:");
                eprintln!("  Linux/macOS: install 'unzip' or 'bsdtar' (libarchive)");
                eprintln!("  Windows: PowerShell with Expand-Archive");
            }
            CliError::Acquire(AcquireError::PayloadNotFound { .. }) => {
                eprintln!();
                eprintln!("The package format was not recognized; no rootfs archive was");
                eprintln!("found inside the downloaded package.");
            }
            _ => {}
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::Catalog(e) => write!(f, "Catalog error: {}", e),
            CliError::Acquire(e) => write!(f, "Acquisition failed: {}", e),
            CliError::UnknownDistribution(name) => {
                write!(
                    f,
                    "Unknown distribution '{}'. Use 'rootstock list' to see the catalog.",
                    name
                )
            }
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::Catalog(e) => Some(e),
            CliError::Acquire(e) => Some(e),
            _ => None,
        }
    }
}

impl From<CatalogError> for CliError {
    fn from(e: CatalogError) -> Self {
        CliError::Catalog(e)
    }
}

impl From<AcquireError> for CliError {
    fn from(e: AcquireError) -> Self {
        CliError::Acquire(e)
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}
