//! Remove command: delete an artifact and/or its catalog record.

use std::fs;

use rootstock::catalog::Catalog;

use super::{load_config, open_catalog};
use crate::error::CliError;

/// Run the remove command.
///
/// Removes the acquired artifact; with `purge`, drops the catalog record
/// entirely instead of just clearing its acquisition state.
pub fn run_remove(name: &str, purge: bool) -> Result<(), CliError> {
    let config = load_config();
    let catalog = open_catalog(&config)?;

    let Some(mut record) = catalog.get_distribution(name) else {
        return Err(CliError::UnknownDistribution(name.to_string()));
    };

    let canonical = catalog.canonical_path(name);
    if canonical.exists() {
        fs::remove_file(&canonical).map_err(|e| {
            CliError::Config(format!(
                "failed to remove artifact {}: {}",
                canonical.display(),
                e
            ))
        })?;
        println!("Removed artifact {}.", canonical.display());
    }

    if purge {
        catalog.remove(name)?;
        println!("Removed catalog record for {}.", name);
    } else if record.is_acquired() {
        record.local_file_path = None;
        record.size_bytes = None;
        record.acquired_at = None;
        catalog.update_distribution(record)?;
        println!("Cleared acquisition state for {}.", name);
    } else {
        println!("Nothing to remove for {}.", name);
    }

    Ok(())
}
