//! List command: show the catalog.

use console::style;

use super::{format_bytes, load_config, open_catalog};
use crate::error::CliError;

/// Run the list command.
pub fn run_list() -> Result<(), CliError> {
    let config = load_config();
    let catalog = open_catalog(&config)?;

    let records = catalog.list();
    if records.is_empty() {
        println!("Catalog is empty.");
        println!(
            "Add a distribution with: rootstock add <name> --url <source-url> --arch <x64|arm64>"
        );
        return Ok(());
    }

    println!(
        "{:<24} {:<8} {:<10} {:<10} STATUS",
        "DISTRIBUTION", "ARCH", "VERSION", "SIZE"
    );
    for record in records {
        let size = record
            .size_bytes
            .map(format_bytes)
            .unwrap_or_else(|| "-".to_string());
        let status = if record.is_acquired() {
            style("acquired").green()
        } else {
            style("pending").dim()
        };
        println!(
            "{:<24} {:<8} {:<10} {:<10} {}",
            record.display_name, record.architecture, record.version, size, status
        );
    }

    Ok(())
}
