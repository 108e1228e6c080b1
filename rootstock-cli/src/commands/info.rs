//! Info command: show one catalog record in detail.

use console::style;
use rootstock::catalog::Catalog;

use super::{format_bytes, load_config, open_catalog};
use crate::error::CliError;

/// Run the info command.
pub fn run_info(name: &str) -> Result<(), CliError> {
    let config = load_config();
    let catalog = open_catalog(&config)?;

    let record = catalog
        .get_distribution(name)
        .ok_or_else(|| CliError::UnknownDistribution(name.to_string()))?;

    println!("{}", style(&record.display_name).bold());
    println!("  name:         {}", record.name);
    if !record.description.is_empty() {
        println!("  description:  {}", record.description);
    }
    if !record.version.is_empty() {
        println!("  version:      {}", record.version);
    }
    println!("  architecture: {}", record.architecture);
    println!(
        "  source:       {}",
        record.source_url.as_deref().unwrap_or("(none)")
    );
    println!(
        "  checksum:     {}",
        record.expected_checksum.as_deref().unwrap_or("(none)")
    );

    match (&record.local_file_path, record.size_bytes) {
        (Some(path), Some(size)) => {
            println!("  artifact:     {} ({})", path.display(), format_bytes(size));
        }
        (Some(path), None) => println!("  artifact:     {}", path.display()),
        _ => println!("  artifact:     not acquired"),
    }
    if let Some(when) = record.acquired_at {
        println!("  acquired at:  {}", when.to_rfc3339());
    }

    Ok(())
}
