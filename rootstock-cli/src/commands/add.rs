//! Add command: register a distribution in the catalog.

use clap::Args;
use rootstock::catalog::{Architecture, Catalog, DistributionRecord};

use super::{load_config, open_catalog};
use crate::error::CliError;

/// Arguments for the add command.
#[derive(Debug, Args)]
pub struct AddArgs {
    /// Unique distribution name (slug), e.g. "alpine-3.19"
    pub name: String,

    /// Source URL of the distributable package
    #[arg(long)]
    pub url: String,

    /// Target CPU architecture
    #[arg(long, default_value_t = Architecture::host().to_string())]
    pub arch: String,

    /// Human-readable display name (defaults to the slug)
    #[arg(long)]
    pub display_name: Option<String>,

    /// Vendor version string
    #[arg(long)]
    pub version: Option<String>,

    /// Expected SHA-256 digest of the package
    #[arg(long)]
    pub checksum: Option<String>,

    /// Longer description
    #[arg(long)]
    pub description: Option<String>,
}

/// Run the add command.
pub fn run_add(args: AddArgs) -> Result<(), CliError> {
    let config = load_config();
    let catalog = open_catalog(&config)?;

    let architecture: Architecture = args
        .arch
        .parse()
        .map_err(CliError::Config)?;

    if catalog.get_distribution(&args.name).is_some() {
        return Err(CliError::Config(format!(
            "distribution '{}' already exists; remove it first to replace it",
            args.name
        )));
    }

    let mut record = DistributionRecord::new(
        args.name.clone(),
        args.display_name.unwrap_or_else(|| args.name.clone()),
        architecture,
    )
    .with_source_url(args.url);

    if let Some(version) = args.version {
        record = record.with_version(version);
    }
    if let Some(checksum) = args.checksum {
        record = record.with_checksum(checksum);
    }
    if let Some(description) = args.description {
        record = record.with_description(description);
    }

    catalog.update_distribution(record)?;
    println!("Added {}.", args.name);

    Ok(())
}
