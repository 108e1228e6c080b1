//! Acquire command: download, verify, and normalize one distribution.

use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use rootstock::acquire::{AcquireOptions, AcquisitionManager};
use rootstock::catalog::Catalog;
use rootstock::config::AcquireConfig;
use tracing::debug;

use super::{format_bytes, load_config, open_catalog, staging_dir};
use crate::error::CliError;

/// Arguments for the acquire command.
#[derive(Debug, Args)]
pub struct AcquireArgs {
    /// Distribution name (see 'rootstock list')
    pub name: String,

    /// Expected SHA-256 digest, overriding the catalog record
    #[arg(long)]
    pub checksum: Option<String>,

    /// HTTP timeout in seconds
    #[arg(long)]
    pub timeout_secs: Option<u64>,

    /// Skip checksum verification entirely
    #[arg(long)]
    pub no_verify: bool,
}

/// Run the acquire command.
pub fn run_acquire(args: AcquireArgs) -> Result<(), CliError> {
    let config = load_config();
    let catalog = open_catalog(&config)?;

    if catalog.get_distribution(&args.name).is_none() {
        return Err(CliError::UnknownDistribution(args.name.clone()));
    }

    let timeout = args
        .timeout_secs
        .or(config.timeout_secs)
        .unwrap_or(300);
    debug!(name = %args.name, timeout_secs = timeout, "starting acquire command");
    let acquire_config = AcquireConfig::new(staging_dir(&config))
        .with_timeout(Duration::from_secs(timeout))
        .with_verify_checksums(!args.no_verify);

    let manager = Arc::new(AcquisitionManager::new(Arc::clone(&catalog), acquire_config));

    // Ctrl-C cancels the in-flight acquisition instead of killing the
    // process mid-write.
    let ctrlc_manager = Arc::clone(&manager);
    let ctrlc_name = args.name.clone();
    ctrlc::set_handler(move || {
        eprintln!();
        eprintln!("Cancelling acquisition of {}...", ctrlc_name);
        ctrlc_manager.cancel_acquisition(&ctrlc_name);
    })
    .ok();

    println!("Acquiring {}...", style(&args.name).bold());

    let bar = ProgressBar::new(0);
    bar.set_style(
        ProgressStyle::with_template(
            "{msg:>18} [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})",
        )
        .expect("valid progress template")
        .progress_chars("=>-"),
    );

    let stage_bar = bar.clone();
    let download_bar = bar.clone();

    let mut options = AcquireOptions::default()
        .with_stage_callback(Box::new(move |stage, _progress, _message| {
            stage_bar.set_message(stage.name().to_string());
        }))
        .with_download_callback(Box::new(move |downloaded, total, _percent| {
            if total > 0 {
                download_bar.set_length(total);
            }
            download_bar.set_position(downloaded);
        }));
    if let Some(digest) = args.checksum.clone() {
        options = options.with_expected_checksum(digest);
    }

    let outcome = manager.acquire(&args.name, options).map_err(|e| {
        bar.abandon();
        CliError::from(e)
    })?;

    bar.finish_and_clear();

    if outcome.skipped {
        println!(
            "{} already acquired and verified ({})",
            style(&outcome.name).bold(),
            format_bytes(outcome.size_bytes)
        );
    } else {
        println!(
            "{} acquired: {} ({})",
            style(&outcome.name).bold(),
            outcome.artifact_path.display(),
            format_bytes(outcome.size_bytes)
        );
    }

    Ok(())
}
