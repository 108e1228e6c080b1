//! CLI commands for managing and acquiring distributions.

mod acquire;
mod add;
mod info;
mod list;
mod remove;

pub use acquire::{run_acquire, AcquireArgs};
pub use add::{run_add, AddArgs};
pub use info::run_info;
pub use list::run_list;
pub use remove::run_remove;

use std::path::PathBuf;
use std::sync::Arc;

use rootstock::catalog::JsonCatalog;
use rootstock::config::{config_directory, ConfigFile};

use crate::error::CliError;

/// Load the user config file, falling back to defaults.
pub fn load_config() -> ConfigFile {
    ConfigFile::load().unwrap_or_default()
}

/// Data directory for the catalog index and artifacts (`~/.rootstock`).
fn data_directory() -> PathBuf {
    config_directory()
}

/// Catalog index path, honoring the config file override.
pub fn catalog_path(config: &ConfigFile) -> PathBuf {
    config
        .catalog_path
        .clone()
        .unwrap_or_else(|| data_directory().join("catalog.json"))
}

/// Artifacts directory, honoring the config file override.
pub fn artifacts_dir(config: &ConfigFile) -> PathBuf {
    config
        .artifacts_dir
        .clone()
        .unwrap_or_else(|| data_directory().join("store"))
}

/// Staging directory, honoring the config file override.
pub fn staging_dir(config: &ConfigFile) -> PathBuf {
    config
        .staging_dir
        .clone()
        .unwrap_or_else(|| std::env::temp_dir().join("rootstock-staging"))
}

/// Open the catalog the commands operate on.
pub fn open_catalog(config: &ConfigFile) -> Result<Arc<JsonCatalog>, CliError> {
    let catalog = JsonCatalog::open(catalog_path(config), artifacts_dir(config))?;
    Ok(Arc::new(catalog))
}

/// Format a byte count for humans.
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} {}", bytes, UNITS[unit])
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KiB");
        assert_eq!(format_bytes(50 * 1024 * 1024), "50.0 MiB");
        assert_eq!(format_bytes(3 * 1024 * 1024 * 1024), "3.0 GiB");
    }

    #[test]
    fn test_catalog_path_override() {
        let config = ConfigFile {
            catalog_path: Some(PathBuf::from("/custom/catalog.json")),
            ..Default::default()
        };
        assert_eq!(catalog_path(&config), PathBuf::from("/custom/catalog.json"));
    }

    #[test]
    fn test_staging_dir_default() {
        let config = ConfigFile::default();
        assert!(staging_dir(&config).ends_with("rootstock-staging"));
    }

    #[test]
    fn test_open_catalog_with_custom_paths() {
        use rootstock::catalog::Catalog;

        let temp = tempfile::TempDir::new().unwrap();
        let config = ConfigFile {
            catalog_path: Some(temp.path().join("catalog.json")),
            artifacts_dir: Some(temp.path().join("store")),
            ..Default::default()
        };

        let catalog = open_catalog(&config).unwrap();
        assert_eq!(
            catalog.canonical_path("alpine-3.19"),
            temp.path().join("store").join("alpine-3.19.rootfs.tar")
        );
    }
}
