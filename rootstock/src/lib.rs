//! Rootstock - pristine Linux rootfs acquisition for virtualized environments
//!
//! Rootstock downloads vendor-published root-filesystem images, verifies
//! their integrity, and normalizes them into one canonical archive (TAR,
//! optionally gzip-compressed) per distribution, ready for import by a
//! virtualization layer. Vendors ship these images in heterogeneous shapes
//! (bare tars, compressed tars, ZIPs, app-package bundles nesting one
//! package per CPU architecture) and routinely mislabel them, so every
//! routing decision is made from file content, never extensions.
//!
//! The entry point is [`acquire::AcquisitionManager`], driving the pipeline
//! for records looked up in a [`catalog::Catalog`].

pub mod acquire;
pub mod catalog;
pub mod config;
pub mod logging;

pub use acquire::{AcquireError, AcquireOptions, AcquireOutcome, AcquisitionManager};
pub use catalog::{Architecture, Catalog, DistributionRecord, JsonCatalog};
pub use config::AcquireConfig;
