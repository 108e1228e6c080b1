//! Bundle resolution against real extraction tools and real ZIP containers.
//!
//! These tests shell out to the host's unzip/bsdtar and skip (with a note)
//! when neither is installed.

mod support;

use std::fs;
use std::sync::Arc;
use std::time::Duration;

use rootstock::acquire::{
    check_extraction_tools, AcquireOptions, AcquisitionManager, BundleResolver, ContainerExtract,
    ToolExtractor,
};
use rootstock::catalog::{Architecture, Catalog, DistributionRecord, JsonCatalog};
use rootstock::config::AcquireConfig;
use tempfile::TempDir;

use support::{build_zip, gzip_payload, tar_payload, Response, TestServer};

fn tools_missing() -> bool {
    if check_extraction_tools().is_err() {
        eprintln!("skipping: no unzip/bsdtar on this host");
        return true;
    }
    false
}

#[test]
fn extractor_unpacks_a_real_zip() {
    if tools_missing() {
        return;
    }

    let temp = TempDir::new().unwrap();
    let container = temp.path().join("bundle.bin");
    fs::write(
        &container,
        build_zip(&[
            ("readme.txt", b"hello".to_vec()),
            ("data/install.tar.gz", gzip_payload(64)),
        ]),
    )
    .unwrap();

    let out_dir = temp.path().join("out");
    ToolExtractor::new().extract(&container, &out_dir).unwrap();

    assert_eq!(fs::read(out_dir.join("readme.txt")).unwrap(), b"hello");
    assert_eq!(
        fs::read(out_dir.join("data/install.tar.gz")).unwrap(),
        gzip_payload(64)
    );
}

#[test]
fn resolver_unwraps_zip_with_mislabeled_extension() {
    if tools_missing() {
        return;
    }

    // ZIP content served under a .tar name: routing must follow the bytes.
    let temp = TempDir::new().unwrap();
    let staging = temp.path().join("staging");
    fs::create_dir_all(&staging).unwrap();

    let downloaded = temp.path().join("mislabeled.tar");
    fs::write(
        &downloaded,
        build_zip(&[("install.tar.gz", gzip_payload(128))]),
    )
    .unwrap();

    let extractor = ToolExtractor::new();
    let resolver = BundleResolver::new(&extractor, Architecture::X64, &staging);
    let dest = temp.path().join("payload.rootfs.tar");

    let resolved = resolver.resolve_payload(&downloaded, &dest).unwrap();
    assert_eq!(resolved, Some(dest.clone()));
    assert_eq!(fs::read(&dest).unwrap(), gzip_payload(128));

    // All scratch space released.
    assert_eq!(fs::read_dir(&staging).unwrap().count(), 0);
}

#[test]
fn resolver_descends_architecture_bundle() {
    if tools_missing() {
        return;
    }

    let temp = TempDir::new().unwrap();
    let staging = temp.path().join("staging");
    fs::create_dir_all(&staging).unwrap();

    let x64_inner = build_zip(&[("install.tar.gz", tar_payload(b"x64-rootfs"))]);
    let arm_inner = build_zip(&[("install.tar.gz", tar_payload(b"arm-rootfs"))]);
    let outer = build_zip(&[
        ("Distro_1.0_ARM64.appx", arm_inner),
        ("Distro_1.0_x64.appx", x64_inner),
    ]);

    let downloaded = temp.path().join("distro.appxbundle");
    fs::write(&downloaded, outer).unwrap();

    let extractor = ToolExtractor::new();
    let resolver = BundleResolver::new(&extractor, Architecture::X64, &staging);
    let dest = temp.path().join("payload.rootfs.tar");

    let resolved = resolver.resolve_payload(&downloaded, &dest).unwrap();
    assert!(resolved.is_some());
    assert!(fs::read(&dest).unwrap().ends_with(b"x64-rootfs"));
    assert_eq!(fs::read_dir(&staging).unwrap().count(), 0);
}

#[test]
fn end_to_end_acquisition_of_nested_bundle() {
    if tools_missing() {
        return;
    }

    let payload = tar_payload(b"bundle-rootfs-content");
    let inner = build_zip(&[("install.tar.gz", payload.clone())]);
    let bundle = build_zip(&[("Distro_2.0_x64.appx", inner)]);

    let served = bundle.clone();
    let server = TestServer::start(move |_req| Response::ok(served.clone()));

    let temp = TempDir::new().unwrap();
    let catalog = Arc::new(
        JsonCatalog::open(temp.path().join("catalog.json"), temp.path().join("store")).unwrap(),
    );
    catalog
        .update_distribution(
            DistributionRecord::new("bundled", "Bundled Distro", Architecture::X64)
                .with_source_url(server.url("/bundled.zip")),
        )
        .unwrap();

    let config = AcquireConfig::new(temp.path().join("staging"))
        .with_timeout(Duration::from_secs(30));
    let manager = AcquisitionManager::new(Arc::clone(&catalog), config);

    let outcome = manager.acquire("bundled", AcquireOptions::default()).unwrap();

    // The canonical artifact is the inner payload, not the bundle.
    assert_eq!(fs::read(&outcome.artifact_path).unwrap(), payload);
    assert_eq!(outcome.size_bytes, payload.len() as u64);

    let record = catalog.get_distribution("bundled").unwrap();
    assert!(record.is_acquired());

    // Scratch and temp state is gone.
    let staging = temp.path().join("staging");
    assert_eq!(fs::read_dir(&staging).unwrap().count(), 0);
}
