#![allow(clippy::unwrap_used, clippy::expect_used)]
//! Common helpers for integration tests.
//!
//! Tests run the real loader and resolver against descriptors written to
//! temporary plugin trees, or against the bundled fixture tree.

#![allow(dead_code)]

use std::path::{Path, PathBuf};

use modgraph::loader::{LoadOptions, LoadOutcome, ManifestSet, ManifestSetBuilder, load};
use modgraph::manifest::Manifest;

/// Plugins tree holding the project's real descriptors.
pub fn fixtures_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/Plugins")
}

/// Load `root` to completion, panicking on I/O failure or cancellation.
pub async fn load_set(root: &Path) -> ManifestSet {
    match load(root, &LoadOptions::default()).await.unwrap() {
        LoadOutcome::Complete(set) => set,
        LoadOutcome::Cancelled => panic!("load of {} was cancelled", root.display()),
    }
}

/// Assemble a set from in-memory manifests, one plugin per module.
pub fn set_of(manifests: Vec<Manifest>) -> ManifestSet {
    let mut builder = ManifestSetBuilder::new("/plugins");
    for manifest in manifests {
        let path = format!("/plugins/{0}/Source/{0}/{0}.Build.cs", manifest.name);
        builder.insert(manifest.name.clone(), path, manifest);
    }
    builder.build()
}
