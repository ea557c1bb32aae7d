//! Manifest presence check.

use camino::{Utf8Path, Utf8PathBuf};

/// Whether the decompiled manifest exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestStatus {
    /// The manifest was found at the given path.
    Found(Utf8PathBuf),
    /// No manifest at the expected path.
    Missing,
}

impl ManifestStatus {
    /// Returns `true` when the manifest exists.
    #[must_use]
    pub const fn is_found(&self) -> bool {
        matches!(self, Self::Found(_))
    }
}

/// Checks for a manifest file at `manifest_path`. Absence is a finding, not
/// an error.
#[must_use]
pub fn check_manifest(manifest_path: &Utf8Path) -> ManifestStatus {
    if manifest_path.is_file() {
        ManifestStatus::Found(manifest_path.to_owned())
    } else {
        ManifestStatus::Missing
    }
}
