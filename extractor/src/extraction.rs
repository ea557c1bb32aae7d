//! Raw archive extraction.
//!
//! An APK is a zip container. Every member is copied verbatim under the
//! `raw_zip` directory so native libraries and assets can be inspected in
//! their original form, independently of what the decompiler produces.
//! Entry paths are validated before anything is written, since the archive
//! is untrusted input.

use crate::error::{ExtractorError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::trace;
use sha2::{Digest, Sha256};
use std::collections::BTreeSet;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Component, Path, PathBuf};
use zip::ZipArchive;

/// Number of entries between progress lines.
pub const PROGRESS_INTERVAL: usize = 500;

/// What an extraction produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExtractionSummary {
    /// Number of archive entries visited (files and directories).
    pub entries: usize,
    /// Number of regular files written.
    pub files: usize,
    /// First path component of every entry, sorted.
    pub top_level: BTreeSet<String>,
}

/// Extracts every entry of `archive` into `dest`, preserving member paths.
///
/// `progress` receives a line every [`PROGRESS_INTERVAL`] entries and one at
/// the end; pass `None` to stay silent.
///
/// # Errors
///
/// Returns [`ExtractorError::Archive`] when the archive cannot be opened or
/// an entry cannot be read, [`ExtractorError::PathTraversal`] when an entry
/// would land outside `dest`, and [`ExtractorError::ExtractWrite`] when a
/// directory or file under `dest` cannot be created.
pub fn extract_archive(
    archive: &Utf8Path,
    dest: &Utf8Path,
    mut progress: Option<&mut dyn Write>,
) -> Result<ExtractionSummary> {
    let zip_error = |source: zip::result::ZipError| ExtractorError::Archive {
        path: archive.to_owned(),
        source,
    };

    let file = File::open(archive).map_err(|err| zip_error(err.into()))?;
    let mut zip = ZipArchive::new(file).map_err(zip_error)?;
    let total = zip.len();
    let mut summary = ExtractionSummary::default();

    create_dir(dest)?;

    for index in 0..total {
        let mut entry = zip.by_index(index).map_err(zip_error)?;
        let relative = validated_entry_path(entry.name(), entry.enclosed_name())?;
        let target = dest.join(&relative);

        if let Some(first) = relative.components().next() {
            summary.top_level.insert(first.as_str().to_owned());
        }

        if entry.is_dir() {
            create_dir(&target)?;
        } else {
            if let Some(parent) = target.parent() {
                create_dir(parent)?;
            }
            let mut contents = Vec::new();
            entry
                .read_to_end(&mut contents)
                .map_err(|err| zip_error(err.into()))?;
            std::fs::write(&target, contents).map_err(|source| ExtractorError::ExtractWrite {
                path: target.clone(),
                source,
            })?;
            summary.files += 1;
            trace!("extracted {relative}");
        }

        summary.entries += 1;
        if summary.entries % PROGRESS_INTERVAL == 0 {
            if let Some(sink) = progress.as_deref_mut() {
                report(sink, summary.entries, total);
            }
        }
    }

    if let Some(sink) = progress.as_deref_mut() {
        report(sink, summary.entries, total);
    }

    Ok(summary)
}

fn create_dir(path: &Utf8Path) -> Result<()> {
    std::fs::create_dir_all(path).map_err(|source| ExtractorError::ExtractWrite {
        path: path.to_owned(),
        source,
    })
}

fn report(sink: &mut dyn Write, done: usize, total: usize) {
    if writeln!(sink, "  extracted {done}/{total} entries").is_err() {
        trace!("progress sink closed");
    }
}

/// Validates an entry name against zip-slip attacks and normalises it.
///
/// `enclosed` is the sanitised path reported by the zip reader; `None`
/// means the reader already judged the name unsafe. `..` components that
/// stay inside the destination are folded away; one that climbs above it,
/// or a name that resolves to the destination itself, is rejected.
fn validated_entry_path(name: &str, enclosed: Option<PathBuf>) -> Result<Utf8PathBuf> {
    let traversal = || ExtractorError::PathTraversal {
        entry: name.to_owned(),
    };
    let path = enclosed.ok_or_else(traversal)?;
    let mut normalised = Utf8PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => normalised.push(part.to_str().ok_or_else(traversal)?),
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalised.pop() {
                    return Err(traversal());
                }
            }
            Component::RootDir | Component::Prefix(_) => return Err(traversal()),
        }
    }
    if normalised.as_str().is_empty() {
        return Err(traversal());
    }
    Ok(normalised)
}

/// Computes the lowercase hex SHA-256 digest of a file.
///
/// # Errors
///
/// Returns an I/O error if the file cannot be read.
pub fn sha256_file(path: &Path) -> io::Result<String> {
    let mut file = File::open(path)?;
    let mut hasher = Sha256::new();
    io::copy(&mut file, &mut hasher)?;
    Ok(hasher
        .finalize()
        .iter()
        .map(|byte| format!("{byte:02x}"))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ApkBuilder;
    use camino::Utf8PathBuf;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    struct Scratch {
        _temp: TempDir,
        root: Utf8PathBuf,
    }

    #[fixture]
    fn scratch() -> Scratch {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("non-UTF8 temp path");
        Scratch { _temp: temp, root }
    }

    #[rstest]
    fn extracts_every_entry_preserving_paths(scratch: Scratch) {
        let apk = scratch.root.join("game.apk");
        ApkBuilder::new()
            .file("AndroidManifest.xml", b"\x03\x00binary")
            .file("classes.dex", b"dex\n035")
            .file("lib/arm64-v8a/libgame.so", b"\x7fELF")
            .directory("assets/")
            .file("assets/strings.txt", b"PlayerDamageValue=50")
            .write_to(apk.as_std_path())
            .expect("write apk");
        let dest = scratch.root.join("raw_zip");

        let summary = extract_archive(&apk, &dest, None).expect("extract");

        assert_eq!(summary.entries, 5);
        assert_eq!(summary.files, 4);
        for name in ["AndroidManifest.xml", "classes.dex", "lib", "assets"] {
            assert!(summary.top_level.contains(name), "missing {name}");
            assert!(dest.join(name).exists(), "{name} not extracted");
        }
        let contents =
            std::fs::read(dest.join("lib/arm64-v8a/libgame.so")).expect("read extracted lib");
        assert_eq!(contents, b"\x7fELF");
    }

    #[rstest]
    fn reports_progress_when_requested(scratch: Scratch) {
        let apk = scratch.root.join("small.apk");
        ApkBuilder::new()
            .file("a.txt", b"a")
            .write_to(apk.as_std_path())
            .expect("write apk");
        let mut progress: Vec<u8> = Vec::new();

        extract_archive(&apk, &scratch.root.join("out"), Some(&mut progress)).expect("extract");

        let text = String::from_utf8(progress).expect("progress is UTF-8");
        assert_eq!(text, "  extracted 1/1 entries\n");
    }

    #[rstest]
    fn corrupt_archive_is_fatal(scratch: Scratch) {
        let apk = scratch.root.join("broken.apk");
        std::fs::write(&apk, b"this is not a zip file").expect("write junk");

        let err = extract_archive(&apk, &scratch.root.join("out"), None)
            .expect_err("corrupt archive should fail");
        assert!(matches!(err, ExtractorError::Archive { .. }));
    }

    #[rstest]
    fn missing_archive_is_fatal(scratch: Scratch) {
        let err = extract_archive(&scratch.root.join("absent.apk"), &scratch.root, None)
            .expect_err("missing archive should fail");
        assert!(matches!(err, ExtractorError::Archive { .. }));
    }

    #[rstest]
    #[case::parent_dir("../escape.txt")]
    #[case::nested_parent("assets/../../escape.txt")]
    fn rejects_path_traversal(#[case] bad_name: &str) {
        let result = validated_entry_path(bad_name, Some(PathBuf::from(bad_name)));
        assert!(
            matches!(result, Err(ExtractorError::PathTraversal { .. })),
            "expected PathTraversal for {bad_name}"
        );
    }

    #[test]
    fn rejects_entries_the_reader_refused() {
        let result = validated_entry_path("/etc/passwd", None);
        assert!(matches!(result, Err(ExtractorError::PathTraversal { entry }) if entry == "/etc/passwd"));
    }

    #[test]
    fn rejects_names_resolving_to_the_destination() {
        let result = validated_entry_path("assets/..", Some(PathBuf::from("assets/..")));
        assert!(matches!(result, Err(ExtractorError::PathTraversal { .. })));
    }

    #[rstest]
    #[case::plain("lib/x86/libfoo.so", "lib/x86/libfoo.so")]
    #[case::current_dir("./assets/a.txt", "assets/a.txt")]
    #[case::contained_parent("assets/x/../y.txt", "assets/y.txt")]
    fn accepts_and_normalises_contained_paths(#[case] name: &str, #[case] expected: &str) {
        let path = validated_entry_path(name, Some(PathBuf::from(name)))
            .expect("contained path accepted");
        assert_eq!(path, Utf8PathBuf::from(expected));
    }

    #[rstest]
    fn contained_parent_components_are_extracted(scratch: Scratch) {
        let apk = scratch.root.join("dots.apk");
        ApkBuilder::new()
            .file("assets/x/../y.txt", b"Speed")
            .write_to(apk.as_std_path())
            .expect("write apk");
        let dest = scratch.root.join("raw_zip");

        extract_archive(&apk, &dest, None).expect("contained entry extracts");

        let contents = std::fs::read(dest.join("assets/y.txt")).expect("read normalised entry");
        assert_eq!(contents, b"Speed");
    }

    #[rstest]
    fn write_failures_name_the_destination(scratch: Scratch) {
        let apk = scratch.root.join("clash.apk");
        ApkBuilder::new()
            .file("lib", b"a file where a directory belongs")
            .file("lib/arm64-v8a/libgame.so", b"\x7fELF")
            .write_to(apk.as_std_path())
            .expect("write apk");
        let dest = scratch.root.join("raw_zip");

        let err = extract_archive(&apk, &dest, None).expect_err("clashing entry should fail");

        assert!(
            matches!(&err, ExtractorError::ExtractWrite { path, .. } if path.starts_with(dest.join("lib"))),
            "unexpected error: {err:?}"
        );
    }

    #[rstest]
    fn sha256_matches_known_digest(scratch: Scratch) {
        let path = scratch.root.join("abc.bin");
        std::fs::write(&path, b"abc").expect("write file");
        assert_eq!(
            sha256_file(path.as_std_path()).expect("hash"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }
}
