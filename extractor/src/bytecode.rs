//! Smali keyword scanning.
//!
//! apktool writes disassembled classes under `smali/`, plus one
//! `smali_classesN/` directory per extra dex file in multidex archives.
//! Each `.smali` file contributes at most one match: the first keyword, in
//! list order, that it contains.

use crate::text::Keywords;
use log::debug;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Primary smali directory name.
pub const SMALI_DIR: &str = "smali";

/// Prefix of the additional multidex smali directories.
pub const MULTIDEX_PREFIX: &str = "smali_classes";

const SMALI_EXTENSION: &str = "smali";

/// One smali file that contains a keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmaliMatch {
    /// Path of the smali file.
    pub path: PathBuf,
    /// First keyword found in it.
    pub keyword: String,
}

/// Result of the smali step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BytecodeScan {
    /// No smali directory exists.
    Missing,
    /// Matching files, in walk order.
    Scanned {
        /// Number of smali files inspected.
        files: usize,
        /// Files with a keyword.
        matches: Vec<SmaliMatch>,
    },
}

/// Scans the smali trees under `output_dir` for `keywords`.
///
/// Unreadable files are skipped silently.
pub fn scan_bytecode(output_dir: &Path, keywords: &Keywords) -> BytecodeScan {
    let roots = smali_roots(output_dir);
    if roots.is_empty() {
        return BytecodeScan::Missing;
    }

    let mut files = 0;
    let mut matches = Vec::new();
    for path in roots.iter().flat_map(|root| smali_files(root)) {
        files += 1;
        let bytes = match std::fs::read(&path) {
            Ok(bytes) => bytes,
            Err(err) => {
                debug!("skipping unreadable smali file {}: {err}", path.display());
                continue;
            }
        };
        let text = String::from_utf8_lossy(&bytes);
        if let Some(keyword) = keywords.first_in(&text) {
            matches.push(SmaliMatch {
                path,
                keyword: keyword.to_owned(),
            });
        }
    }

    BytecodeScan::Scanned { files, matches }
}

/// Existing smali directories under `output_dir`, `smali` first and the
/// multidex directories after it in name order.
fn smali_roots(output_dir: &Path) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    let primary = output_dir.join(SMALI_DIR);
    if primary.is_dir() {
        roots.push(primary);
    }

    let mut extra: Vec<PathBuf> = std::fs::read_dir(output_dir)
        .into_iter()
        .flatten()
        .filter_map(Result::ok)
        .filter(|entry| {
            entry
                .file_name()
                .to_string_lossy()
                .starts_with(MULTIDEX_PREFIX)
        })
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    extra.sort();
    roots.extend(extra);
    roots
}

fn smali_files(root: &Path) -> impl Iterator<Item = PathBuf> {
    WalkDir::new(root)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .filter(|entry| {
            entry
                .path()
                .extension()
                .is_some_and(|ext| ext == SMALI_EXTENSION)
        })
        .map(walkdir::DirEntry::into_path)
}
