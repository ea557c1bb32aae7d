//! Asset keyword scanning.
//!
//! Every file under `raw_zip/assets` is decoded as text, the decoded text is
//! persisted next to it as `<name>.txt`, and every configured keyword found
//! in it is recorded.

use crate::text::{Keywords, decode_text};
use log::{debug, trace};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Suffix appended to an asset's file name for its decoded copy.
pub const DECODED_SUFFIX: &str = ".txt";

/// Result of scanning one asset file.
#[derive(Debug)]
pub enum AssetOutcome {
    /// The asset decoded; its text was written to `decoded_path` when that
    /// path was free.
    Decoded {
        /// File name of the asset.
        file_name: String,
        /// Full path of the asset.
        path: PathBuf,
        /// Path of the written `.txt` sibling; `None` when an archive member
        /// already occupies it and the copy was skipped.
        decoded_path: Option<PathBuf>,
        /// Every keyword found, in keyword-list order.
        matches: Vec<String>,
    },
    /// Neither UTF-8 nor UTF-16 accepted the bytes.
    Undecodable {
        /// File name of the asset.
        file_name: String,
        /// Full path of the asset.
        path: PathBuf,
    },
    /// Reading the asset or writing its decoded copy failed.
    Failed {
        /// File name of the asset.
        file_name: String,
        /// Full path of the asset.
        path: PathBuf,
        /// The underlying I/O error.
        error: io::Error,
    },
}

/// Result of the asset step.
#[derive(Debug)]
pub enum AssetScan {
    /// There is no assets directory.
    Missing,
    /// Per-file outcomes in walk order.
    Scanned(Vec<AssetOutcome>),
}

/// Scans every file under `assets_dir` for `keywords`.
///
/// The file list is gathered before any decoded copy is written, so copies
/// produced by this call are never scanned by it. A decoded copy is never
/// written over another file from that list.
pub fn scan_assets(assets_dir: &Path, keywords: &Keywords) -> AssetScan {
    if !assets_dir.is_dir() {
        return AssetScan::Missing;
    }

    let files = asset_files(assets_dir);
    debug!("scanning {} asset files", files.len());
    let members: BTreeSet<PathBuf> = files.iter().cloned().collect();
    AssetScan::Scanned(
        files
            .into_iter()
            .map(|path| scan_asset(path, keywords, &members))
            .collect(),
    )
}

fn asset_files(assets_dir: &Path) -> Vec<PathBuf> {
    WalkDir::new(assets_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(err) => {
                debug!("skipping unreadable asset entry: {err}");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(walkdir::DirEntry::into_path)
        .collect()
}

fn scan_asset(path: PathBuf, keywords: &Keywords, members: &BTreeSet<PathBuf>) -> AssetOutcome {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();

    let bytes = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(error) => {
            return AssetOutcome::Failed {
                file_name,
                path,
                error,
            };
        }
    };

    let Some(text) = decode_text(&bytes) else {
        trace!("undecodable asset {}", path.display());
        return AssetOutcome::Undecodable { file_name, path };
    };

    let sibling = decoded_sibling(&path);
    let decoded_path = if members.contains(&sibling) {
        debug!(
            "not writing decoded copy over archive member {}",
            sibling.display()
        );
        None
    } else {
        if let Err(error) = std::fs::write(&sibling, &text) {
            return AssetOutcome::Failed {
                file_name,
                path,
                error,
            };
        }
        Some(sibling)
    };

    let matches = keywords
        .all_in(&text)
        .into_iter()
        .map(str::to_owned)
        .collect();

    AssetOutcome::Decoded {
        file_name,
        path,
        decoded_path,
        matches,
    }
}

/// Path of the decoded copy of `path`: the same name with `.txt` appended.
///
/// # Examples
///
/// ```
/// use apk_deep_extractor::assets::decoded_sibling;
/// use std::path::Path;
///
/// assert_eq!(
///     decoded_sibling(Path::new("assets/strings.txt")),
///     Path::new("assets/strings.txt.txt"),
/// );
/// ```
#[must_use]
pub fn decoded_sibling(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(DECODED_SUFFIX);
    PathBuf::from(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use std::fs;
    use tempfile::TempDir;

    #[fixture]
    fn keywords() -> Keywords {
        Keywords::new(
            ["Teleport", "Position", "Damage", "Health", "Speed", "Player"]
                .iter()
                .map(|&kw| kw.to_owned())
                .collect(),
        )
    }

    #[fixture]
    fn assets() -> TempDir {
        TempDir::new().expect("temp dir")
    }

    fn scanned(scan: AssetScan) -> Vec<AssetOutcome> {
        match scan {
            AssetScan::Scanned(outcomes) => outcomes,
            AssetScan::Missing => panic!("assets directory reported missing"),
        }
    }

    #[rstest]
    fn decodes_and_records_every_keyword(assets: TempDir, keywords: Keywords) {
        let path = assets.path().join("strings.txt");
        fs::write(&path, "PlayerDamageValue=50").expect("write asset");

        let outcomes = scanned(scan_assets(assets.path(), &keywords));

        let [AssetOutcome::Decoded {
            file_name,
            decoded_path,
            matches,
            ..
        }] = outcomes.as_slice()
        else {
            panic!("expected one decoded asset, got {outcomes:?}");
        };
        assert_eq!(file_name, "strings.txt");
        assert_eq!(
            decoded_path.as_deref(),
            Some(assets.path().join("strings.txt.txt").as_path())
        );
        assert_eq!(matches, &vec!["Damage".to_owned(), "Player".to_owned()]);
        let copy = fs::read_to_string(assets.path().join("strings.txt.txt"))
            .expect("read decoded copy");
        assert_eq!(copy, "PlayerDamageValue=50");
    }

    #[rstest]
    fn matches_keywords_inside_longer_tokens(assets: TempDir, keywords: Keywords) {
        fs::write(assets.path().join("engine.cfg"), "TeleportationEngine").expect("write asset");

        let outcomes = scanned(scan_assets(assets.path(), &keywords));

        assert!(matches!(
            outcomes.as_slice(),
            [AssetOutcome::Decoded { matches, .. }] if matches == &vec!["Teleport".to_owned()]
        ));
    }

    #[rstest]
    fn falls_back_to_utf16(assets: TempDir, keywords: Keywords) {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "Health=3".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        fs::write(assets.path().join("wide.dat"), bytes).expect("write asset");

        let outcomes = scanned(scan_assets(assets.path(), &keywords));

        let [AssetOutcome::Decoded { matches, .. }] = outcomes.as_slice() else {
            panic!("expected decoded asset, got {outcomes:?}");
        };
        assert_eq!(matches, &vec!["Health".to_owned()]);
        assert_eq!(
            fs::read_to_string(assets.path().join("wide.dat.txt")).expect("read decoded copy"),
            "Health=3"
        );
    }

    #[rstest]
    fn decoded_copy_never_replaces_an_archive_member(assets: TempDir, keywords: Keywords) {
        fs::write(assets.path().join("strings"), "Speed").expect("write asset");
        fs::write(assets.path().join("strings.txt"), "Health").expect("write asset");

        let outcomes = scanned(scan_assets(assets.path(), &keywords));

        let [
            AssetOutcome::Decoded {
                file_name: first_name,
                decoded_path: first_copy,
                matches: first_matches,
                ..
            },
            AssetOutcome::Decoded {
                file_name: second_name,
                matches: second_matches,
                ..
            },
        ] = outcomes.as_slice()
        else {
            panic!("expected two decoded assets, got {outcomes:?}");
        };
        assert_eq!(first_name, "strings");
        assert!(first_copy.is_none());
        assert_eq!(first_matches, &vec!["Speed".to_owned()]);
        assert_eq!(second_name, "strings.txt");
        assert_eq!(second_matches, &vec!["Health".to_owned()]);
        assert_eq!(
            fs::read_to_string(assets.path().join("strings.txt")).expect("read member"),
            "Health"
        );
    }

    #[rstest]
    fn unwritable_copy_is_reported_and_scan_continues(assets: TempDir, keywords: Keywords) {
        fs::write(assets.path().join("a.cfg"), "Damage").expect("write asset");
        fs::create_dir(assets.path().join("a.cfg.txt")).expect("create blocking dir");
        fs::write(assets.path().join("b.cfg"), "Speed").expect("write asset");

        let outcomes = scanned(scan_assets(assets.path(), &keywords));

        assert!(matches!(
            outcomes.as_slice(),
            [
                AssetOutcome::Failed { file_name: failed, .. },
                AssetOutcome::Decoded { file_name: decoded, .. },
            ] if failed == "a.cfg" && decoded == "b.cfg"
        ));
    }

    #[rstest]
    fn undecodable_assets_are_skipped_without_copy(assets: TempDir, keywords: Keywords) {
        let path = assets.path().join("blob.bin");
        fs::write(&path, [0xC3, 0x28, 0x00]).expect("write asset");

        let outcomes = scanned(scan_assets(assets.path(), &keywords));

        assert!(matches!(
            outcomes.as_slice(),
            [AssetOutcome::Undecodable { file_name, .. }] if file_name == "blob.bin"
        ));
        assert!(!decoded_sibling(&path).exists());
    }

    #[rstest]
    fn nested_files_are_scanned_in_name_order(assets: TempDir, keywords: Keywords) {
        fs::create_dir_all(assets.path().join("data")).expect("create subdir");
        fs::write(assets.path().join("data/b.json"), "{\"Speed\": 2}").expect("write asset");
        fs::write(assets.path().join("a.txt"), "nothing here").expect("write asset");

        let outcomes = scanned(scan_assets(assets.path(), &keywords));

        let names: Vec<&str> = outcomes
            .iter()
            .map(|outcome| match outcome {
                AssetOutcome::Decoded { file_name, .. }
                | AssetOutcome::Undecodable { file_name, .. }
                | AssetOutcome::Failed { file_name, .. } => file_name.as_str(),
            })
            .collect();
        assert_eq!(names, vec!["a.txt", "b.json"]);
    }

    #[rstest]
    fn rescanning_picks_up_previous_copies(assets: TempDir, keywords: Keywords) {
        fs::write(assets.path().join("strings.txt"), "Player").expect("write asset");

        let first = scanned(scan_assets(assets.path(), &keywords));
        let second = scanned(scan_assets(assets.path(), &keywords));

        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 2);
    }

    #[rstest]
    fn missing_directory_is_reported(keywords: Keywords) {
        let scan = scan_assets(Path::new("/nonexistent/assets"), &keywords);
        assert!(matches!(scan, AssetScan::Missing));
    }

    #[cfg(unix)]
    #[rstest]
    fn symlinks_are_not_followed(assets: TempDir, keywords: Keywords) {
        use std::os::unix::fs::symlink;

        symlink(assets.path().join("gone"), assets.path().join("dangling.txt"))
            .expect("create symlink");
        fs::write(assets.path().join("ok.txt"), "Position").expect("write asset");

        let outcomes = scanned(scan_assets(assets.path(), &keywords));

        assert!(matches!(
            outcomes.as_slice(),
            [AssetOutcome::Decoded { file_name, .. }] if file_name == "ok.txt"
        ));
    }
}
