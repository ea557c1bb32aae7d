//! Output workspace reset.
//!
//! Every run starts from an empty output directory and absent log
//! artefacts. The reset is unconditional destroy-then-recreate; nothing from
//! a previous run is merged.

use crate::error::{ExtractorError, Result};
use camino::Utf8Path;
use log::debug;
use std::io;

/// Deletes `output_dir` and every path in `artefacts`, then recreates
/// `output_dir` empty.
///
/// Targets that do not exist are skipped. A plain file sitting where the
/// output directory should be is removed too.
///
/// # Errors
///
/// Returns [`ExtractorError::WorkspaceReset`] when a target exists but
/// cannot be removed, or when the output directory cannot be created.
///
/// # Examples
///
/// ```
/// use apk_deep_extractor::workspace::reset_workspace;
/// use camino::Utf8PathBuf;
///
/// let temp = tempfile::tempdir()?;
/// let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 temp dir");
/// let out = root.join("out");
/// let log = root.join("log.txt");
/// std::fs::create_dir_all(out.join("stale"))?;
/// std::fs::write(&log, "old run")?;
///
/// reset_workspace(&out, &[log.as_path()])?;
///
/// assert!(out.is_dir());
/// assert_eq!(std::fs::read_dir(&out)?.count(), 0);
/// assert!(!log.exists());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub fn reset_workspace(output_dir: &Utf8Path, artefacts: &[&Utf8Path]) -> Result<()> {
    remove_if_present(output_dir)?;
    for artefact in artefacts {
        remove_if_present(artefact)?;
    }

    std::fs::create_dir_all(output_dir).map_err(|source| ExtractorError::WorkspaceReset {
        path: output_dir.to_owned(),
        source,
    })?;
    debug!("workspace reset at {output_dir}");
    Ok(())
}

/// Removes a file or directory tree, treating absence as success.
fn remove_if_present(path: &Utf8Path) -> Result<()> {
    let removal = match std::fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => std::fs::remove_dir_all(path),
        Ok(_) => std::fs::remove_file(path),
        Err(err) => Err(err),
    };

    match removal {
        Ok(()) => {
            debug!("removed {path}");
            Ok(())
        }
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(source) => Err(ExtractorError::WorkspaceReset {
            path: path.to_owned(),
            source,
        }),
    }
}
