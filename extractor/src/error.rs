//! Error types for the APK deep extractor.
//!
//! Every variant here is fatal: it aborts the run and leaves the partially
//! written workspace in place for inspection. Per-item problems (a library
//! that fails to parse, an unreadable asset) are not errors at this level;
//! they travel as outcome values and end up in the findings log.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that abort an extraction run.
#[derive(Debug, Error)]
pub enum ExtractorError {
    /// The configuration file or the merged configuration is unusable.
    #[error("invalid configuration {path}: {reason}")]
    InvalidConfig {
        /// Source of the configuration (file path or `command line`).
        path: String,
        /// Description of the problem.
        reason: String,
    },

    /// The output directory or a log artefact could not be reset.
    #[error("failed to reset {path}")]
    WorkspaceReset {
        /// Path that could not be removed or created.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The external decompiler could not be launched at all.
    #[error("decompiler {tool} could not be started")]
    DecompilerUnavailable {
        /// Configured decompiler path.
        tool: Utf8PathBuf,
        /// The underlying spawn error.
        #[source]
        source: std::io::Error,
    },

    /// The external decompiler exited with a non-zero status.
    #[error("decompiler exited with {status}: {stderr}")]
    DecompilationFailed {
        /// Exit status description (code or signal).
        status: String,
        /// Trimmed standard error output of the tool.
        stderr: String,
    },

    /// The archive could not be opened or one of its entries could not be
    /// read.
    #[error("failed to read archive {path}")]
    Archive {
        /// Path to the archive.
        path: Utf8PathBuf,
        /// The underlying zip error.
        #[source]
        source: zip::result::ZipError,
    },

    /// An archive entry attempts to escape the extraction directory.
    #[error("path traversal detected in archive entry: {entry}")]
    PathTraversal {
        /// Raw name of the offending entry.
        entry: String,
    },

    /// An archive member could not be written under the extraction
    /// directory.
    #[error("failed to write extracted file {path}")]
    ExtractWrite {
        /// Destination path that could not be created.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Writing to the findings log or offsets file failed.
    #[error("failed to write {path}")]
    LogWrite {
        /// Path of the artefact being written.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias using [`ExtractorError`].
pub type Result<T> = std::result::Result<T, ExtractorError>;

/// Render an error followed by its `source()` chain, one cause per line.
///
/// # Examples
///
/// ```
/// use apk_deep_extractor::error::{ExtractorError, error_chain};
///
/// let err = ExtractorError::LogWrite {
///     path: "log.txt".into(),
///     source: std::io::Error::other("disk full"),
/// };
/// let text = error_chain(&err);
/// assert!(text.contains("log.txt"));
/// assert!(text.contains("disk full"));
/// ```
#[must_use]
pub fn error_chain(err: &dyn std::error::Error) -> String {
    let mut text = err.to_string();
    let mut cause = err.source();
    while let Some(inner) = cause {
        text.push_str("\n  caused by: ");
        text.push_str(&inner.to_string());
        cause = inner.source();
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decompilation_failed_includes_status_and_stderr() {
        let err = ExtractorError::DecompilationFailed {
            status: "exit status: 1".to_owned(),
            stderr: "brut.androlib.AndrolibException".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("exit status: 1"));
        assert!(msg.contains("AndrolibException"));
    }

    #[test]
    fn decompiler_unavailable_preserves_source() {
        let err = ExtractorError::DecompilerUnavailable {
            tool: Utf8PathBuf::from("/opt/apktool"),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.to_string().contains("/opt/apktool"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn path_traversal_names_entry() {
        let err = ExtractorError::PathTraversal {
            entry: "../evil.so".to_owned(),
        };
        assert!(err.to_string().contains("../evil.so"));
    }

    #[test]
    fn error_chain_lists_every_cause() {
        let err = ExtractorError::WorkspaceReset {
            path: Utf8PathBuf::from("out"),
            source: std::io::Error::other("permission denied"),
        };
        let chain = error_chain(&err);
        assert_eq!(
            chain,
            "failed to reset out\n  caused by: permission denied"
        );
    }
}
