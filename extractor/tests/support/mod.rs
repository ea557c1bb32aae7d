//! Test support utilities for extractor integration tests.
//!
//! Provides an isolated scratch directory with a configuration rooted in it,
//! so runs never touch the working directory of the test process.

use apk_deep_extractor::config::ExtractorConfig;
use camino::Utf8PathBuf;
use tempfile::TempDir;

/// A temporary directory holding the archive, workspace and log files.
pub struct Scratch {
    _temp: TempDir,
    /// Root of the scratch directory.
    pub root: Utf8PathBuf,
    /// Configuration with every path inside `root`.
    pub config: ExtractorConfig,
}

impl Scratch {
    /// Creates an empty scratch directory.
    pub fn new() -> Self {
        let temp = TempDir::new().expect("failed to create temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_owned()).expect("non-UTF8 temp path");
        let config = ExtractorConfig {
            archive: root.join("game.apk"),
            output_dir: root.join("apk_full_extracted"),
            log_file: root.join("apk_analysis_log.txt"),
            offsets_file: Some(root.join("apk_offsets.txt")),
            ..ExtractorConfig::default()
        };
        Self {
            _temp: temp,
            root,
            config,
        }
    }

    /// Full text of the findings log.
    pub fn log_text(&self) -> String {
        std::fs::read_to_string(&self.config.log_file).expect("read findings log")
    }

    /// Findings log lines without the timestamped banners.
    pub fn findings(&self) -> Vec<String> {
        self.log_text()
            .lines()
            .filter(|line| !line.starts_with("=== "))
            .map(str::to_owned)
            .collect()
    }
}
