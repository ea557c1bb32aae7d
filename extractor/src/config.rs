//! Run configuration for the extractor.
//!
//! `ExtractorConfig` carries every parameter of a run: the archive to
//! analyse, where to unpack it, which decompiler to call, where findings go,
//! and the keywords to search for. Values are layered: built-in defaults,
//! then an optional TOML file, then command-line overrides.

use crate::error::{ExtractorError, Result};
use crate::text::Keywords;
use camino::{Utf8Path, Utf8PathBuf};
use serde::Deserialize;

/// Keywords searched for when none are configured.
pub const DEFAULT_KEYWORDS: &[&str] = &[
    "Teleport", "Position", "Damage", "Health", "Speed", "Player",
];

/// Name of the raw zip subdirectory inside the output directory.
pub const RAW_ZIP_DIR: &str = "raw_zip";

/// Name of the manifest file apktool writes at the output root.
pub const MANIFEST_FILE: &str = "AndroidManifest.xml";

/// Complete configuration for one extraction run.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ExtractorConfig {
    /// Path to the APK under analysis.
    pub archive: Utf8PathBuf,
    /// Workspace directory; destroyed and recreated at run start.
    pub output_dir: Utf8PathBuf,
    /// Path or name of the apktool executable.
    pub decompiler: Utf8PathBuf,
    /// Findings log, cleared at run start.
    pub log_file: Utf8PathBuf,
    /// Native-library offsets file. `None` disables it.
    pub offsets_file: Option<Utf8PathBuf>,
    /// Keywords searched for in assets and smali sources.
    pub keywords: Vec<String>,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            archive: Utf8PathBuf::from("app.apk"),
            output_dir: Utf8PathBuf::from("apk_full_extracted"),
            decompiler: Utf8PathBuf::from("apktool"),
            log_file: Utf8PathBuf::from("apk_analysis_log.txt"),
            offsets_file: Some(Utf8PathBuf::from("apk_offsets.txt")),
            keywords: DEFAULT_KEYWORDS.iter().map(|&kw| kw.to_owned()).collect(),
        }
    }
}

impl ExtractorConfig {
    /// Parses a configuration from TOML text.
    ///
    /// Fields absent from the document keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::InvalidConfig`] when the text is not valid
    /// TOML, names an unknown field, or yields an empty keyword list.
    ///
    /// # Examples
    ///
    /// ```
    /// use apk_deep_extractor::config::ExtractorConfig;
    ///
    /// let config = ExtractorConfig::from_toml_str(
    ///     "archive = \"game.apk\"\nkeywords = [\"Gold\"]\n",
    ///     "inline",
    /// )?;
    /// assert_eq!(config.archive, "game.apk");
    /// assert_eq!(config.keywords, vec!["Gold".to_owned()]);
    /// assert_eq!(config.decompiler, "apktool");
    /// # Ok::<(), apk_deep_extractor::error::ExtractorError>(())
    /// ```
    pub fn from_toml_str(text: &str, origin: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|err| ExtractorError::InvalidConfig {
            path: origin.to_owned(),
            reason: err.to_string(),
        })?;
        config.validate(origin)?;
        Ok(config)
    }

    /// Loads a configuration file.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::InvalidConfig`] when the file cannot be read
    /// or parsed.
    pub fn load(path: &Utf8Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|err| ExtractorError::InvalidConfig {
            path: path.to_string(),
            reason: err.to_string(),
        })?;
        Self::from_toml_str(&text, path.as_str())
    }

    /// Checks invariants that deserialisation alone cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::InvalidConfig`] when the keyword list is
    /// empty or contains an empty keyword.
    pub fn validate(&self, origin: &str) -> Result<()> {
        if self.keywords.is_empty() {
            return Err(ExtractorError::InvalidConfig {
                path: origin.to_owned(),
                reason: "at least one keyword is required".to_owned(),
            });
        }
        if self.keywords.iter().any(String::is_empty) {
            return Err(ExtractorError::InvalidConfig {
                path: origin.to_owned(),
                reason: "keywords must not be empty strings".to_owned(),
            });
        }
        Ok(())
    }

    /// The configured keywords as a matcher.
    #[must_use]
    pub fn keyword_set(&self) -> Keywords {
        Keywords::new(self.keywords.clone())
    }

    /// Directory holding the verbatim archive members.
    #[must_use]
    pub fn raw_zip_dir(&self) -> Utf8PathBuf {
        self.output_dir.join(RAW_ZIP_DIR)
    }

    /// Expected location of the decoded manifest.
    #[must_use]
    pub fn manifest_path(&self) -> Utf8PathBuf {
        self.output_dir.join(MANIFEST_FILE)
    }

    /// Directory searched for native shared objects.
    #[must_use]
    pub fn native_lib_dir(&self) -> Utf8PathBuf {
        self.raw_zip_dir().join("lib")
    }

    /// Directory searched for asset files.
    #[must_use]
    pub fn assets_dir(&self) -> Utf8PathBuf {
        self.raw_zip_dir().join("assets")
    }

    /// Log artefacts removed by the workspace reset.
    #[must_use]
    pub fn artefacts(&self) -> Vec<&Utf8Path> {
        let mut artefacts = vec![self.log_file.as_path()];
        if let Some(offsets) = &self.offsets_file {
            artefacts.push(offsets.as_path());
        }
        artefacts
    }
}
