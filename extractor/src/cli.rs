//! CLI argument definitions for the APK deep extractor.
//!
//! Flags override values from the optional configuration file, which in
//! turn override the built-in defaults.

use crate::config::ExtractorConfig;
use crate::error::Result;
use camino::Utf8PathBuf;
use clap::Parser;

/// Unpack an Android package and search its contents for keywords.
#[derive(Parser, Debug, Default)]
#[command(name = "apk-deep-extractor")]
#[command(version, about)]
#[command(long_about = concat!(
    "Unpack an Android package and search its contents for keywords.\n\n",
    "The archive is decompiled with apktool and also unzipped verbatim. The ",
    "manifest is checked, native libraries are parsed for their architecture, ",
    "entry point and exported functions, and assets and smali sources are ",
    "searched for keywords. Findings are appended to a log file.\n\n",
    "The output directory and log files are deleted at the start of every run.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Analyse app.apk with the default keywords:\n",
    "    $ apk-deep-extractor\n\n",
    "  Analyse another archive with custom keywords:\n",
    "    $ apk-deep-extractor --apk game.apk -k Gold -k Ammo\n\n",
    "  Print a machine-readable summary:\n",
    "    $ apk-deep-extractor --quiet --json",
))]
pub struct Cli {
    /// TOML configuration file.
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<Utf8PathBuf>,

    /// Archive to analyse [default: app.apk].
    #[arg(long, value_name = "FILE")]
    pub apk: Option<Utf8PathBuf>,

    /// Workspace directory, deleted and recreated [default: apk_full_extracted].
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// apktool executable [default: apktool].
    #[arg(long, value_name = "PATH")]
    pub decompiler: Option<Utf8PathBuf>,

    /// Findings log [default: apk_analysis_log.txt].
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<Utf8PathBuf>,

    /// Native-library offsets file [default: apk_offsets.txt].
    #[arg(long, value_name = "FILE", conflicts_with = "no_offsets")]
    pub offsets_file: Option<Utf8PathBuf>,

    /// Do not write the offsets file.
    #[arg(long)]
    pub no_offsets: bool,

    /// Keyword to search for (repeatable; replaces the configured list).
    #[arg(short, long = "keyword", value_name = "WORD")]
    pub keywords: Vec<String>,

    /// Suppress progress output (errors still shown).
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the run summary as JSON on standard output.
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    /// Builds the run configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ExtractorError::InvalidConfig`] when the
    /// configuration file cannot be loaded or the merged configuration is
    /// invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use apk_deep_extractor::cli::Cli;
    /// use clap::Parser;
    ///
    /// let cli = Cli::parse_from(["apk-deep-extractor", "--apk", "game.apk", "--no-offsets"]);
    /// let config = cli.to_config()?;
    /// assert_eq!(config.archive, "game.apk");
    /// assert!(config.offsets_file.is_none());
    /// # Ok::<(), apk_deep_extractor::error::ExtractorError>(())
    /// ```
    pub fn to_config(&self) -> Result<ExtractorConfig> {
        let mut config = match &self.config {
            Some(path) => ExtractorConfig::load(path)?,
            None => ExtractorConfig::default(),
        };

        if let Some(apk) = &self.apk {
            config.archive.clone_from(apk);
        }
        if let Some(output_dir) = &self.output_dir {
            config.output_dir.clone_from(output_dir);
        }
        if let Some(decompiler) = &self.decompiler {
            config.decompiler.clone_from(decompiler);
        }
        if let Some(log_file) = &self.log_file {
            config.log_file.clone_from(log_file);
        }
        if self.no_offsets {
            config.offsets_file = None;
        } else if let Some(offsets_file) = &self.offsets_file {
            config.offsets_file = Some(offsets_file.clone());
        }
        if !self.keywords.is_empty() {
            config.keywords.clone_from(&self.keywords);
        }

        config.validate("command line")?;
        Ok(config)
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
