//! Output formatting for the extractor CLI.
//!
//! Human-readable text goes to standard error so that `--json` output on
//! standard output stays machine-readable.

use crate::findings::Marker;
use crate::pipeline::RunSummary;
use camino::Utf8Path;
use std::fmt;
use std::io::Write;

/// Writes one line, ignoring failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort output; a closed stderr must not fail the run.
    }
}

/// Format the closing message naming the findings log.
///
/// # Examples
///
/// ```
/// use apk_deep_extractor::output::success_message;
/// use camino::Utf8Path;
///
/// assert_eq!(
///     success_message(Utf8Path::new("apk_analysis_log.txt")),
///     "[✓] Log saved to apk_analysis_log.txt"
/// );
/// ```
#[must_use]
pub fn success_message(log_file: &Utf8Path) -> String {
    format!("{} Log saved to {log_file}", Marker::Found)
}

/// Format the run summary as indented text lines.
#[must_use]
pub fn summary_text(summary: &RunSummary) -> String {
    let mut lines = vec![
        format!("Archive: {} ({} entries)", summary.archive, summary.archive_entries),
        format!(
            "Manifest: {}",
            if summary.manifest_found { "found" } else { "missing" }
        ),
        format!(
            "Native libraries: {} parsed, {} failed",
            summary.libraries_parsed, summary.libraries_failed
        ),
    ];

    lines.push(match summary.assets {
        Some(assets) => format!(
            "Assets: {} decoded, {} undecodable, {} failed, {} keyword {}",
            assets.decoded,
            assets.undecodable,
            assets.failed,
            assets.matches,
            plural(assets.matches, "match", "matches"),
        ),
        None => "Assets: none".to_owned(),
    });

    lines.push(match summary.smali {
        Some(smali) => format!(
            "Smali: {} {} scanned, {} with keywords",
            smali.files,
            plural(smali.files, "file", "files"),
            smali.matches
        ),
        None => "Smali: none".to_owned(),
    });

    if let Some(offsets) = &summary.offsets_file {
        lines.push(format!("Offsets: {offsets}"));
    }

    lines
        .iter()
        .map(|line| format!("  {line}"))
        .collect::<Vec<_>>()
        .join("\n")
}

fn plural<'a>(count: usize, one: &'a str, many: &'a str) -> &'a str {
    if count == 1 { one } else { many }
}

/// Serialise the run summary as pretty-printed JSON.
///
/// # Errors
///
/// Returns an error if serialisation fails.
pub fn summary_json(summary: &RunSummary) -> serde_json::Result<String> {
    serde_json::to_string_pretty(summary)
}
