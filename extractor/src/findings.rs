//! Findings log and offsets file.
//!
//! Both artefacts are append-only UTF-8 text, one human-readable line per
//! event. They are removed by the workspace reset and grow monotonically
//! during a run; entry order follows traversal order.

use crate::error::{ExtractorError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::time::{SystemTime, UNIX_EPOCH};

/// Bracketed status prefix of a log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Something was found.
    Found,
    /// An expected artefact is absent.
    Missing,
    /// A per-item operation failed.
    Failed,
    /// Informational: a step was skipped or had nothing to do.
    Info,
    /// A scanning step starts.
    Step,
    /// A detail block about one item starts.
    Item,
}

impl Marker {
    /// The literal prefix written to the log.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Found => "[✓]",
            Self::Missing => "[x]",
            Self::Failed => "[!]",
            Self::Info => "[-]",
            Self::Step => "[+]",
            Self::Item => "[>]",
        }
    }
}

impl fmt::Display for Marker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An append-only text artefact.
#[derive(Debug)]
pub struct AppendLog {
    path: Utf8PathBuf,
    file: File,
}

impl AppendLog {
    /// Opens `path` for appending, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::LogWrite`] if the file cannot be opened.
    pub fn open(path: &Utf8Path) -> Result<Self> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|source| ExtractorError::LogWrite {
                path: path.to_owned(),
                source,
            })?;
        Ok(Self {
            path: path.to_owned(),
            file,
        })
    }

    /// Path of the artefact.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }

    /// Appends one line.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::LogWrite`] if the write fails.
    pub fn line(&mut self, text: impl fmt::Display) -> Result<()> {
        writeln!(self.file, "{text}").map_err(|source| ExtractorError::LogWrite {
            path: self.path.clone(),
            source,
        })
    }
}

/// The findings log of a run.
#[derive(Debug)]
pub struct FindingsLog(AppendLog);

impl FindingsLog {
    /// Opens the findings log at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::LogWrite`] if the file cannot be opened.
    pub fn open(path: &Utf8Path) -> Result<Self> {
        AppendLog::open(path).map(Self)
    }

    /// Path of the log file.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        self.0.path()
    }

    /// Appends `<marker> <message>`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::LogWrite`] if the write fails.
    pub fn event(&mut self, marker: Marker, message: impl fmt::Display) -> Result<()> {
        self.0.line(format_args!("{marker} {message}"))
    }

    /// Appends an unmarked detail line.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::LogWrite`] if the write fails.
    pub fn detail(&mut self, text: impl fmt::Display) -> Result<()> {
        self.0.line(text)
    }

    /// Appends a `=== <title>: <timestamp> ===` banner.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::LogWrite`] if the write fails.
    pub fn banner(&mut self, title: &str) -> Result<()> {
        self.0.line(format_args!("=== {title}: {} ===", now_utc_iso8601()))
    }
}

/// Native-library facts mirrored one per line.
#[derive(Debug)]
pub struct OffsetsLog(AppendLog);

impl OffsetsLog {
    /// Opens the offsets file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::LogWrite`] if the file cannot be opened.
    pub fn open(path: &Utf8Path) -> Result<Self> {
        AppendLog::open(path).map(Self)
    }

    /// Appends `<library>: entrypoint = 0x<hex>`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::LogWrite`] if the write fails.
    pub fn entry_point(&mut self, library: &str, address: u64) -> Result<()> {
        self.0
            .line(format_args!("{library}: entrypoint = 0x{address:x}"))
    }

    /// Appends `<library>: <symbol>`.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractorError::LogWrite`] if the write fails.
    pub fn symbol(&mut self, library: &str, symbol: &str) -> Result<()> {
        self.0.line(format_args!("{library}: {symbol}"))
    }
}

/// Current UTC time as `YYYY-MM-DDThh:mm:ssZ`.
///
/// A clock set before the Unix epoch renders as the epoch itself.
#[must_use]
pub fn now_utc_iso8601() -> String {
    let secs = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_secs());
    format_epoch_secs(secs)
}

/// Formats a Unix epoch timestamp as `YYYY-MM-DDThh:mm:ssZ`.
///
/// # Examples
///
/// ```
/// use apk_deep_extractor::findings::format_epoch_secs;
///
/// assert_eq!(format_epoch_secs(0), "1970-01-01T00:00:00Z");
/// assert_eq!(format_epoch_secs(951_782_400), "2000-02-29T00:00:00Z");
/// ```
#[must_use]
pub fn format_epoch_secs(epoch_secs: u64) -> String {
    let (year, month, day) = civil_from_days(epoch_secs / 86_400);
    let day_secs = epoch_secs % 86_400;
    let hour = day_secs / 3_600;
    let minute = (day_secs % 3_600) / 60;
    let second = day_secs % 60;
    format!("{year:04}-{month:02}-{day:02}T{hour:02}:{minute:02}:{second:02}Z")
}

/// Converts days since the Unix epoch to a `(year, month, day)` triple.
///
/// Howard Hinnant's `civil_from_days`, restricted to post-epoch dates.
fn civil_from_days(days: u64) -> (u64, u64, u64) {
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1_460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    let year = yoe + era * 400 + u64::from(month <= 2);
    (year, month, day)
}
