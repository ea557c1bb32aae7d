//! End-to-end extraction pipeline.
//!
//! The stages run strictly in sequence and communicate only through the
//! filesystem: reset the workspace, decompile, unzip, then inspect the
//! manifest, native libraries, assets and smali sources. Per-item outcomes
//! from the scanners are rendered into the findings log here, so the
//! scanners themselves never touch the log.

use crate::assets::{AssetOutcome, AssetScan, scan_assets};
use crate::bytecode::{BytecodeScan, scan_bytecode};
use crate::config::{ExtractorConfig, MANIFEST_FILE, RAW_ZIP_DIR};
use crate::decompiler::Decompiler;
use crate::error::{ExtractorError, Result};
use crate::extraction::{extract_archive, sha256_file};
use crate::findings::{FindingsLog, Marker, OffsetsLog};
use crate::manifest::{ManifestStatus, check_manifest};
use crate::native::{BinaryParser, LibraryOutcome, scan_native_libraries};
use crate::output::write_stderr_line;
use crate::progress::Spinner;
use crate::workspace::reset_workspace;
use camino::Utf8PathBuf;
use serde::Serialize;
use std::fmt;
use std::io::Write;

/// Opens the sink a decompilation spinner draws on.
pub type SpinnerSink = fn() -> Box<dyn Write + Send>;

/// External collaborators of a run.
#[derive(Clone, Copy)]
pub struct PipelineDeps<'a> {
    /// Produces the decompiled tree.
    pub decompiler: &'a dyn Decompiler,
    /// Parses native shared objects.
    pub parser: &'a dyn BinaryParser,
    /// Where the spinner draws while the decompiler runs; `None` disables it.
    pub spinner: Option<SpinnerSink>,
}

/// Counts describing what a run found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    /// Archive that was analysed.
    pub archive: Utf8PathBuf,
    /// Lowercase hex SHA-256 of the archive.
    pub archive_sha256: String,
    /// Findings log written by the run.
    pub log_file: Utf8PathBuf,
    /// Offsets file written by the run, if enabled.
    pub offsets_file: Option<Utf8PathBuf>,
    /// Entries extracted from the archive.
    pub archive_entries: usize,
    /// Whether the decoded manifest exists.
    pub manifest_found: bool,
    /// Native libraries that parsed.
    pub libraries_parsed: usize,
    /// Native libraries that failed to parse.
    pub libraries_failed: usize,
    /// Asset counts; `None` when there is no assets directory.
    pub assets: Option<AssetCounts>,
    /// Smali counts; `None` when there is no smali tree.
    pub smali: Option<SmaliCounts>,
}

/// Per-outcome asset counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AssetCounts {
    /// Assets decoded and persisted as text.
    pub decoded: usize,
    /// Assets no decoder accepted.
    pub undecodable: usize,
    /// Assets that could not be read or persisted.
    pub failed: usize,
    /// Keyword matches across all assets.
    pub matches: usize,
}

/// Smali counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SmaliCounts {
    /// Smali files inspected.
    pub files: usize,
    /// Files that contained a keyword.
    pub matches: usize,
}

/// Runs every stage for `config`.
///
/// Progress lines go to `progress`; pass `None` for a silent run. When
/// progress is enabled and `deps.spinner` is set, a spinner is drawn on the
/// sink it opens while the decompiler runs.
///
/// # Errors
///
/// Returns the first fatal error: the workspace cannot be reset, the
/// archive cannot be read or contains an unsafe entry, the decompiler
/// cannot be started or fails, or a log artefact cannot be written. The
/// workspace is left as it was at the point of failure.
pub fn run_pipeline(
    config: &ExtractorConfig,
    deps: PipelineDeps<'_>,
    mut progress: Option<&mut dyn Write>,
) -> Result<RunSummary> {
    reset_workspace(&config.output_dir, &config.artefacts())?;

    let mut log = FindingsLog::open(&config.log_file)?;
    let mut offsets = config
        .offsets_file
        .as_deref()
        .map(OffsetsLog::open)
        .transpose()?;

    log.banner("Analysis started")?;
    let archive_sha256 =
        sha256_file(config.archive.as_std_path()).map_err(|err| ExtractorError::Archive {
            path: config.archive.clone(),
            source: err.into(),
        })?;
    log.event(
        Marker::Step,
        format_args!("Archive: {} (sha256 {archive_sha256})", config.archive),
    )?;

    decompile(config, deps, reborrow(&mut progress))?;

    let extraction = extract_archive(
        &config.archive,
        &config.raw_zip_dir(),
        reborrow(&mut progress),
    )?;
    announce(
        reborrow(&mut progress),
        format_args!("{} APK unzipped into {RAW_ZIP_DIR}.", Marker::Found),
    );

    let manifest = check_manifest(&config.manifest_path());
    record_manifest(&mut log, &manifest)?;

    let libraries = scan_native_libraries(config.native_lib_dir().as_std_path(), deps.parser);
    record_libraries(&mut log, offsets.as_mut(), &libraries)?;

    let keywords = config.keyword_set();
    let assets = scan_assets(config.assets_dir().as_std_path(), &keywords);
    record_assets(&mut log, &assets)?;

    let bytecode = scan_bytecode(config.output_dir.as_std_path(), &keywords);
    record_bytecode(&mut log, &bytecode)?;

    log.banner("Analysis complete")?;

    Ok(RunSummary {
        archive: config.archive.clone(),
        archive_sha256,
        log_file: config.log_file.clone(),
        offsets_file: config.offsets_file.clone(),
        archive_entries: extraction.entries,
        manifest_found: manifest.is_found(),
        libraries_parsed: libraries
            .iter()
            .filter(|outcome| matches!(outcome, LibraryOutcome::Parsed(_)))
            .count(),
        libraries_failed: libraries
            .iter()
            .filter(|outcome| matches!(outcome, LibraryOutcome::Failed { .. }))
            .count(),
        assets: asset_counts(&assets),
        smali: smali_counts(&bytecode),
    })
}

fn reborrow<'a>(progress: &'a mut Option<&mut dyn Write>) -> Option<&'a mut dyn Write> {
    progress.as_mut().map(|sink| &mut **sink as &mut dyn Write)
}

fn announce(progress: Option<&mut dyn Write>, message: impl fmt::Display) {
    if let Some(sink) = progress {
        write_stderr_line(sink, message);
    }
}

fn decompile(
    config: &ExtractorConfig,
    deps: PipelineDeps<'_>,
    progress: Option<&mut dyn Write>,
) -> Result<()> {
    let decompiler = deps.decompiler;
    let Some(sink) = progress else {
        return decompiler.decompile(&config.archive, &config.output_dir);
    };

    write_stderr_line(
        sink,
        format_args!(
            "{} Running {} to extract resources and smali...",
            Marker::Step,
            config.decompiler
        ),
    );
    let spinner = deps
        .spinner
        .map(|open_sink| Spinner::start("Decompiling", open_sink()));
    let result = decompiler.decompile(&config.archive, &config.output_dir);
    if let Some(spinner) = spinner {
        spinner.finish();
    }
    result?;
    write_stderr_line(sink, format_args!("{} Decompilation complete.", Marker::Found));
    Ok(())
}

fn record_manifest(log: &mut FindingsLog, manifest: &ManifestStatus) -> Result<()> {
    match manifest {
        ManifestStatus::Found(path) => {
            log.event(Marker::Found, format_args!("Manifest found: {path}"))
        }
        ManifestStatus::Missing => {
            log.event(Marker::Missing, format_args!("{MANIFEST_FILE} not found!"))
        }
    }
}

fn record_libraries(
    log: &mut FindingsLog,
    mut offsets: Option<&mut OffsetsLog>,
    libraries: &[LibraryOutcome],
) -> Result<()> {
    if libraries.is_empty() {
        return log.event(Marker::Info, "No .so libs found in /lib/.");
    }

    for outcome in libraries {
        match outcome {
            LibraryOutcome::Parsed(library) => {
                log.detail("")?;
                log.event(Marker::Item, format_args!("Native lib: {}", library.file_name))?;
                log.detail(format_args!("    - Arch: {}", library.machine))?;
                log.detail(format_args!("    - Entry: 0x{:x}", library.entry_point))?;
                if library.exported_functions.is_empty() {
                    log.detail("    - No exports.")?;
                } else {
                    log.detail("    - Exported functions:")?;
                    for name in &library.exported_functions {
                        log.detail(format_args!("        • {name}"))?;
                    }
                }

                if let Some(offsets) = offsets.as_deref_mut() {
                    offsets.entry_point(&library.file_name, library.entry_point)?;
                    for name in &library.exported_functions {
                        offsets.symbol(&library.file_name, name)?;
                    }
                }
            }
            LibraryOutcome::Failed {
                file_name, error, ..
            } => {
                log.event(
                    Marker::Failed,
                    format_args!("Failed to parse {file_name}: {error}"),
                )?;
            }
        }
    }
    Ok(())
}

fn record_assets(log: &mut FindingsLog, scan: &AssetScan) -> Result<()> {
    let AssetScan::Scanned(outcomes) = scan else {
        return log.event(Marker::Info, "No assets directory found.");
    };

    log.event(Marker::Step, "Scanning assets for keywords...")?;
    for outcome in outcomes {
        match outcome {
            AssetOutcome::Decoded {
                file_name, matches, ..
            } => {
                for keyword in matches {
                    log.event(
                        Marker::Found,
                        format_args!("'{keyword}' found in asset: {file_name}"),
                    )?;
                }
            }
            AssetOutcome::Undecodable { file_name, .. } => {
                log.event(
                    Marker::Info,
                    format_args!("Skipped undecodable asset: {file_name}"),
                )?;
            }
            AssetOutcome::Failed {
                file_name, error, ..
            } => {
                log.event(
                    Marker::Failed,
                    format_args!("Failed to read asset {file_name}: {error}"),
                )?;
            }
        }
    }
    Ok(())
}

fn record_bytecode(log: &mut FindingsLog, scan: &BytecodeScan) -> Result<()> {
    let BytecodeScan::Scanned { matches, .. } = scan else {
        return log.event(Marker::Info, "No smali folder found.");
    };

    log.event(Marker::Step, "Scanning smali classes...")?;
    for hit in matches {
        log.event(
            Marker::Found,
            format_args!("'{}' in smali: {}", hit.keyword, hit.path.display()),
        )?;
    }
    Ok(())
}

fn asset_counts(scan: &AssetScan) -> Option<AssetCounts> {
    let AssetScan::Scanned(outcomes) = scan else {
        return None;
    };
    let mut counts = AssetCounts::default();
    for outcome in outcomes {
        match outcome {
            AssetOutcome::Decoded { matches, .. } => {
                counts.decoded += 1;
                counts.matches += matches.len();
            }
            AssetOutcome::Undecodable { .. } => counts.undecodable += 1,
            AssetOutcome::Failed { .. } => counts.failed += 1,
        }
    }
    Some(counts)
}

fn smali_counts(scan: &BytecodeScan) -> Option<SmaliCounts> {
    match scan {
        BytecodeScan::Missing => None,
        BytecodeScan::Scanned { files, matches } => Some(SmaliCounts {
            files: *files,
            matches: matches.len(),
        }),
    }
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
