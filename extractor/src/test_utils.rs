//! Shared test utilities for the extractor crate.
//!
//! Compiled for unit tests and, behind the `test-support` feature, for the
//! behaviour suites under `tests/`.

use crate::command::CommandExecutor;
use crate::decompiler::{Decompiler, apktool_args};
use crate::error::{ExtractorError, Result};
use camino::Utf8Path;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Write};
use std::path::Path;
use std::process::{ExitStatus, Output};
use zip::write::SimpleFileOptions;

/// Builds the `ExitStatus` a process reports for `code`.
#[cfg(unix)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Builds the `ExitStatus` a process reports for `code`.
#[cfg(windows)]
#[must_use]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Captured output of an apktool run that exited with `code` after writing
/// `stderr`.
#[must_use]
pub fn apktool_output(code: i32, stderr: &str) -> Output {
    Output {
        status: exit_status(code),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// One apktool run a [`ScriptedApktool`] expects, and what it reports back.
#[derive(Debug)]
pub struct ApktoolRun {
    /// Tool path the decompiler must launch.
    pub tool: &'static str,
    /// Archive the run must decode.
    pub archive: &'static str,
    /// Directory the run must write into.
    pub output_dir: &'static str,
    /// Spawn result handed back to the decompiler.
    pub result: io::Result<Output>,
}

/// [`CommandExecutor`] that replays scripted apktool runs in order.
///
/// Each invocation is checked against the `d <apk> -f -o <out>` form before
/// its scripted result is returned; an unscripted invocation is a spawn
/// error.
#[derive(Debug)]
pub struct ScriptedApktool {
    runs: RefCell<VecDeque<ApktoolRun>>,
}

impl ScriptedApktool {
    /// Scripts `runs` in invocation order.
    #[must_use]
    pub fn new(runs: Vec<ApktoolRun>) -> Self {
        Self {
            runs: RefCell::new(runs.into()),
        }
    }

    /// Asserts every scripted run was invoked.
    ///
    /// # Panics
    ///
    /// Panics if a scripted run is left over.
    pub fn assert_finished(&self) {
        let left = self.runs.borrow().len();
        assert_eq!(left, 0, "{left} scripted apktool run(s) never happened");
    }
}

impl CommandExecutor for ScriptedApktool {
    fn run(&self, cmd: &str, args: &[&str]) -> io::Result<Output> {
        let Some(run) = self.runs.borrow_mut().pop_front() else {
            return Err(io::Error::other(format!(
                "unscripted apktool run: {cmd} {}",
                args.join(" ")
            )));
        };

        assert_eq!(cmd, run.tool);
        assert_eq!(
            args,
            apktool_args(Utf8Path::new(run.archive), Utf8Path::new(run.output_dir))
        );
        run.result
    }
}

/// Writes synthetic APK archives entry by entry.
///
/// # Examples
///
/// ```
/// use apk_deep_extractor::test_utils::ApkBuilder;
///
/// let temp = tempfile::tempdir()?;
/// let apk = temp.path().join("game.apk");
/// ApkBuilder::new()
///     .file("assets/strings.txt", b"PlayerDamageValue=50")
///     .write_to(&apk)?;
/// assert!(apk.exists());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct ApkBuilder {
    entries: Vec<(String, Option<Vec<u8>>)>,
}

impl ApkBuilder {
    /// Starts an empty archive.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file entry.
    #[must_use]
    pub fn file(mut self, name: &str, contents: &[u8]) -> Self {
        self.entries.push((name.to_owned(), Some(contents.to_vec())));
        self
    }

    /// Adds an explicit directory entry.
    #[must_use]
    pub fn directory(mut self, name: &str) -> Self {
        self.entries.push((name.to_owned(), None));
        self
    }

    /// Writes the archive to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be created or an entry cannot be
    /// written.
    pub fn write_to(&self, path: &Path) -> zip::result::ZipResult<()> {
        let file = std::fs::File::create(path)?;
        let mut writer = zip::ZipWriter::new(file);
        let options = SimpleFileOptions::default();

        for (name, contents) in &self.entries {
            match contents {
                Some(bytes) => {
                    writer.start_file(name.as_str(), options)?;
                    writer.write_all(bytes)?;
                }
                None => writer.add_directory(name.as_str(), options)?,
            }
        }

        writer.finish()?;
        Ok(())
    }
}

/// ELF `e_machine` value for AArch64.
pub const EM_AARCH64: u16 = 183;

/// Builds a header-only 64-bit little-endian ELF shared object image.
///
/// The image has no program or section headers, so it parses as a valid
/// shared object with no exported functions.
#[must_use]
pub fn minimal_elf(machine: u16, entry: u64) -> Vec<u8> {
    let mut image = Vec::with_capacity(64);
    image.extend_from_slice(&[0x7F, b'E', b'L', b'F']);
    image.push(2); // ELFCLASS64
    image.push(1); // ELFDATA2LSB
    image.push(1); // EV_CURRENT
    image.extend_from_slice(&[0; 9]);
    image.extend_from_slice(&3_u16.to_le_bytes()); // ET_DYN
    image.extend_from_slice(&machine.to_le_bytes());
    image.extend_from_slice(&1_u32.to_le_bytes());
    image.extend_from_slice(&entry.to_le_bytes());
    image.extend_from_slice(&0_u64.to_le_bytes()); // e_phoff
    image.extend_from_slice(&0_u64.to_le_bytes()); // e_shoff
    image.extend_from_slice(&0_u32.to_le_bytes()); // e_flags
    image.extend_from_slice(&64_u16.to_le_bytes()); // e_ehsize
    image.extend_from_slice(&56_u16.to_le_bytes()); // e_phentsize
    image.extend_from_slice(&0_u16.to_le_bytes()); // e_phnum
    image.extend_from_slice(&64_u16.to_le_bytes()); // e_shentsize
    image.extend_from_slice(&0_u16.to_le_bytes()); // e_shnum
    image.extend_from_slice(&0_u16.to_le_bytes()); // e_shstrndx
    image
}

/// A [`Decompiler`] that writes a fixed tree instead of running apktool.
///
/// # Examples
///
/// ```
/// use apk_deep_extractor::decompiler::Decompiler;
/// use apk_deep_extractor::test_utils::FakeDecompiler;
/// use camino::{Utf8Path, Utf8PathBuf};
///
/// let temp = tempfile::tempdir()?;
/// let out = Utf8PathBuf::try_from(temp.path().to_path_buf())?;
/// FakeDecompiler::new()
///     .file("AndroidManifest.xml", "<manifest/>")
///     .decompile(Utf8Path::new("game.apk"), &out)?;
/// assert!(out.join("AndroidManifest.xml").is_file());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Default, Clone)]
pub struct FakeDecompiler {
    files: Vec<(String, String)>,
    failure: Option<String>,
}

impl FakeDecompiler {
    /// A decompiler that succeeds without writing anything.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A decompiler that fails with `stderr` as the tool's message.
    #[must_use]
    pub fn failing(stderr: &str) -> Self {
        Self {
            files: Vec::new(),
            failure: Some(stderr.to_owned()),
        }
    }

    /// Adds a file written relative to the output directory.
    #[must_use]
    pub fn file(mut self, relative: &str, contents: &str) -> Self {
        self.files.push((relative.to_owned(), contents.to_owned()));
        self
    }
}

impl Decompiler for FakeDecompiler {
    fn decompile(&self, _archive: &Utf8Path, output_dir: &Utf8Path) -> Result<()> {
        if let Some(stderr) = &self.failure {
            return Err(ExtractorError::DecompilationFailed {
                status: "exit code 1".to_owned(),
                stderr: stderr.clone(),
            });
        }
        for (relative, contents) in &self.files {
            let path = output_dir.join(relative);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&path, contents)?;
        }
        Ok(())
    }
}
