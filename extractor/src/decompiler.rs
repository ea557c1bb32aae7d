//! Invocation of the external APK decompiler.
//!
//! apktool turns the binary manifest and resources into readable XML and
//! the dex bytecode into smali sources. The extractor treats it as a black
//! box with one contract: exit status 0 means the decompiled tree has been
//! written under the output directory.

use crate::command::{CommandExecutor, describe_status};
use crate::error::{ExtractorError, Result};
use camino::{Utf8Path, Utf8PathBuf};
use log::debug;

/// Produces a decompiled tree for an archive.
pub trait Decompiler {
    /// Decompiles `archive` into `output_dir`, overwriting existing content.
    ///
    /// # Errors
    ///
    /// Returns an error when the decompiler cannot be started or reports
    /// failure. Both abort the run.
    fn decompile(&self, archive: &Utf8Path, output_dir: &Utf8Path) -> Result<()>;
}

/// Runs `<tool> d <archive> -f -o <output_dir>`.
#[derive(Debug, Clone)]
pub struct ApktoolDecompiler<E> {
    tool: Utf8PathBuf,
    executor: E,
}

impl<E: CommandExecutor> ApktoolDecompiler<E> {
    /// Creates a decompiler that runs `tool` through `executor`.
    #[must_use]
    pub fn new(tool: impl Into<Utf8PathBuf>, executor: E) -> Self {
        Self {
            tool: tool.into(),
            executor,
        }
    }
}

/// Argument vector passed to apktool.
///
/// # Examples
///
/// ```
/// use apk_deep_extractor::decompiler::apktool_args;
/// use camino::Utf8Path;
///
/// let args = apktool_args(Utf8Path::new("game.apk"), Utf8Path::new("out"));
/// assert_eq!(args, ["d", "game.apk", "-f", "-o", "out"]);
/// ```
#[must_use]
pub fn apktool_args<'a>(archive: &'a Utf8Path, output_dir: &'a Utf8Path) -> [&'a str; 5] {
    ["d", archive.as_str(), "-f", "-o", output_dir.as_str()]
}

impl<E: CommandExecutor> Decompiler for ApktoolDecompiler<E> {
    fn decompile(&self, archive: &Utf8Path, output_dir: &Utf8Path) -> Result<()> {
        let args = apktool_args(archive, output_dir);
        debug!("running {} {}", self.tool, args.join(" "));

        let output = self.executor.run(self.tool.as_str(), &args).map_err(|source| {
            ExtractorError::DecompilerUnavailable {
                tool: self.tool.clone(),
                source,
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractorError::DecompilationFailed {
                status: describe_status(&output),
                stderr: stderr.trim().to_owned(),
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{ApktoolRun, ScriptedApktool, apktool_output};

    fn scripted(result: std::io::Result<std::process::Output>) -> ScriptedApktool {
        ScriptedApktool::new(vec![ApktoolRun {
            tool: "/opt/apktool",
            archive: "game.apk",
            output_dir: "out",
            result,
        }])
    }

    #[test]
    fn passes_archive_force_flag_and_output_dir() {
        let executor = scripted(Ok(apktool_output(0, "")));
        let decompiler = ApktoolDecompiler::new("/opt/apktool", &executor);

        decompiler
            .decompile(Utf8Path::new("game.apk"), Utf8Path::new("out"))
            .expect("decompile should succeed");
        executor.assert_finished();
    }

    #[test]
    fn non_zero_exit_is_fatal() {
        let executor = scripted(Ok(apktool_output(1, "Input file was not found\n")));
        let decompiler = ApktoolDecompiler::new("/opt/apktool", &executor);

        let err = decompiler
            .decompile(Utf8Path::new("game.apk"), Utf8Path::new("out"))
            .expect_err("decompile should fail");
        match err {
            ExtractorError::DecompilationFailed { status, stderr } => {
                assert_eq!(status, "exit code 1");
                assert_eq!(stderr, "Input file was not found");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn spawn_failure_names_the_tool() {
        let executor = scripted(Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "not found",
        )));
        let decompiler = ApktoolDecompiler::new("/opt/apktool", &executor);

        let err = decompiler
            .decompile(Utf8Path::new("game.apk"), Utf8Path::new("out"))
            .expect_err("decompile should fail");
        assert!(matches!(
            err,
            ExtractorError::DecompilerUnavailable { ref tool, .. } if tool == "/opt/apktool"
        ));
    }
}
