//! APK deep extractor CLI entrypoint.
//!
//! This binary resets the workspace, decompiles and unzips the configured
//! archive, and writes its findings to the log file. A short summary is
//! printed to stderr when the run completes.

use apk_deep_extractor::cli::Cli;
use apk_deep_extractor::command::SystemCommandExecutor;
use apk_deep_extractor::decompiler::ApktoolDecompiler;
use apk_deep_extractor::error::{ExtractorError, Result, error_chain};
use apk_deep_extractor::native::ElfParser;
use apk_deep_extractor::output::{
    success_message, summary_json, summary_text, write_stderr_line,
};
use apk_deep_extractor::pipeline::{PipelineDeps, run_pipeline};
use clap::Parser;
use std::io::Write;

fn main() {
    let cli = Cli::parse();
    let mut stdout = std::io::stdout();
    let mut stderr = std::io::stderr();
    let run_result = run(&cli, &mut stdout, &mut stderr);
    let exit_code = exit_code_for_run_result(run_result, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

fn run(cli: &Cli, stdout: &mut dyn Write, stderr: &mut dyn Write) -> Result<()> {
    let config = cli.to_config()?;

    if !cli.quiet {
        write_stderr_line(stderr, "=== APK Deep Extractor ===");
    }

    let decompiler = ApktoolDecompiler::new(config.decompiler.clone(), SystemCommandExecutor);
    let deps = PipelineDeps {
        decompiler: &decompiler,
        parser: &ElfParser,
        spinner: Some(stderr_spinner),
    };
    let progress: Option<&mut dyn Write> = if cli.quiet { None } else { Some(&mut *stderr) };
    let summary = run_pipeline(&config, deps, progress)?;

    if !cli.quiet {
        write_stderr_line(stderr, "");
        write_stderr_line(stderr, summary_text(&summary));
        write_stderr_line(stderr, success_message(&summary.log_file));
    }

    if cli.json {
        let json = summary_json(&summary).map_err(|err| ExtractorError::Io(err.into()))?;
        writeln!(stdout, "{json}")?;
    }

    Ok(())
}

fn stderr_spinner() -> Box<dyn Write + Send> {
    Box::new(std::io::stderr())
}

fn exit_code_for_run_result(result: Result<()>, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, format_args!("error: {}", error_chain(&err)));
            1
        }
    }
}
