//! Acquisition of raw status report text.
//!
//! Every failure here degrades to an empty line sequence, which the parser
//! treats the same as a report with no usage.

use std::path::Path;
use std::time::Duration;

use tokio::process::Command;

use crate::Config;

/// Returns the report lines from `file` if given, otherwise from the
/// configured status command.
pub fn acquire(config: &Config, file: Option<&Path>) -> Vec<String> {
    match file {
        Some(path) => read_report_file(path),
        None => run_status_command(&config.status_command, config.status_timeout()),
    }
}

/// Reads a previously captured report.
pub fn read_report_file(path: &Path) -> Vec<String> {
    match std::fs::read(path) {
        Ok(bytes) => split_lines(&bytes),
        Err(e) => {
            tracing::warn!(path = ?path, error = %e, "failed to read report file");
            Vec::new()
        }
    }
}

/// Runs the status command, waiting at most `timeout` for it to finish.
pub fn run_status_command(argv: &[String], timeout: Duration) -> Vec<String> {
    let Some((program, args)) = argv.split_first() else {
        tracing::warn!("no status command configured");
        return Vec::new();
    };

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            tracing::warn!(error = %e, "failed to start runtime for status command");
            return Vec::new();
        }
    };

    let output = runtime.block_on(async {
        tokio::time::timeout(
            timeout,
            Command::new(program).args(args).kill_on_drop(true).output(),
        )
        .await
    });

    match output {
        Err(_) => {
            tracing::warn!(program = %program, ?timeout, "status command timed out");
            Vec::new()
        }
        Ok(Err(e)) => {
            tracing::warn!(program = %program, error = %e, "failed to run status command");
            Vec::new()
        }
        Ok(Ok(output)) if !output.status.success() => {
            tracing::warn!(program = %program, status = %output.status, "status command failed");
            Vec::new()
        }
        Ok(Ok(output)) => {
            let lines = split_lines(&output.stdout);
            tracing::debug!(program = %program, lines = lines.len(), "status command finished");
            lines
        }
    }
}

fn split_lines(bytes: &[u8]) -> Vec<String> {
    String::from_utf8_lossy(bytes)
        .lines()
        .map(str::to_string)
        .collect()
}
