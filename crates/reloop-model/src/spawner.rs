use std::path::Path;
use std::process::Stdio;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, trace};

use crate::{GeneratedText, ModelError};

/// Utility for spawning backend CLI processes
pub struct ProcessSpawner;

impl ProcessSpawner {
    /// Spawn a process, capture its output, and map it to a generation result.
    ///
    /// A non-zero exit code or an empty stdout is an invocation failure; the
    /// captured stderr is surfaced in the error.
    pub async fn spawn(binary: &Path, args: &[&str]) -> Result<GeneratedText, ModelError> {
        let start = Instant::now();

        debug!(
            binary = %binary.display(),
            args = ?args,
            "Spawning model process"
        );

        let mut cmd = Command::new(binary);
        cmd.args(args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(Stdio::null()); // Non-interactive

        let mut child = cmd.spawn()?;

        // Capture stdout and stderr
        let stdout_handle = child.stdout.take().expect("stdout not captured");
        let stderr_handle = child.stderr.take().expect("stderr not captured");

        let mut stdout_reader = BufReader::new(stdout_handle).lines();
        let mut stderr_reader = BufReader::new(stderr_handle).lines();

        let mut stdout = String::new();
        let mut stderr = String::new();

        // Read both streams concurrently
        loop {
            tokio::select! {
                biased;

                result = stdout_reader.next_line() => {
                    match result {
                        Ok(Some(line)) => {
                            trace!(line = %line, "stdout");
                            if !stdout.is_empty() {
                                stdout.push('\n');
                            }
                            stdout.push_str(&line);
                        }
                        Ok(None) => {
                            // stdout closed, drain remaining stderr
                            while let Ok(Some(line)) = stderr_reader.next_line().await {
                                trace!(line = %line, "stderr");
                                if !stderr.is_empty() {
                                    stderr.push('\n');
                                }
                                stderr.push_str(&line);
                            }
                            break;
                        }
                        Err(e) => {
                            return Err(ModelError::InvocationFailed(format!(
                                "Failed to read stdout: {}",
                                e
                            )));
                        }
                    }
                }
                result = stderr_reader.next_line() => {
                    match result {
                        Ok(Some(line)) => {
                            trace!(line = %line, "stderr");
                            if !stderr.is_empty() {
                                stderr.push('\n');
                            }
                            stderr.push_str(&line);
                        }
                        Ok(None) => {
                            // stderr closed, continue reading stdout
                        }
                        Err(e) => {
                            return Err(ModelError::InvocationFailed(format!(
                                "Failed to read stderr: {}",
                                e
                            )));
                        }
                    }
                }
            }
        }

        let status = child.wait().await?;
        let duration = start.elapsed();

        debug!(
            exit_code = status.code().unwrap_or(-1),
            duration_ms = duration.as_millis(),
            "Model process completed"
        );

        if !status.success() {
            return Err(ModelError::InvocationFailed(format!(
                "exit code {}: {}",
                status.code().unwrap_or(-1),
                stderr
            )));
        }

        let output = GeneratedText::new(stdout, duration);
        if output.is_empty() {
            return Err(ModelError::EmptyResponse);
        }
        Ok(output)
    }
}
