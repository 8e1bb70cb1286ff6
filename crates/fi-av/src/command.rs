//! Builder for executing external tool commands with timeout support.

use std::path::PathBuf;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Default command timeout: 10 seconds, enough for probing a head block.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Output captured from a tool execution.
#[derive(Debug, Clone)]
pub struct ToolOutput {
    /// Process exit status.
    pub status: ExitStatus,
    /// Captured standard output, raw.
    pub stdout: Vec<u8>,
    /// Captured standard error (lossy UTF-8).
    pub stderr: String,
}

/// A builder for constructing and executing external tool invocations.
///
/// # Example
///
/// ```no_run
/// use fi_av::ToolCommand;
/// use std::path::PathBuf;
///
/// # async fn example(head: Vec<u8>) -> fi_core::Result<()> {
/// let output = ToolCommand::new(PathBuf::from("ffprobe"))
///     .args(["-loglevel", "error", "-show_streams", "-print_format", "json", "-"])
///     .stdin(head)
///     .execute()
///     .await?;
/// println!("{}", String::from_utf8_lossy(&output.stdout));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    timeout: Duration,
    stdin_data: Option<Vec<u8>>,
}

impl ToolCommand {
    /// Create a new command for the given program path.
    pub fn new(program: PathBuf) -> Self {
        Self {
            program,
            args: Vec::new(),
            timeout: DEFAULT_TIMEOUT,
            stdin_data: None,
        }
    }

    /// Append a single argument.
    pub fn arg(&mut self, s: impl Into<String>) -> &mut Self {
        self.args.push(s.into());
        self
    }

    /// Append multiple arguments.
    pub fn args(&mut self, iter: impl IntoIterator<Item = impl Into<String>>) -> &mut Self {
        self.args.extend(iter.into_iter().map(Into::into));
        self
    }

    /// Set the maximum execution time.
    pub fn timeout(&mut self, d: Duration) -> &mut Self {
        self.timeout = d;
        self
    }

    /// Provide data to be written to the process's stdin.
    pub fn stdin(&mut self, data: Vec<u8>) -> &mut Self {
        self.stdin_data = Some(data);
        self
    }

    fn program_name(&self) -> String {
        self.program
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| self.program.to_string_lossy().to_string())
    }

    /// Execute the command, capturing stdout and stderr.
    ///
    /// Stdin data is written concurrently with output collection, so a tool
    /// that starts answering before it has consumed all of its input cannot
    /// deadlock against us. A tool that stops reading early (ffprobe does once
    /// it has seen enough) is not an error.
    ///
    /// # Errors
    ///
    /// - Returns [`fi_core::Error::Tool`] if the process times out (message
    ///   includes the timeout duration).
    /// - Returns [`fi_core::Error::Tool`] if the process exits with a non-zero
    ///   status (message includes stderr).
    /// - Returns [`fi_core::Error::Tool`] if spawning the process fails.
    pub async fn execute(&self) -> fi_core::Result<ToolOutput> {
        let program_name = self.program_name();

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .stdin(if self.stdin_data.is_some() {
                Stdio::piped()
            } else {
                Stdio::null()
            })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        tracing::debug!(tool = %program_name, args = ?self.args, "spawning tool");

        let mut child = cmd
            .spawn()
            .map_err(|e| fi_core::Error::tool(&program_name, format!("failed to spawn: {e}")))?;

        let feeder = match (self.stdin_data.clone(), child.stdin.take()) {
            (Some(data), Some(mut stdin)) => Some(tokio::spawn(async move {
                let result = stdin.write_all(&data).await;
                drop(stdin);
                result
            })),
            _ => None,
        };

        // Wait with timeout; dropping the future kills the child.
        let result = tokio::time::timeout(self.timeout, child.wait_with_output()).await;

        if let Some(feeder) = feeder {
            match feeder.await {
                Ok(Err(e)) if e.kind() != std::io::ErrorKind::BrokenPipe => {
                    tracing::debug!(tool = %program_name, "stdin write failed: {e}");
                }
                _ => {}
            }
        }

        match result {
            Ok(Ok(output)) => {
                let tool_output = ToolOutput {
                    status: output.status,
                    stdout: output.stdout,
                    stderr: String::from_utf8_lossy(&output.stderr).to_string(),
                };

                if !output.status.success() {
                    return Err(fi_core::Error::tool(
                        program_name,
                        format!(
                            "exited with status {}: {}",
                            output.status,
                            tool_output.stderr.trim()
                        ),
                    ));
                }

                Ok(tool_output)
            }
            Ok(Err(e)) => Err(fi_core::Error::tool(
                program_name,
                format!("I/O error waiting for process: {e}"),
            )),
            Err(_elapsed) => Err(fi_core::Error::tool(
                program_name,
                format!("timed out after {:?}", self.timeout),
            )),
        }
    }
}
