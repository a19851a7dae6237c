use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::time::{Instant, timeout};

use crate::constants::DEFAULT_MAX_OUTPUT_BYTES;
use crate::core::domain::{ExecutionResult, ExecutionStatus};
use crate::core::traits::runner::Runner;
use crate::native::workspace::Workspace;

#[derive(Debug, thiserror::Error)]
enum CaptureError {
    #[error("I/O error while talking to the process: {0}")]
    Io(#[from] std::io::Error),
    #[error("{stream} exceeded the {limit} byte limit")]
    LimitExceeded { stream: &'static str, limit: usize },
}

struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    status: ExitStatus,
}

/// Runs source code through an interpreter as a plain child process.
///
/// The only isolation is a fresh working directory and a wall-clock timeout;
/// this is not a security boundary.
#[derive(Clone, Debug)]
pub struct ProcessRunner {
    program: PathBuf,
    args: Vec<String>,
    file_name: String,
    temp_root: PathBuf,
    max_output_bytes: usize,
}

impl ProcessRunner {
    pub fn new<P: AsRef<Path>>(program: P, file_name: &str) -> Self {
        Self {
            program: program.as_ref().into(),
            args: Vec::new(),
            file_name: file_name.to_string(),
            temp_root: std::env::temp_dir(),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }

    pub fn javascript<P: AsRef<Path>>(node_path: P) -> Self {
        Self::new(node_path, "main.js")
    }

    pub fn python<P: AsRef<Path>>(python_path: P) -> Self {
        Self::new(python_path, "main.py")
    }

    pub fn arg(mut self, arg: &str) -> Self {
        self.args.push(arg.to_string());
        self
    }

    pub fn temp_root<P: AsRef<Path>>(mut self, root: P) -> Self {
        self.temp_root = root.as_ref().into();
        self
    }

    pub fn max_output_bytes(mut self, limit: usize) -> Self {
        self.max_output_bytes = limit;
        self
    }

    async fn collect(&self, child: &mut Child, stdin: &str) -> Result<Captured, CaptureError> {
        let limit = self.max_output_bytes;
        let (_, stdout, stderr) = tokio::try_join!(
            feed_stdin(child.stdin.take(), stdin),
            read_capped(child.stdout.take(), limit, "stdout"),
            read_capped(child.stderr.take(), limit, "stderr"),
        )?;
        let status = child.wait().await?;

        Ok(Captured {
            stdout,
            stderr,
            status,
        })
    }
}

#[async_trait::async_trait]
impl Runner for ProcessRunner {
    #[tracing::instrument(skip(self, code, stdin), fields(program = %self.program.display()))]
    async fn execute(&self, code: &str, stdin: &str, time_limit: Duration) -> ExecutionResult {
        let workspace = match Workspace::create(&self.temp_root).await {
            Ok(workspace) => workspace,
            Err(e) => {
                tracing::error!("Failed to create workspace: {}", e);
                return ExecutionResult::error(
                    format!("Failed to create working directory: {}", e),
                    "Preparation failed",
                );
            }
        };
        let source = match workspace.write_file(&self.file_name, code).await {
            Ok(path) => path,
            Err(e) => {
                tracing::error!("Failed to write source file: {}", e);
                return ExecutionResult::error(
                    format!("Failed to write source file: {}", e),
                    "Preparation failed",
                );
            }
        };

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(&source)
            .current_dir(workspace.path())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        cmd.process_group(0);

        let start = Instant::now();
        let mut child = match cmd.spawn() {
            Ok(child) => child,
            Err(e) => {
                tracing::error!("Failed to spawn process: {}", e);
                return ExecutionResult::error(
                    format!("Failed to spawn {}: {}", self.program.display(), e),
                    "Spawn failed",
                );
            }
        };
        let _group = ProcessGroup::of(&child);

        let outcome = timeout(time_limit, self.collect(&mut child, stdin)).await;
        let time_ms = start.elapsed().as_millis() as u64;

        let captured = match outcome {
            Ok(Ok(captured)) => captured,
            Ok(Err(e)) => {
                kill(&mut child).await;
                tracing::debug!("Execution aborted: {}", e);
                return ExecutionResult {
                    time_ms,
                    ..ExecutionResult::error(e.to_string(), "Execution aborted")
                };
            }
            Err(_) => {
                kill(&mut child).await;
                tracing::debug!("Execution timed out after {:?}", time_limit);
                return ExecutionResult {
                    status: ExecutionStatus::Timeout,
                    time_ms,
                    ..ExecutionResult::error(
                        String::new(),
                        format!("Execution timed out after {}ms", time_limit.as_millis()),
                    )
                };
            }
        };

        let stdout = String::from_utf8_lossy(&captured.stdout).trim_end().to_string();
        let stderr = String::from_utf8_lossy(&captured.stderr).trim_end().to_string();

        let result = match captured.status.code() {
            Some(0) => ExecutionResult::passed(stdout, stderr, time_ms),
            code => ExecutionResult {
                stdout,
                time_ms,
                ..ExecutionResult::error(
                    stderr,
                    match code {
                        Some(code) => format!("Process exited with code {}", code),
                        None => "Process was terminated by a signal".to_string(),
                    },
                )
            },
        };
        tracing::debug!(status = ?result.status, time_ms, "Process finished");

        result
    }
}

async fn feed_stdin(pipe: Option<ChildStdin>, input: &str) -> Result<(), CaptureError> {
    if let Some(mut pipe) = pipe {
        match pipe.write_all(input.as_bytes()).await {
            Ok(()) => {}
            // The program may exit without reading its input
            Err(e) if e.kind() == ErrorKind::BrokenPipe => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

async fn read_capped<R>(
    pipe: Option<R>,
    limit: usize,
    stream: &'static str,
) -> Result<Vec<u8>, CaptureError>
where
    R: AsyncRead + Unpin,
{
    let Some(pipe) = pipe else {
        return Ok(Vec::new());
    };

    let mut buf = Vec::new();
    let mut reader = pipe.take(limit as u64 + 1);
    reader.read_to_end(&mut buf).await?;

    if buf.len() > limit {
        return Err(CaptureError::LimitExceeded { stream, limit });
    }
    Ok(buf)
}

/// Kills the child's whole process group when dropped, so anything the
/// program spawned dies with it.
struct ProcessGroup(Option<u32>);

impl ProcessGroup {
    fn of(child: &Child) -> Self {
        Self(child.id())
    }
}

impl Drop for ProcessGroup {
    fn drop(&mut self) {
        if let Some(pgid) = self.0 {
            kill_group(pgid);
        }
    }
}

#[cfg(unix)]
fn kill_group(pgid: u32) {
    // ESRCH just means the group is already gone
    unsafe {
        libc::kill(-(pgid as libc::pid_t), libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_group(_pgid: u32) {}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        tracing::warn!("Failed to kill process: {}", e);
    }
}
