//! Bounded external command execution.
//!
//! Every subprocess Lingo starts (yt-dlp, llama-cli) goes through [`BoundedCommand`]:
//! the child is spawned with `kill_on_drop`, its output is read incrementally up to a
//! byte cap, and it is killed when the timeout or the cap is hit. Dropping the future
//! returned by [`BoundedCommand::run`] (request cancelled, server shutting down) also
//! kills the child.

use crate::error::{LingoError, Result};
use std::process::{ExitStatus, Stdio};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, warn};

const READ_CHUNK: usize = 8192;

/// Caps how many external processes run at the same time.
#[derive(Debug, Clone)]
pub struct ProcessLimiter {
    semaphore: Arc<Semaphore>,
}

impl ProcessLimiter {
    pub fn new(max_concurrent: usize) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    /// Wait for a free slot. The slot is released when the permit is dropped.
    pub async fn acquire(&self) -> Result<OwnedSemaphorePermit> {
        self.semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| LingoError::UpstreamFailure(format!("Process limiter closed: {}", e)))
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

/// How a bounded command ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// The process exited on its own.
    Exited(ExitStatus),
    /// The timeout elapsed and the process was killed.
    TimedOut,
    /// Output exceeded the byte cap and the process was killed.
    OutputLimit,
}

/// Captured output of a bounded command.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    pub termination: Termination,
    pub stdout: String,
    pub stderr: String,
    pub elapsed: Duration,
}

impl CommandOutput {
    /// True when the process exited with status zero.
    pub fn success(&self) -> bool {
        matches!(self.termination, Termination::Exited(status) if status.success())
    }

    /// Exit code, if the process exited on its own.
    pub fn exit_code(&self) -> Option<i32> {
        match self.termination {
            Termination::Exited(status) => status.code(),
            _ => None,
        }
    }

    /// Last `max_chars` characters of stderr, for error messages.
    pub fn stderr_tail(&self, max_chars: usize) -> String {
        let trimmed = self.stderr.trim();
        let count = trimmed.chars().count();
        if count <= max_chars {
            return trimmed.to_string();
        }
        trimmed.chars().skip(count - max_chars).collect()
    }
}

/// Builder for a subprocess run with a time bound and an output cap.
#[derive(Debug, Clone)]
pub struct BoundedCommand {
    program: String,
    args: Vec<String>,
    timeout: Duration,
    max_output_bytes: usize,
    limiter: Option<ProcessLimiter>,
}

impl BoundedCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            timeout: Duration::from_secs(60),
            max_output_bytes: 10 * 1024 * 1024,
            limiter: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Cap applied to stdout and stderr separately.
    pub fn max_output_bytes(mut self, bytes: usize) -> Self {
        self.max_output_bytes = bytes;
        self
    }

    pub fn limiter(mut self, limiter: ProcessLimiter) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Spawn the command and wait for it within the configured bounds.
    ///
    /// The timeout covers the wait for a limiter slot as well as the run itself. The
    /// permit is held until the child has been reaped.
    pub async fn run(&self) -> Result<CommandOutput> {
        let deadline = tokio::time::Instant::now() + self.timeout;

        let _permit = match &self.limiter {
            Some(limiter) => Some(
                tokio::time::timeout_at(deadline, limiter.acquire())
                    .await
                    .map_err(|_| {
                        LingoError::UpstreamTimeout(format!(
                            "No free process slot for {} within {}s",
                            self.program,
                            self.timeout.as_secs_f64()
                        ))
                    })??,
            ),
            None => None,
        };

        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(program = %self.program, args = ?self.args, "Spawning bounded command");
        let started = Instant::now();

        let mut child = command.spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                LingoError::ToolNotFound(self.program.clone())
            } else {
                LingoError::UpstreamFailure(format!("Failed to start {}: {}", self.program, e))
            }
        })?;

        let (termination, stdout, stderr) = self.drive(&mut child, deadline).await?;
        let elapsed = started.elapsed();

        match termination {
            Termination::TimedOut => warn!(
                program = %self.program,
                timeout_secs = self.timeout.as_secs_f64(),
                "Command timed out and was killed"
            ),
            Termination::OutputLimit => warn!(
                program = %self.program,
                max_bytes = self.max_output_bytes,
                "Command exceeded output cap and was killed"
            ),
            Termination::Exited(status) => debug!(
                program = %self.program,
                code = ?status.code(),
                elapsed_ms = elapsed.as_millis() as u64,
                "Command exited"
            ),
        }

        Ok(CommandOutput {
            termination,
            stdout: String::from_utf8_lossy(&stdout).into_owned(),
            stderr: String::from_utf8_lossy(&stderr).into_owned(),
            elapsed,
        })
    }

    /// Pump both pipes until EOF, the deadline or the cap, then reap the child.
    async fn drive(
        &self,
        child: &mut Child,
        deadline: tokio::time::Instant,
    ) -> Result<(Termination, Vec<u8>, Vec<u8>)> {
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| LingoError::UpstreamFailure("stdout was not captured".into()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| LingoError::UpstreamFailure("stderr was not captured".into()))?;

        let cap = self.max_output_bytes;
        let mut out_buf = Vec::new();
        let mut err_buf = Vec::new();
        let mut out_chunk = [0u8; READ_CHUNK];
        let mut err_chunk = [0u8; READ_CHUNK];
        let mut out_open = true;
        let mut err_open = true;

        let deadline = tokio::time::sleep_until(deadline);
        tokio::pin!(deadline);

        while out_open || err_open {
            tokio::select! {
                _ = &mut deadline => {
                    kill(child).await;
                    return Ok((Termination::TimedOut, out_buf, err_buf));
                }
                read = stdout.read(&mut out_chunk), if out_open => match read {
                    Ok(0) | Err(_) => out_open = false,
                    Ok(n) => {
                        if append_capped(&mut out_buf, &out_chunk[..n], cap) {
                            kill(child).await;
                            return Ok((Termination::OutputLimit, out_buf, err_buf));
                        }
                    }
                },
                read = stderr.read(&mut err_chunk), if err_open => match read {
                    Ok(0) | Err(_) => err_open = false,
                    Ok(n) => {
                        if append_capped(&mut err_buf, &err_chunk[..n], cap) {
                            kill(child).await;
                            return Ok((Termination::OutputLimit, out_buf, err_buf));
                        }
                    }
                },
            }
        }

        // Pipes are closed; the child may still be running with them detached.
        tokio::select! {
            _ = &mut deadline => {
                kill(child).await;
                Ok((Termination::TimedOut, out_buf, err_buf))
            }
            status = child.wait() => Ok((Termination::Exited(status?), out_buf, err_buf)),
        }
    }
}

/// Append `chunk` to `buf` without growing past `cap`. Returns true when the cap was hit.
fn append_capped(buf: &mut Vec<u8>, chunk: &[u8], cap: usize) -> bool {
    let room = cap.saturating_sub(buf.len());
    if chunk.len() > room {
        buf.extend_from_slice(&chunk[..room]);
        true
    } else {
        buf.extend_from_slice(chunk);
        false
    }
}

async fn kill(child: &mut Child) {
    if let Err(e) = child.kill().await {
        warn!("Failed to kill child process: {}", e);
    }
}
