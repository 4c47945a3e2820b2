//! Subprocess execution with interrupt-then-kill timeout handling.
//!
//! Scan tools are given a chance to flush partial state: on timeout the
//! process first receives an interrupt, and only if it ignores that for the
//! whole grace period is it forcibly killed.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::time::timeout;

/// Captured streams and exit information of a finished subprocess.
#[derive(Debug)]
pub(crate) struct CapturedOutput {
    /// Everything the process wrote to stdout, lossily decoded.
    pub(crate) stdout: String,
    /// Everything the process wrote to stderr, lossily decoded.
    pub(crate) stderr: String,
    /// Exit status, if the process could still be reaped.
    pub(crate) status: Option<std::process::ExitStatus>,
    /// Whether the time limit expired before the process finished.
    pub(crate) timed_out: bool,
}

impl CapturedOutput {
    /// Formats both streams for a diagnostic report file.
    pub(crate) fn combined(&self) -> String {
        format!("stderr:\n{}\nstdout:\n{}", self.stderr, self.stdout)
    }
}

/// Runs `command` to completion under a hard wall-clock limit.
///
/// Both output streams are drained concurrently so a chatty process can
/// never block on a full pipe. When `time_limit` expires the process is
/// interrupted (SIGINT on unix) and awaited for `grace_period`; a process
/// that ignores the interrupt is killed outright.
///
/// # Errors
///
/// Only spawn failures surface as `Err`; everything after a successful
/// spawn is reported through [`CapturedOutput`].
pub(crate) async fn run_with_interrupt(
    mut command: Command,
    time_limit: Duration,
    grace_period: Duration,
) -> std::io::Result<CapturedOutput> {
    command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn()?;
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_task = tokio::spawn(read_stream(stdout));
    let stderr_task = tokio::spawn(read_stream(stderr));

    let mut timed_out = false;
    let status = match timeout(time_limit, child.wait()).await {
        Ok(status) => Some(status?),
        Err(_) => {
            timed_out = true;
            interrupt(&mut child);
            match timeout(grace_period, child.wait()).await {
                Ok(status) => Some(status?),
                Err(_) => {
                    // The process ignored the interrupt for the whole grace
                    // period; take it down and reap it.
                    let _ = child.start_kill();
                    child.wait().await.ok()
                }
            }
        }
    };

    let stdout = stdout_task.await.unwrap_or_default();
    let stderr = stderr_task.await.unwrap_or_default();
    Ok(CapturedOutput {
        stdout,
        stderr,
        status,
        timed_out,
    })
}

async fn read_stream<R>(reader: Option<R>) -> String
where
    R: tokio::io::AsyncRead + Unpin,
{
    let Some(mut reader) = reader else {
        return String::new();
    };
    let mut buf = Vec::new();
    let _ = reader.read_to_end(&mut buf).await;
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(unix)]
fn interrupt(child: &mut Child) {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    if let Some(pid) = child.id() {
        if let Err(err) = kill(Pid::from_raw(pid as i32), Signal::SIGINT) {
            tracing::warn!(pid, error = %err, "failed to interrupt scan process");
        }
    }
}

#[cfg(not(unix))]
fn interrupt(child: &mut Child) {
    // No SIGINT equivalent; fall back to an immediate kill.
    let _ = child.start_kill();
}
