//! Supervised invocations of the external media binary. Each call spawns a
//! child, drains its stderr (a blocked pipe would deadlock the tool), and
//! tears it down signal-then-kill on cancellation or timeout.

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;

use super::MediaError;

/// Kept tail of the child's stderr, surfaced in failure messages.
const STDERR_TAIL_BYTES: usize = 4 * 1024;

/// Grace between the terminate signal and the hard kill.
const KILL_GRACE: Duration = Duration::from_secs(5);

#[derive(Debug)]
pub struct ToolOutput {
    pub exit_code: i32,
    pub stderr_tail: String,
}

#[async_trait]
pub trait MediaRunner: Send + Sync + 'static {
    /// Run the tool with `args` to completion, under the given deadline.
    async fn run(
        &self,
        args: &[String],
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> Result<ToolOutput, MediaError>;
}

/// Runs the configured binary (`ffmpeg` by default) as a child process.
pub struct FfmpegRunner {
    binary: String,
}

impl FfmpegRunner {
    pub fn new(binary: impl Into<String>) -> Self {
        Self { binary: binary.into() }
    }
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

#[async_trait]
impl MediaRunner for FfmpegRunner {
    async fn run(
        &self,
        args: &[String],
        cancel: &CancellationToken,
        timeout: Duration,
    ) -> Result<ToolOutput, MediaError> {
        log::info!("[media] {} {}", self.binary, args.join(" "));

        let mut child = Command::new(&self.binary)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        // Drain stderr into a bounded tail while the child runs.
        let stderr = child.stderr.take();
        let drain = tokio::spawn(async move {
            let mut tail: Vec<u8> = Vec::new();
            if let Some(mut stderr) = stderr {
                let mut buf = [0u8; 4096];
                while let Ok(n) = stderr.read(&mut buf).await {
                    if n == 0 {
                        break;
                    }
                    tail.extend_from_slice(&buf[..n]);
                    if tail.len() > STDERR_TAIL_BYTES {
                        let cut = tail.len() - STDERR_TAIL_BYTES;
                        tail.drain(..cut);
                    }
                }
            }
            String::from_utf8_lossy(&tail).into_owned()
        });

        let status = tokio::select! {
            status = child.wait() => status?,
            _ = cancel.cancelled() => {
                terminate(&mut child).await;
                drain.abort();
                return Err(MediaError::Cancelled);
            }
            _ = tokio::time::sleep(timeout) => {
                terminate(&mut child).await;
                drain.abort();
                return Err(MediaError::Timeout(timeout));
            }
        };

        let stderr_tail = drain.await.unwrap_or_default();
        Ok(ToolOutput {
            exit_code: status.code().unwrap_or(-1),
            stderr_tail,
        })
    }
}

/// Signal-then-kill teardown: ask politely first, reap within the grace
/// interval, then force.
async fn terminate(child: &mut Child) {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;
        let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_ok() {
            return;
        }
        log::warn!("[media] child {pid} ignored SIGTERM, killing");
    }

    if let Err(e) = child.kill().await {
        log::warn!("[media] kill failed: {e}");
    }
}
