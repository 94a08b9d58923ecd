use std::path::PathBuf;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::{categorize, Aria2Client, DownloadError};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Progress sample emitted while the daemon works on a job.
#[derive(Debug, Clone, Copy)]
pub struct DownloadProgress {
    pub completed: u64,
    pub total: u64,
    pub speed: u64,
}

/// Enqueue `url` with the daemon and poll it to completion, streaming
/// progress samples into `progress`. Resolves to the path of the fetched
/// file. Cancellation removes the job from the daemon's queue.
///
/// No retries here — the caller's failure policy decides.
pub async fn fetch(
    client: &Aria2Client,
    url: &str,
    dir: &str,
    out: &str,
    cancel: &CancellationToken,
    progress: mpsc::Sender<DownloadProgress>,
) -> Result<PathBuf, DownloadError> {
    let gid = client.add_uri(url, dir, out).await?;
    log::info!("[download] enqueued gid={gid} url={url}");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                log::info!("[download] cancelling gid={gid}");
                if let Err(e) = client.remove(&gid).await {
                    log::warn!("[download] remove gid={gid} failed: {e}");
                }
                return Err(DownloadError::Cancelled);
            }
            _ = tokio::time::sleep(POLL_INTERVAL) => {}
        }

        let status = client.tell_status(&gid).await?;
        match status.status.as_str() {
            "active" | "waiting" | "paused" => {
                // Events are best-effort; a full channel drops the sample.
                let _ = progress.try_send(DownloadProgress {
                    completed: status.completed(),
                    total: status.total(),
                    speed: status.speed(),
                });
            }
            "complete" => {
                let path = status
                    .files
                    .first()
                    .map(|f| PathBuf::from(&f.path))
                    .ok_or_else(|| DownloadError::Rpc("complete without file path".into()))?;
                log::info!("[download] complete gid={gid} path={}", path.display());
                return Ok(path);
            }
            "removed" => return Err(DownloadError::Cancelled),
            "error" => {
                let code = status.error_code.as_deref().unwrap_or("");
                let message = status.error_message.as_deref().unwrap_or("download error");
                return Err(categorize(code, message));
            }
            other => {
                return Err(DownloadError::Unknown(format!("unexpected status {other}")));
            }
        }
    }
}
