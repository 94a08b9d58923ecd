use std::time::Duration;

use crate::chat::ChatError;
use crate::download::DownloadError;
use crate::media::MediaError;

/// Failure taxonomy for a pipeline stage. Every recoverable condition is
/// handled inside the stage that produced it; what escapes to the session
/// level is one of these, rendered once on the private surface.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("media tool failed: {0}")]
    MediaTool(String),
    #[error("timed out after {0:?}")]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
    #[error("invalid {field}: {reason}")]
    Validation { field: &'static str, reason: String },
    #[error("disk error: {0}")]
    Disk(#[from] std::io::Error),
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<DownloadError> for PipelineError {
    fn from(e: DownloadError) -> Self {
        match e {
            DownloadError::NotFound(m) => PipelineError::NotFound(m),
            DownloadError::AccessDenied(m) => PipelineError::AccessDenied(m),
            DownloadError::Network(m) => PipelineError::Network(m),
            DownloadError::Cancelled => PipelineError::Cancelled,
            DownloadError::Rpc(m) | DownloadError::Unknown(m) => PipelineError::Internal(m),
        }
    }
}

impl From<MediaError> for PipelineError {
    fn from(e: MediaError) -> Self {
        match e {
            MediaError::Failed { code, stderr_tail } => PipelineError::MediaTool(format!(
                "exit code {}: {}",
                code.map(|c| c.to_string()).unwrap_or_else(|| "?".into()),
                stderr_tail
            )),
            MediaError::Timeout(d) => PipelineError::Timeout(d),
            MediaError::Cancelled => PipelineError::Cancelled,
            MediaError::Spawn(e) => PipelineError::Disk(e),
        }
    }
}

impl From<ChatError> for PipelineError {
    fn from(e: ChatError) -> Self {
        match e {
            // "not modified" is never a stage failure; callers that can hit it
            // swallow it before converting. Anything else is a network-class
            // problem with the chat platform.
            ChatError::NotModified => PipelineError::Internal("unexpected not-modified".into()),
            ChatError::FloodWait(s) => PipelineError::Network(format!("flood wait {s}s")),
            ChatError::Api(m) => PipelineError::Network(m),
            ChatError::Network(m) => PipelineError::Network(m),
            ChatError::Disk(e) => PipelineError::Disk(e),
        }
    }
}

impl PipelineError {
    /// One-line form shown to the owning principal, always prefixed so the
    /// private surface ends with a recognizable failure marker.
    pub fn user_line(&self) -> String {
        match self {
            PipelineError::Cancelled => "❌ Cancelled.".to_string(),
            other => format!("❌ {other}"),
        }
    }
}
