pub mod aria2;
pub mod fetch;

pub use aria2::{Aria2Client, JobStatus};
pub use fetch::{fetch, DownloadProgress};

/// Categorized failure from the download daemon.
#[derive(Debug, thiserror::Error)]
pub enum DownloadError {
    #[error("not found: {0}")]
    NotFound(String),
    #[error("access denied: {0}")]
    AccessDenied(String),
    #[error("network failure: {0}")]
    Network(String),
    #[error("cancelled")]
    Cancelled,
    #[error("daemon rpc error: {0}")]
    Rpc(String),
    #[error("download failed: {0}")]
    Unknown(String),
}

impl From<reqwest::Error> for DownloadError {
    fn from(e: reqwest::Error) -> Self {
        DownloadError::Network(e.to_string())
    }
}

/// Map the daemon's exit code for a failed job into the taxonomy. Codes are
/// the documented aria2 ones: 3/4 are missing resources, 24 is HTTP auth,
/// and the rest of the low numbers are transport-level.
pub(crate) fn categorize(exit_code: &str, message: &str) -> DownloadError {
    match exit_code {
        "3" | "4" => DownloadError::NotFound(message.to_string()),
        "24" => DownloadError::AccessDenied(message.to_string()),
        "1" | "2" | "5" | "6" | "19" | "22" => DownloadError::Network(message.to_string()),
        _ => DownloadError::Unknown(format!("code {exit_code}: {message}")),
    }
}
