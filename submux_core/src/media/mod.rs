pub mod ops;
pub mod runner;

pub use ops::{MediaOps, MuxSpec};
pub use runner::{FfmpegRunner, MediaRunner, ToolOutput};

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("media tool exited with {code:?}: {stderr_tail}")]
    Failed {
        code: Option<i32>,
        stderr_tail: String,
    },
    #[error("media tool timed out after {0:?}")]
    Timeout(Duration),
    #[error("cancelled")]
    Cancelled,
    #[error("failed to run media tool: {0}")]
    Spawn(#[from] std::io::Error),
}
