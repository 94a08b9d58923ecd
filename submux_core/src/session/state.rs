use std::path::PathBuf;
use std::time::Instant;

use tokio_util::sync::CancellationToken;

use crate::chat::{ChatId, FileRef, PrincipalId};
use crate::pipeline::temp::TempSet;
use crate::progress::StatusSurfaces;
use crate::session::meta::{MetaField, MetaMap};

/// Where the session's video lives: already on disk, or still a message
/// attachment to be fetched when processing starts.
#[derive(Debug, Clone)]
pub enum VideoSource {
    Local(PathBuf),
    Remote(FileRef),
}

/// The pipeline state machine. Each variant carries exactly the inputs that
/// are valid at that point; advancing a stage moves them forward.
#[derive(Debug)]
pub enum Stage {
    AwaitingVideo,
    AwaitingSubtitle {
        video: VideoSource,
    },
    AwaitingName {
        video: VideoSource,
        subtitle: PathBuf,
    },
    AwaitingThumbnail {
        video: VideoSource,
        subtitle: PathBuf,
        output_name: String,
        caption: String,
    },
    /// URL-ingest entry: the post-builder menu gathers metadata before the
    /// download replaces the usual video-arrival event.
    GatheringMeta {
        fields: MetaMap,
        awaiting: Option<MetaField>,
        /// The menu message, re-rendered after every input.
        menu: Option<crate::chat::MsgRef>,
    },
    Processing,
    Uploading,
    Done,
    Failed,
}

/// Everything the processing/upload stages need, moved out of the stage
/// machine once the last input arrives.
#[derive(Debug)]
pub struct JobSpec {
    pub video: VideoSource,
    pub subtitle: PathBuf,
    pub output_name: String,
    pub caption: String,
    pub thumbnail: Option<PathBuf>,
    /// Operator-uploaded font overriding the configured one.
    pub font: Option<PathBuf>,
    pub meta: MetaMap,
}

impl Stage {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Stage::Done | Stage::Failed)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Stage::AwaitingVideo => "awaiting-video",
            Stage::AwaitingSubtitle { .. } => "awaiting-subtitle",
            Stage::AwaitingName { .. } => "awaiting-name",
            Stage::AwaitingThumbnail { .. } => "awaiting-thumbnail",
            Stage::GatheringMeta { .. } => "gathering-meta",
            Stage::Processing => "processing",
            Stage::Uploading => "uploading",
            Stage::Done => "done",
            Stage::Failed => "failed",
        }
    }

    /// One-line hint named after the input the stage expects. Sent when an
    /// event arrives that the stage cannot use.
    pub fn expected_input(&self) -> &'static str {
        match self {
            Stage::AwaitingVideo => "Please start by sending a video file (MKV or MP4).",
            Stage::AwaitingSubtitle { .. } => {
                "Send the subtitle file (.ass/.srt/.vtt) to merge, or pick an action."
            }
            Stage::AwaitingName { .. } => {
                "Send the new name for the output file (without extension)."
            }
            Stage::AwaitingThumbnail { .. } => "Send a photo to use as the thumbnail.",
            Stage::GatheringMeta { .. } => "Pick a field on the menu, or press Create Post.",
            Stage::Processing | Stage::Uploading => {
                "A job is already running; send /cleanup to cancel it."
            }
            Stage::Done | Stage::Failed => "Session is finished; send a new video to start over.",
        }
    }
}

/// Per-principal work in progress. A principal owns at most one of these.
#[derive(Debug)]
pub struct Session {
    pub principal: PrincipalId,
    pub chat: ChatId,
    pub stage: Stage,
    /// Live status messages, present once processing has started.
    pub surfaces: Option<StatusSurfaces>,
    /// Cancels in-flight downloads and subprocesses on termination.
    pub cancel: CancellationToken,
    /// Font uploaded during this session, taking precedence over the
    /// configured asset for the mux.
    pub font_override: Option<PathBuf>,
    pub temp: TempSet,
    pub created_at: Instant,
    pub last_activity: Instant,
}

impl Session {
    pub fn new(principal: PrincipalId, chat: ChatId) -> Self {
        let now = Instant::now();
        Self {
            principal,
            chat,
            stage: Stage::AwaitingVideo,
            surfaces: None,
            cancel: CancellationToken::new(),
            font_override: None,
            temp: TempSet::new(),
            created_at: now,
            last_activity: now,
        }
    }

    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    pub fn idle_for(&self) -> std::time::Duration {
        self.last_activity.elapsed()
    }
}
