//! Seam to the chat platform. The RPC client itself lives outside the core;
//! everything here is the minimal surface the pipeline needs from it.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;

pub type ChatId = i64;
pub type MessageId = i64;
pub type PrincipalId = i64;

/// Handle to an existing message, enough to edit, delete, or copy it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MsgRef {
    pub chat: ChatId,
    pub id: MessageId,
}

/// Handle to a file attached to an inbound message, enough to fetch it later.
#[derive(Debug, Clone)]
pub struct FileRef {
    pub file_id: String,
    pub file_name: Option<String>,
    pub mime_type: Option<String>,
    pub size: Option<u64>,
}

#[derive(Debug, Clone)]
pub enum PhotoSource {
    Url(String),
    Path(PathBuf),
}

#[derive(Debug, Clone)]
pub struct Button {
    pub label: String,
    pub action: ButtonAction,
}

#[derive(Debug, Clone)]
pub enum ButtonAction {
    Url(String),
    Callback(String),
}

impl Button {
    pub fn url(label: impl Into<String>, url: impl Into<String>) -> Self {
        Self { label: label.into(), action: ButtonAction::Url(url.into()) }
    }

    pub fn callback(label: impl Into<String>, data: impl Into<String>) -> Self {
        Self { label: label.into(), action: ButtonAction::Callback(data.into()) }
    }
}

/// Rows of inline buttons.
pub type Keyboard = Vec<Vec<Button>>;

/// Byte-level progress callback: `(current, total)`.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Edit carried no change; callers treat this as success.
    #[error("message is not modified")]
    NotModified,
    #[error("rate limited, retry after {0}s")]
    FloodWait(u64),
    #[error("chat api error: {0}")]
    Api(String),
    #[error("network error: {0}")]
    Network(String),
    #[error("disk error: {0}")]
    Disk(#[from] std::io::Error),
}

/// Outbound operations against the chat platform.
#[async_trait]
pub trait ChatAdapter: Send + Sync + 'static {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        markup: Option<Keyboard>,
    ) -> Result<MsgRef, ChatError>;

    async fn send_photo(
        &self,
        chat: ChatId,
        photo: &PhotoSource,
        caption: &str,
        markup: Option<Keyboard>,
    ) -> Result<MsgRef, ChatError>;

    /// Forced-document upload with optional thumbnail and upload progress.
    async fn send_document(
        &self,
        chat: ChatId,
        path: &Path,
        caption: &str,
        thumb: Option<&Path>,
        progress: Option<ProgressFn>,
    ) -> Result<MsgRef, ChatError>;

    async fn send_sticker(&self, chat: ChatId, sticker: &str) -> Result<(), ChatError>;

    async fn edit_message_text(
        &self,
        msg: &MsgRef,
        text: &str,
        markup: Option<Keyboard>,
    ) -> Result<(), ChatError>;

    async fn delete_message(&self, msg: &MsgRef) -> Result<(), ChatError>;

    /// Fetch an inbound file into `dest`, reporting byte progress.
    async fn download_media(
        &self,
        file: &FileRef,
        dest: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<(), ChatError>;

    /// Copy a stored message into another chat, returning the new message id.
    async fn copy_message(&self, from: &MsgRef, to: ChatId) -> Result<MessageId, ChatError>;

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), ChatError>;
}

/// Inbound event as delivered by the platform client, before routing.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    Command {
        from: PrincipalId,
        chat: ChatId,
        name: String,
        arg: Option<String>,
    },
    Document {
        from: PrincipalId,
        chat: ChatId,
        file: FileRef,
        msg: MsgRef,
    },
    Video {
        from: PrincipalId,
        chat: ChatId,
        file: FileRef,
        msg: MsgRef,
    },
    Photo {
        from: PrincipalId,
        chat: ChatId,
        file: FileRef,
        msg: MsgRef,
    },
    Text {
        from: PrincipalId,
        chat: ChatId,
        text: String,
    },
    Callback {
        from: PrincipalId,
        chat: ChatId,
        callback_id: String,
        data: String,
        msg: MsgRef,
    },
}

impl InboundEvent {
    pub fn principal(&self) -> PrincipalId {
        match self {
            InboundEvent::Command { from, .. }
            | InboundEvent::Document { from, .. }
            | InboundEvent::Video { from, .. }
            | InboundEvent::Photo { from, .. }
            | InboundEvent::Text { from, .. }
            | InboundEvent::Callback { from, .. } => *from,
        }
    }

    pub fn chat(&self) -> ChatId {
        match self {
            InboundEvent::Command { chat, .. }
            | InboundEvent::Document { chat, .. }
            | InboundEvent::Video { chat, .. }
            | InboundEvent::Photo { chat, .. }
            | InboundEvent::Text { chat, .. }
            | InboundEvent::Callback { chat, .. } => *chat,
        }
    }
}
