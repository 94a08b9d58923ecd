//! Shared fakes: an in-memory chat adapter that records every outbound call
//! and a media runner that fabricates output files instead of spawning
//! ffmpeg.
#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use submux_core::chat::{
    ChatAdapter, ChatError, ChatId, FileRef, Keyboard, MessageId, MsgRef, PhotoSource, ProgressFn,
};
use submux_core::media::{MediaError, MediaRunner, ToolOutput};

#[derive(Debug, Clone)]
pub struct SentMessage {
    pub chat: ChatId,
    pub text: String,
    pub markup: Option<Keyboard>,
    pub msg_id: MessageId,
}

#[derive(Debug, Clone)]
pub struct SentDocument {
    pub chat: ChatId,
    pub file_name: String,
    pub caption: String,
    pub bytes: Vec<u8>,
    pub msg_id: MessageId,
}

#[derive(Default)]
pub struct FakeChat {
    next_id: AtomicI64,
    pub sent: Mutex<Vec<SentMessage>>,
    pub photos: Mutex<Vec<SentMessage>>,
    pub documents: Mutex<Vec<SentDocument>>,
    pub edits: Mutex<Vec<(MsgRef, String)>>,
    pub deleted: Mutex<Vec<MsgRef>>,
    pub copied: Mutex<Vec<(MsgRef, ChatId)>>,
    pub answers: Mutex<Vec<Option<String>>>,
    /// file_id -> bytes served by `download_media`.
    pub media: Mutex<HashMap<String, Vec<u8>>>,
}

impl FakeChat {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stage_file(&self, file_id: &str, bytes: &[u8]) {
        self.media
            .lock()
            .unwrap()
            .insert(file_id.to_string(), bytes.to_vec());
    }

    fn next_msg(&self, chat: ChatId) -> MsgRef {
        MsgRef {
            chat,
            id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
        }
    }

    pub fn texts_sent_to(&self, chat: ChatId) -> Vec<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.chat == chat)
            .map(|m| m.text.clone())
            .collect()
    }

    pub fn edit_texts(&self) -> Vec<String> {
        self.edits.lock().unwrap().iter().map(|(_, t)| t.clone()).collect()
    }
}

#[async_trait]
impl ChatAdapter for FakeChat {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        markup: Option<Keyboard>,
    ) -> Result<MsgRef, ChatError> {
        let msg = self.next_msg(chat);
        self.sent.lock().unwrap().push(SentMessage {
            chat,
            text: text.to_string(),
            markup,
            msg_id: msg.id,
        });
        Ok(msg)
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        _photo: &PhotoSource,
        caption: &str,
        markup: Option<Keyboard>,
    ) -> Result<MsgRef, ChatError> {
        let msg = self.next_msg(chat);
        self.photos.lock().unwrap().push(SentMessage {
            chat,
            text: caption.to_string(),
            markup,
            msg_id: msg.id,
        });
        Ok(msg)
    }

    async fn send_document(
        &self,
        chat: ChatId,
        path: &Path,
        caption: &str,
        _thumb: Option<&Path>,
        progress: Option<ProgressFn>,
    ) -> Result<MsgRef, ChatError> {
        let bytes = std::fs::read(path)?;
        if let Some(progress) = progress {
            progress(bytes.len() as u64, bytes.len() as u64);
        }
        let msg = self.next_msg(chat);
        self.documents.lock().unwrap().push(SentDocument {
            chat,
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            caption: caption.to_string(),
            bytes,
            msg_id: msg.id,
        });
        Ok(msg)
    }

    async fn send_sticker(&self, _chat: ChatId, _sticker: &str) -> Result<(), ChatError> {
        Ok(())
    }

    async fn edit_message_text(
        &self,
        msg: &MsgRef,
        text: &str,
        _markup: Option<Keyboard>,
    ) -> Result<(), ChatError> {
        self.edits
            .lock()
            .unwrap()
            .push((msg.clone(), text.to_string()));
        Ok(())
    }

    async fn delete_message(&self, msg: &MsgRef) -> Result<(), ChatError> {
        self.deleted.lock().unwrap().push(msg.clone());
        Ok(())
    }

    async fn download_media(
        &self,
        file: &FileRef,
        dest: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<(), ChatError> {
        let bytes = self
            .media
            .lock()
            .unwrap()
            .get(&file.file_id)
            .cloned()
            .ok_or_else(|| ChatError::Api(format!("unknown file {}", file.file_id)))?;
        std::fs::write(dest, &bytes)?;
        if let Some(progress) = progress {
            progress(bytes.len() as u64, bytes.len() as u64);
        }
        Ok(())
    }

    async fn copy_message(&self, from: &MsgRef, to: ChatId) -> Result<MessageId, ChatError> {
        self.copied.lock().unwrap().push((from.clone(), to));
        Ok(self.next_msg(to).id)
    }

    async fn answer_callback(
        &self,
        _callback_id: &str,
        text: Option<&str>,
        _alert: bool,
    ) -> Result<(), ChatError> {
        self.answers
            .lock()
            .unwrap()
            .push(text.map(str::to_string));
        Ok(())
    }
}

/// Media runner that records argument vectors and writes `output_bytes` to
/// the invocation's output path (always the final argument).
pub struct FakeRunner {
    pub calls: Mutex<Vec<Vec<String>>>,
    pub output_bytes: Vec<u8>,
    pub exit_code: i32,
    pub block_until_cancel: bool,
}

impl FakeRunner {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            output_bytes: b"fake-container".to_vec(),
            exit_code: 0,
            block_until_cancel: false,
        }
    }

    pub fn blocking() -> Self {
        Self {
            block_until_cancel: true,
            ..Self::new()
        }
    }

    pub fn empty_output() -> Self {
        Self {
            output_bytes: Vec::new(),
            ..Self::new()
        }
    }

    pub fn failing() -> Self {
        Self {
            exit_code: 1,
            ..Self::new()
        }
    }
}

#[async_trait]
impl MediaRunner for FakeRunner {
    async fn run(
        &self,
        args: &[String],
        cancel: &CancellationToken,
        _timeout: Duration,
    ) -> Result<ToolOutput, MediaError> {
        self.calls.lock().unwrap().push(args.to_vec());
        if self.block_until_cancel {
            cancel.cancelled().await;
            return Err(MediaError::Cancelled);
        }
        if self.exit_code != 0 {
            return Ok(ToolOutput {
                exit_code: self.exit_code,
                stderr_tail: "Stream map '0:s:0' matches no streams.".into(),
            });
        }
        let output = args.last().expect("runner invoked with no args");
        std::fs::write(output, &self.output_bytes).map_err(MediaError::Spawn)?;
        Ok(ToolOutput {
            exit_code: 0,
            stderr_tail: String::new(),
        })
    }
}
