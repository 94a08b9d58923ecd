//! Chat adapter over the Bot HTTP API: long-poll inbound updates, thin
//! wrappers for the outbound calls the core needs. Uploads and downloads
//! stream through reqwest with byte-level progress callbacks.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;

use submux_core::chat::{
    ButtonAction, ChatAdapter, ChatError, ChatId, FileRef, InboundEvent, Keyboard, MessageId,
    MsgRef, PhotoSource, ProgressFn,
};

const POLL_TIMEOUT_SECS: u64 = 30;

pub struct TelegramChat {
    http: reqwest::Client,
    base: String,
    file_base: String,
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    description: Option<String>,
    parameters: Option<RetryParams>,
}

#[derive(Deserialize)]
struct RetryParams {
    retry_after: Option<u64>,
}

#[derive(Deserialize)]
struct Update {
    update_id: i64,
    message: Option<TgMessage>,
    callback_query: Option<TgCallback>,
}

#[derive(Deserialize)]
struct TgMessage {
    message_id: i64,
    from: Option<TgUser>,
    chat: TgChat,
    text: Option<String>,
    document: Option<TgFilePayload>,
    video: Option<TgFilePayload>,
    photo: Option<Vec<TgPhotoSize>>,
}

#[derive(Deserialize)]
struct TgUser {
    id: i64,
    username: Option<String>,
}

#[derive(Deserialize)]
struct TgChat {
    id: i64,
}

#[derive(Deserialize)]
struct TgFilePayload {
    file_id: String,
    file_name: Option<String>,
    mime_type: Option<String>,
    file_size: Option<u64>,
}

#[derive(Deserialize)]
struct TgPhotoSize {
    file_id: String,
    file_size: Option<u64>,
}

#[derive(Deserialize)]
struct TgCallback {
    id: String,
    from: TgUser,
    data: Option<String>,
    message: Option<TgMessage>,
}

#[derive(Deserialize)]
struct TgFileInfo {
    file_path: Option<String>,
    file_size: Option<u64>,
}

#[derive(Deserialize)]
struct CopiedMessage {
    message_id: i64,
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

impl TelegramChat {
    pub fn new(token: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base: format!("https://api.telegram.org/bot{token}"),
            file_base: format!("https://api.telegram.org/file/bot{token}"),
        }
    }

    pub async fn get_me(&self) -> Result<String, ChatError> {
        let me: TgUser = self.call("getMe", json!({})).await?;
        me.username
            .ok_or_else(|| ChatError::Api("bot has no username".into()))
    }

    /// Long-poll for updates. Returns the mapped events plus the next offset.
    pub async fn poll_updates(&self, offset: i64) -> Result<(Vec<InboundEvent>, i64), ChatError> {
        let updates: Vec<Update> = self
            .call(
                "getUpdates",
                json!({
                    "offset": offset,
                    "timeout": POLL_TIMEOUT_SECS,
                    "allowed_updates": ["message", "callback_query"],
                }),
            )
            .await?;

        let mut next_offset = offset;
        let mut events = Vec::new();
        for update in updates {
            next_offset = next_offset.max(update.update_id + 1);
            if let Some(event) = map_update(update) {
                events.push(event);
            }
        }
        Ok((events, next_offset))
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, ChatError> {
        let url = format!("{}/{method}", self.base);
        let response = self
            .http
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;
        Self::unwrap_response(response).await
    }

    async fn unwrap_response<T: DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, ChatError> {
        let payload: ApiResponse<T> = response
            .json()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;
        if payload.ok {
            return payload
                .result
                .ok_or_else(|| ChatError::Api("ok response without result".into()));
        }

        let description = payload.description.unwrap_or_else(|| "unknown error".into());
        if description.to_lowercase().contains("message is not modified") {
            return Err(ChatError::NotModified);
        }
        if let Some(retry) = payload.parameters.and_then(|p| p.retry_after) {
            return Err(ChatError::FloodWait(retry));
        }
        Err(ChatError::Api(description))
    }

    /// Multipart file part that reports bytes as reqwest streams them out.
    async fn file_part(
        path: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<reqwest::multipart::Part, ChatError> {
        let file = tokio::fs::File::open(path).await?;
        let total = file.metadata().await?.len();
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "file".into());

        let sent = Arc::new(AtomicU64::new(0));
        let stream = ReaderStream::new(file).inspect(move |chunk| {
            if let (Ok(chunk), Some(progress)) = (chunk, progress.as_ref()) {
                let so_far = sent.fetch_add(chunk.len() as u64, Ordering::Relaxed)
                    + chunk.len() as u64;
                progress(so_far, total);
            }
        });

        Ok(
            reqwest::multipart::Part::stream_with_length(reqwest::Body::wrap_stream(stream), total)
                .file_name(file_name),
        )
    }
}

fn markup_json(markup: &Keyboard) -> Value {
    let rows: Vec<Vec<Value>> = markup
        .iter()
        .map(|row| {
            row.iter()
                .map(|b| match &b.action {
                    ButtonAction::Url(url) => json!({ "text": b.label, "url": url }),
                    ButtonAction::Callback(data) => {
                        json!({ "text": b.label, "callback_data": data })
                    }
                })
                .collect()
        })
        .collect();
    json!({ "inline_keyboard": rows })
}

fn map_update(update: Update) -> Option<InboundEvent> {
    if let Some(cb) = update.callback_query {
        let msg = cb.message?;
        return Some(InboundEvent::Callback {
            from: cb.from.id,
            chat: msg.chat.id,
            callback_id: cb.id,
            data: cb.data.unwrap_or_default(),
            msg: MsgRef {
                chat: msg.chat.id,
                id: msg.message_id,
            },
        });
    }

    let msg = update.message?;
    let from = msg.from.as_ref()?.id;
    let chat = msg.chat.id;
    let msg_ref = MsgRef {
        chat,
        id: msg.message_id,
    };

    if let Some(video) = msg.video {
        return Some(InboundEvent::Video {
            from,
            chat,
            file: file_ref(video),
            msg: msg_ref,
        });
    }
    if let Some(document) = msg.document {
        return Some(InboundEvent::Document {
            from,
            chat,
            file: file_ref(document),
            msg: msg_ref,
        });
    }
    if let Some(photo) = msg.photo {
        // Sizes come smallest-first; take the largest rendition.
        let best = photo.into_iter().last()?;
        return Some(InboundEvent::Photo {
            from,
            chat,
            file: FileRef {
                file_id: best.file_id,
                file_name: None,
                mime_type: Some("image/jpeg".into()),
                size: best.file_size,
            },
            msg: msg_ref,
        });
    }

    let text = msg.text?;
    if let Some(command) = text.strip_prefix('/') {
        let mut parts = command.splitn(2, char::is_whitespace);
        let name = parts.next()?.split('@').next()?.to_string();
        let arg = parts.next().map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        return Some(InboundEvent::Command {
            from,
            chat,
            name,
            arg,
        });
    }
    Some(InboundEvent::Text { from, chat, text })
}

fn file_ref(payload: TgFilePayload) -> FileRef {
    FileRef {
        file_id: payload.file_id,
        file_name: payload.file_name,
        mime_type: payload.mime_type,
        size: payload.file_size,
    }
}

// ---------------------------------------------------------------------------
// ChatAdapter
// ---------------------------------------------------------------------------

#[async_trait]
impl ChatAdapter for TelegramChat {
    async fn send_message(
        &self,
        chat: ChatId,
        text: &str,
        markup: Option<Keyboard>,
    ) -> Result<MsgRef, ChatError> {
        let mut body = json!({
            "chat_id": chat,
            "text": text,
            "disable_web_page_preview": true,
        });
        if let Some(markup) = &markup {
            body["reply_markup"] = markup_json(markup);
        }
        let msg: TgMessage = self.call("sendMessage", body).await?;
        Ok(MsgRef { chat, id: msg.message_id })
    }

    async fn send_photo(
        &self,
        chat: ChatId,
        photo: &PhotoSource,
        caption: &str,
        markup: Option<Keyboard>,
    ) -> Result<MsgRef, ChatError> {
        let msg: TgMessage = match photo {
            PhotoSource::Url(url) => {
                let mut body = json!({ "chat_id": chat, "photo": url, "caption": caption });
                if let Some(markup) = &markup {
                    body["reply_markup"] = markup_json(markup);
                }
                self.call("sendPhoto", body).await?
            }
            PhotoSource::Path(path) => {
                let mut form = reqwest::multipart::Form::new()
                    .text("chat_id", chat.to_string())
                    .text("caption", caption.to_string())
                    .part("photo", Self::file_part(path, None).await?);
                if let Some(markup) = &markup {
                    form = form.text("reply_markup", markup_json(markup).to_string());
                }
                let response = self
                    .http
                    .post(format!("{}/sendPhoto", self.base))
                    .multipart(form)
                    .send()
                    .await
                    .map_err(|e| ChatError::Network(e.to_string()))?;
                Self::unwrap_response(response).await?
            }
        };
        Ok(MsgRef { chat, id: msg.message_id })
    }

    async fn send_document(
        &self,
        chat: ChatId,
        path: &Path,
        caption: &str,
        thumb: Option<&Path>,
        progress: Option<ProgressFn>,
    ) -> Result<MsgRef, ChatError> {
        let mut form = reqwest::multipart::Form::new()
            .text("chat_id", chat.to_string())
            .text("caption", caption.to_string())
            .text("disable_content_type_detection", "true")
            .part("document", Self::file_part(path, progress).await?);
        if let Some(thumb) = thumb {
            form = form.part("thumbnail", Self::file_part(thumb, None).await?);
        }

        let response = self
            .http
            .post(format!("{}/sendDocument", self.base))
            .multipart(form)
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;
        let msg: TgMessage = Self::unwrap_response(response).await?;
        Ok(MsgRef { chat, id: msg.message_id })
    }

    async fn send_sticker(&self, chat: ChatId, sticker: &str) -> Result<(), ChatError> {
        let _: TgMessage = self
            .call("sendSticker", json!({ "chat_id": chat, "sticker": sticker }))
            .await?;
        Ok(())
    }

    async fn edit_message_text(
        &self,
        msg: &MsgRef,
        text: &str,
        markup: Option<Keyboard>,
    ) -> Result<(), ChatError> {
        let mut body = json!({
            "chat_id": msg.chat,
            "message_id": msg.id,
            "text": text,
        });
        if let Some(markup) = &markup {
            body["reply_markup"] = markup_json(markup);
        }
        let _: Value = self.call("editMessageText", body).await?;
        Ok(())
    }

    async fn delete_message(&self, msg: &MsgRef) -> Result<(), ChatError> {
        let _: Value = self
            .call(
                "deleteMessage",
                json!({ "chat_id": msg.chat, "message_id": msg.id }),
            )
            .await?;
        Ok(())
    }

    async fn download_media(
        &self,
        file: &FileRef,
        dest: &Path,
        progress: Option<ProgressFn>,
    ) -> Result<(), ChatError> {
        let info: TgFileInfo = self
            .call("getFile", json!({ "file_id": file.file_id }))
            .await?;
        let file_path = info
            .file_path
            .ok_or_else(|| ChatError::Api("file has no path".into()))?;
        let total = info.file_size.or(file.size).unwrap_or(0);

        let response = self
            .http
            .get(format!("{}/{file_path}", self.file_base))
            .send()
            .await
            .map_err(|e| ChatError::Network(e.to_string()))?;
        if !response.status().is_success() {
            return Err(ChatError::Api(format!(
                "file download failed: http {}",
                response.status()
            )));
        }

        let mut out = tokio::fs::File::create(dest).await?;
        let mut stream = response.bytes_stream();
        let mut current: u64 = 0;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| ChatError::Network(e.to_string()))?;
            out.write_all(&chunk).await?;
            current += chunk.len() as u64;
            if let Some(progress) = &progress {
                progress(current, total);
            }
        }
        out.flush().await?;
        Ok(())
    }

    async fn copy_message(&self, from: &MsgRef, to: ChatId) -> Result<MessageId, ChatError> {
        let copied: CopiedMessage = self
            .call(
                "copyMessage",
                json!({
                    "chat_id": to,
                    "from_chat_id": from.chat,
                    "message_id": from.id,
                }),
            )
            .await?;
        Ok(copied.message_id)
    }

    async fn answer_callback(
        &self,
        callback_id: &str,
        text: Option<&str>,
        alert: bool,
    ) -> Result<(), ChatError> {
        let mut body = json!({ "callback_query_id": callback_id, "show_alert": alert });
        if let Some(text) = text {
            body["text"] = json!(text);
        }
        let _: Value = self.call("answerCallbackQuery", body).await?;
        Ok(())
    }
}
