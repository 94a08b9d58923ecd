//! Classifies inbound events, gates them on the owners set, validates them
//! against the session's stage, and hands work to the orchestrator. One
//! outbound reply per event; anything longer-running is spawned.

use std::sync::Arc;

use crate::app::App;
use crate::chat::{
    Button, ChatId, FileRef, InboundEvent, Keyboard, MsgRef, PrincipalId,
};
use crate::error::PipelineError;
use crate::post::PostBuilder;
use crate::router::commands::{normalize_output_name, parse_callback, Action, Command};
use crate::session::{meta, JobSpec, MetaField, MetaMap, Stage, VideoSource};

const GREETING: &str = "👋 Hi! I mux stylized subtitles into videos and publish them.\n\nSend /help to see what I can do.";
const HELP_TEXT: &str = "Available commands:\n\
/merge — start a subtitle merge session (send a video to begin)\n\
/post — build an announcement post from a direct link\n\
/ddl <url> — ingest a direct download link\n\
/mode — toggle Auto/Manual subtitle processing\n\
/cleanup — cancel your current session\n\
/logs — send the log file\n\
/ping — liveness check\n\
/on, /off — toggle the feed watcher";
const REFUSAL: &str = "⚠️ You are not authorized to use this bot.";

const VIDEO_EXTENSIONS: [&str; 2] = ["mp4", "mkv"];
const FONT_EXTENSIONS: [&str; 2] = ["ttf", "otf"];

pub struct Router {
    app: Arc<App>,
}

impl Router {
    pub fn new(app: Arc<App>) -> Self {
        Self { app }
    }

    /// Top-level entry. Nothing escapes: an uncaught error is logged with
    /// its chain and answered with a single generic line.
    pub async fn handle(&self, event: InboundEvent) {
        let principal = event.principal();
        let chat = event.chat();
        if let Err(e) = self.dispatch(event).await {
            log::error!("[router] unhandled error for {principal}: {e}");
            let _ = self
                .app
                .chat
                .send_message(chat, "❌ An unexpected error occurred. Please try again.", None)
                .await;
        }
    }

    async fn dispatch(&self, event: InboundEvent) -> Result<(), PipelineError> {
        // Share-link redemption is the one flow open to everyone.
        if let InboundEvent::Command { from, chat, name, arg } = &event {
            if let Command::Start { payload: Some(token) } = Command::parse(name, arg.as_deref()) {
                return self.redeem(*from, *chat, &token).await;
            }
        }

        let principal = event.principal();
        if !self.app.cfg.is_owner(principal) {
            if let InboundEvent::Callback { callback_id, .. } = &event {
                let _ = self
                    .app
                    .chat
                    .answer_callback(callback_id, Some(REFUSAL), true)
                    .await;
            }
            log::debug!("[router] dropping event from non-owner {principal}");
            return Ok(());
        }

        match event {
            InboundEvent::Command { from, chat, name, arg } => {
                self.on_command(from, chat, Command::parse(&name, arg.as_deref()))
                    .await
            }
            InboundEvent::Video { from, chat, file, .. } => self.on_video(from, chat, file).await,
            InboundEvent::Document { from, chat, file, .. } => {
                self.on_document(from, chat, file).await
            }
            InboundEvent::Photo { from, chat, file, .. } => self.on_photo(from, chat, file).await,
            InboundEvent::Text { from, chat, text } => self.on_text(from, chat, &text).await,
            InboundEvent::Callback { from, chat, callback_id, data, msg } => {
                self.on_callback(from, chat, &callback_id, &data, msg).await
            }
        }
    }

    async fn redeem(
        &self,
        principal: PrincipalId,
        chat: ChatId,
        token: &str,
    ) -> Result<(), PipelineError> {
        if let Err(e) = self.app.orchestrator.redeem_token(chat, token).await {
            log::info!("[router] token redemption failed for {principal}: {e}");
            self.reply(chat, "❌ Invalid or expired link.").await;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    async fn on_command(
        &self,
        principal: PrincipalId,
        chat: ChatId,
        cmd: Command,
    ) -> Result<(), PipelineError> {
        match cmd {
            Command::Start { .. } => {
                if let Some(sticker) = &self.app.cfg.sticker_id {
                    if let Err(e) = self.app.chat.send_sticker(chat, sticker).await {
                        log::debug!("[router] greeter sticker failed: {e}");
                    }
                }
                self.reply(chat, GREETING).await;
            }
            Command::Help => self.reply(chat, HELP_TEXT).await,
            Command::Ping => self.reply(chat, "Pong").await,
            Command::Merge => {
                self.reply(chat, "Send me a video file (MKV or MP4) to add subtitles.")
                    .await
            }
            Command::Post => {
                self.start_post_menu(principal, chat).await?;
            }
            Command::Ddl(url) => {
                if meta::validate(MetaField::DdlUrl, &url).is_err() {
                    self.reply(chat, "❌ Usage: /ddl <http(s) url>").await;
                    return Ok(());
                }
                self.start_ddl(principal, chat, url).await;
            }
            Command::Mode => {
                let auto = self.app.toggle_mode();
                let text = if auto {
                    "✅ Mode switched to: AUTO\n🤖 Automatic subtitle processing enabled"
                } else {
                    "✅ Mode switched to: MANUAL\n👤 Manual subtitle processing enabled"
                };
                log::info!("[router] mode switched to {} by {principal}", if auto { "auto" } else { "manual" });
                self.reply(chat, text).await;
            }
            Command::Cleanup => {
                self.app
                    .orchestrator
                    .terminate(principal, "🛑 Cancelled. Temp files removed.")
                    .await;
                self.reply(chat, "Storage has been cleared.").await;
            }
            Command::Logs => {
                if let Err(e) = self.app.orchestrator.send_logs(chat).await {
                    self.reply(chat, &format!("Error: {e}")).await;
                }
            }
            Command::FeedOn => {
                let text = if !self.app.feed_configured() {
                    "⚠️ No feed configured (set RSS_URL)."
                } else if self.app.feed_on().await {
                    "✅ Feed watcher started."
                } else {
                    "⚠️ Feed watcher is already running."
                };
                self.reply(chat, text).await;
            }
            Command::FeedOff => {
                let text = if self.app.feed_off().await {
                    "✅ Feed watcher stopped."
                } else {
                    "⚠️ Feed watcher is not running."
                };
                self.reply(chat, text).await;
            }
            Command::Unknown(name) => {
                log::debug!("[router] unknown command /{name} from {principal}");
                self.reply(chat, "Unknown command. Send /help for the list.").await;
            }
        }
        Ok(())
    }

    /// `/post` — open a fresh metadata menu, discarding any previous session.
    async fn start_post_menu(
        &self,
        principal: PrincipalId,
        chat: ChatId,
    ) -> Result<(), PipelineError> {
        let (session, old) = self.app.store.replace(principal, chat).await;
        if let Some(old) = old {
            let mut s = old.lock().await;
            s.cancel.cancel();
            s.temp.release_all();
        }

        let fields = MetaMap::new();
        let menu = self
            .app
            .chat
            .send_message(
                chat,
                "🎬 Create New Post\n\nPlease fill in the details (Title and Direct Link are required):",
                Some(post_menu(principal, &fields)),
            )
            .await?;

        let mut s = session.lock().await;
        s.stage = Stage::GatheringMeta {
            fields,
            awaiting: None,
            menu: Some(menu),
        };
        s.touch();
        Ok(())
    }

    /// `/ddl <url>` — URL ingest with defaults; the title falls out of the
    /// URL's file name.
    async fn start_ddl(&self, principal: PrincipalId, chat: ChatId, url: String) {
        let (session, old) = self.app.store.replace(principal, chat).await;
        if let Some(old) = old {
            let mut s = old.lock().await;
            s.cancel.cancel();
            s.temp.release_all();
        }
        {
            let mut s = session.lock().await;
            s.stage = Stage::Processing;
            s.touch();
        }

        let title = normalize_output_name(
            url.rsplit('/').find(|s| !s.is_empty()).unwrap_or("download"),
        );
        let mut fields = MetaMap::new();
        fields.insert(MetaField::Title, title);
        fields.insert(MetaField::DdlUrl, url);
        self.app.orchestrator.spawn_url_job(principal, chat, fields);
    }

    // -----------------------------------------------------------------------
    // Files
    // -----------------------------------------------------------------------

    async fn on_video(
        &self,
        principal: PrincipalId,
        chat: ChatId,
        file: FileRef,
    ) -> Result<(), PipelineError> {
        let session = self.app.store.get_or_create(principal, chat).await;
        let mut s = session.lock().await;
        s.touch();

        match &s.stage {
            Stage::AwaitingVideo => {
                let video = VideoSource::Remote(file);
                s.stage = Stage::AwaitingSubtitle { video: video.clone() };
                drop(s);

                log::info!("[router] video received from {principal}");
                if self.app.is_auto() {
                    self.app
                        .orchestrator
                        .spawn_auto_intake(principal, chat, video);
                } else {
                    self.app
                        .chat
                        .send_message(chat, "Choose an action:", Some(action_keyboard(principal)))
                        .await?;
                }
            }
            stage => {
                let hint = stage.expected_input();
                drop(s);
                self.reply(chat, hint).await;
            }
        }
        Ok(())
    }

    async fn on_document(
        &self,
        principal: PrincipalId,
        chat: ChatId,
        file: FileRef,
    ) -> Result<(), PipelineError> {
        let ext = extension_of(&file);

        if VIDEO_EXTENSIONS.contains(&ext.as_str()) || is_video_mime(&file) {
            return self.on_video(principal, chat, file).await;
        }
        if crate::subtitle::SUBTITLE_EXTENSIONS.contains(&ext.as_str()) {
            return self.on_subtitle(principal, chat, file, &ext).await;
        }
        if FONT_EXTENSIONS.contains(&ext.as_str()) {
            return self.on_font(principal, chat, file, &ext).await;
        }

        self.reply(chat, "Unsupported file type. Send a video, subtitle, font, or photo.")
            .await;
        Ok(())
    }

    async fn on_subtitle(
        &self,
        principal: PrincipalId,
        chat: ChatId,
        file: FileRef,
        ext: &str,
    ) -> Result<(), PipelineError> {
        let workdir = self.app.orchestrator.workdir().clone();
        let session = self.app.store.get(principal).await;

        // Inside a session that wants a subtitle: take it as the merge input.
        if let Some(session) = &session {
            let mut s = session.lock().await;
            if matches!(s.stage, Stage::AwaitingSubtitle { .. }) {
                let dest = if ext == "ass" {
                    workdir.subtitle(principal)
                } else {
                    workdir.subtitle_raw(principal, ext)
                };
                self.app.chat.download_media(&file, &dest, None).await?;
                s.temp.register(dest.clone());
                s.touch();

                match std::mem::replace(&mut s.stage, Stage::AwaitingVideo) {
                    Stage::AwaitingSubtitle { video } => {
                        s.stage = Stage::AwaitingName { video, subtitle: dest };
                    }
                    other => s.stage = other,
                }
                drop(s);

                log::info!("[router] subtitle received from {principal}");
                self.reply(
                    chat,
                    "Subtitle received! Now send the new name for the output file (without extension).",
                )
                .await;
                return Ok(());
            }
            if !matches!(s.stage, Stage::AwaitingVideo) {
                let hint = s.stage.expected_input();
                drop(s);
                self.reply(chat, hint).await;
                return Ok(());
            }
        }

        // No session wanting input: a bare .srt/.vtt gets the standalone
        // convert-and-return treatment.
        if ext == "ass" {
            self.reply(chat, Stage::AwaitingVideo.expected_input()).await;
            return Ok(());
        }

        let raw = workdir.subtitle_raw(principal, ext);
        self.app.chat.download_media(&file, &raw, None).await?;
        let orch = Arc::clone(&self.app.orchestrator);
        let chat_adapter = Arc::clone(&self.app.chat);
        tokio::spawn(async move {
            if let Err(e) = orch.convert_standalone(principal, chat, raw).await {
                log::error!("[router] standalone conversion failed: {e}");
                let _ = chat_adapter.send_message(chat, &e.user_line(), None).await;
            }
        });
        Ok(())
    }

    async fn on_font(
        &self,
        principal: PrincipalId,
        chat: ChatId,
        file: FileRef,
        ext: &str,
    ) -> Result<(), PipelineError> {
        let Some(session) = self.app.store.get(principal).await else {
            self.reply(chat, Stage::AwaitingVideo.expected_input()).await;
            return Ok(());
        };
        let mut s = session.lock().await;
        if matches!(s.stage, Stage::Processing | Stage::Uploading) {
            let hint = s.stage.expected_input();
            drop(s);
            self.reply(chat, hint).await;
            return Ok(());
        }

        let dest = self.app.orchestrator.workdir().font(principal, ext);
        self.app.chat.download_media(&file, &dest, None).await?;
        s.temp.register(dest.clone());
        s.font_override = Some(dest);
        s.touch();
        drop(s);
        self.reply(chat, "Font received! It will be attached during the merge.")
            .await;
        Ok(())
    }

    async fn on_photo(
        &self,
        principal: PrincipalId,
        chat: ChatId,
        file: FileRef,
    ) -> Result<(), PipelineError> {
        let Some(session) = self.app.store.get(principal).await else {
            self.reply(chat, Stage::AwaitingVideo.expected_input()).await;
            return Ok(());
        };
        let mut s = session.lock().await;
        s.touch();

        if !matches!(s.stage, Stage::AwaitingThumbnail { .. }) {
            let hint = s.stage.expected_input();
            drop(s);
            self.reply(chat, hint).await;
            return Ok(());
        }

        let dest = self.app.orchestrator.workdir().thumbnail(principal);
        self.app.chat.download_media(&file, &dest, None).await?;
        s.temp.register(dest.clone());

        match std::mem::replace(&mut s.stage, Stage::Processing) {
            Stage::AwaitingThumbnail { video, subtitle, output_name, caption } => {
                let mut job_meta = MetaMap::new();
                job_meta.insert(MetaField::Title, output_name.clone());
                let job = JobSpec {
                    video,
                    subtitle,
                    output_name,
                    caption,
                    thumbnail: Some(dest),
                    font: s.font_override.clone(),
                    meta: job_meta,
                };
                drop(s);
                log::info!("[router] inputs complete for {principal}, starting pipeline");
                self.app.orchestrator.spawn_merge_job(principal, chat, job);
            }
            other => s.stage = other,
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Free text
    // -----------------------------------------------------------------------

    async fn on_text(
        &self,
        principal: PrincipalId,
        chat: ChatId,
        text: &str,
    ) -> Result<(), PipelineError> {
        let Some(session) = self.app.store.get(principal).await else {
            self.reply(chat, Stage::AwaitingVideo.expected_input()).await;
            return Ok(());
        };
        let mut s = session.lock().await;
        s.touch();

        match &mut s.stage {
            Stage::AwaitingName { .. } => {
                let name = normalize_output_name(text);
                if name.is_empty() {
                    drop(s);
                    self.reply(chat, "The name cannot be empty. Send another one.").await;
                    return Ok(());
                }
                match std::mem::replace(&mut s.stage, Stage::AwaitingVideo) {
                    Stage::AwaitingName { video, subtitle } => {
                        s.stage = Stage::AwaitingThumbnail {
                            video,
                            subtitle,
                            output_name: name.clone(),
                            caption: name,
                        };
                    }
                    other => s.stage = other,
                }
                drop(s);
                self.reply(
                    chat,
                    "New name and caption received! Now send a photo to use as the thumbnail.",
                )
                .await;
            }
            Stage::GatheringMeta { fields, awaiting, menu } => {
                let Some(field) = *awaiting else {
                    drop(s);
                    self.reply(chat, "Pick a field on the menu first.").await;
                    return Ok(());
                };
                if let Err(e) = meta::validate(field, text.trim()) {
                    drop(s);
                    self.reply(chat, &e.user_line()).await;
                    return Ok(());
                }
                fields.insert(field, text.trim().to_string());
                *awaiting = None;

                let preview = menu_text(fields, self.app.cfg.short_synopsis);
                let keyboard = post_menu(principal, fields);
                let menu_ref = menu.clone();
                drop(s);

                match menu_ref {
                    Some(menu_ref) => {
                        if let Err(e) = self
                            .app
                            .chat
                            .edit_message_text(&menu_ref, &preview, Some(keyboard))
                            .await
                        {
                            log::debug!("[router] menu edit failed: {e}");
                        }
                    }
                    None => {
                        let sent = self.app.chat.send_message(chat, &preview, Some(keyboard)).await?;
                        if let Some(session) = self.app.store.get(principal).await {
                            let mut s = session.lock().await;
                            if let Stage::GatheringMeta { menu, .. } = &mut s.stage {
                                *menu = Some(sent);
                            }
                        }
                    }
                }
            }
            stage => {
                let hint = stage.expected_input();
                drop(s);
                self.reply(chat, hint).await;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Button taps
    // -----------------------------------------------------------------------

    async fn on_callback(
        &self,
        principal: PrincipalId,
        chat: ChatId,
        callback_id: &str,
        data: &str,
        msg: MsgRef,
    ) -> Result<(), PipelineError> {
        let Some(payload) = parse_callback(data) else {
            self.answer(callback_id, Some("Unrecognized action."), false).await;
            return Ok(());
        };
        if payload.principal != principal {
            self.answer(callback_id, Some(REFUSAL), true).await;
            return Ok(());
        }

        match payload.action {
            Action::Merge => {
                self.answer(callback_id, None, false).await;
                self.reply(chat, "Send the subtitle file (.ass/.srt/.vtt) to merge.").await;
            }
            Action::Extract => {
                self.answer(callback_id, None, false).await;
                let orch = Arc::clone(&self.app.orchestrator);
                let chat_adapter = Arc::clone(&self.app.chat);
                tokio::spawn(async move {
                    if let Err(e) = orch.extract_subtitles(principal, chat).await {
                        log::error!("[router] extract failed for {principal}: {e}");
                        let _ = chat_adapter.send_message(chat, &e.user_line(), None).await;
                    }
                });
            }
            Action::Screenshot => {
                self.answer(callback_id, None, false).await;
                let orch = Arc::clone(&self.app.orchestrator);
                let chat_adapter = Arc::clone(&self.app.chat);
                tokio::spawn(async move {
                    if let Err(e) = orch.screenshot(principal, chat).await {
                        log::error!("[router] screenshot failed for {principal}: {e}");
                        let _ = chat_adapter.send_message(chat, &e.user_line(), None).await;
                    }
                });
            }
            Action::SetField(field) => {
                self.set_field_prompt(principal, callback_id, field, msg).await;
            }
            Action::CreatePost => {
                self.create_post(principal, chat, callback_id, msg).await;
            }
            Action::Cancel => {
                self.answer(callback_id, None, false).await;
                self.app
                    .orchestrator
                    .terminate(principal, "❌ Cancelled.")
                    .await;
                let _ = self
                    .app
                    .chat
                    .edit_message_text(&msg, "❌ Post creation cancelled.", None)
                    .await;
            }
        }
        Ok(())
    }

    async fn set_field_prompt(
        &self,
        principal: PrincipalId,
        callback_id: &str,
        field: MetaField,
        msg: MsgRef,
    ) {
        let Some(session) = self.app.store.get(principal).await else {
            self.answer(callback_id, Some("Session expired. Start again with /post."), true)
                .await;
            return;
        };
        let mut s = session.lock().await;
        match &mut s.stage {
            Stage::GatheringMeta { awaiting, menu, .. } => {
                *awaiting = Some(field);
                *menu = Some(msg.clone());
                s.touch();
                drop(s);
                self.answer(callback_id, None, false).await;
                let _ = self
                    .app
                    .chat
                    .edit_message_text(&msg, field.prompt(), None)
                    .await;
            }
            _ => {
                drop(s);
                self.answer(callback_id, Some("Session expired. Start again with /post."), true)
                    .await;
            }
        }
    }

    async fn create_post(
        &self,
        principal: PrincipalId,
        chat: ChatId,
        callback_id: &str,
        msg: MsgRef,
    ) {
        let Some(session) = self.app.store.get(principal).await else {
            self.answer(callback_id, Some("Session expired. Start again with /post."), true)
                .await;
            return;
        };
        let mut s = session.lock().await;
        let fields = match &s.stage {
            Stage::GatheringMeta { fields, .. } => fields.clone(),
            _ => {
                drop(s);
                self.answer(callback_id, Some("Session expired. Start again with /post."), true)
                    .await;
                return;
            }
        };

        let missing = meta::missing_required(&fields);
        if !missing.is_empty() {
            let names: Vec<&str> = missing.iter().map(|f| f.key()).collect();
            drop(s);
            self.answer(
                callback_id,
                Some(&format!("Please fill in required fields: {}", names.join(", "))),
                true,
            )
            .await;
            return;
        }

        let invalid: Vec<&str> = fields
            .iter()
            .filter(|(f, v)| meta::validate(**f, v).is_err())
            .map(|(f, _)| f.key())
            .collect();
        if !invalid.is_empty() {
            drop(s);
            self.answer(
                callback_id,
                Some(&format!("Invalid format in fields: {}", invalid.join(", "))),
                true,
            )
            .await;
            return;
        }

        s.stage = Stage::Processing;
        s.touch();
        drop(s);

        self.answer(callback_id, None, false).await;
        let _ = self
            .app
            .chat
            .edit_message_text(&msg, "Starting download process...", None)
            .await;
        self.app.orchestrator.spawn_url_job(principal, chat, fields);
    }

    // -----------------------------------------------------------------------
    // Outbound helpers
    // -----------------------------------------------------------------------

    async fn reply(&self, chat: ChatId, text: &str) {
        if let Err(e) = self.app.chat.send_message(chat, text, None).await {
            log::warn!("[router] reply failed: {e}");
        }
    }

    async fn answer(&self, callback_id: &str, text: Option<&str>, alert: bool) {
        if let Err(e) = self.app.chat.answer_callback(callback_id, text, alert).await {
            log::debug!("[router] callback answer failed: {e}");
        }
    }
}

fn extension_of(file: &FileRef) -> String {
    file.file_name
        .as_deref()
        .and_then(|n| n.rsplit_once('.'))
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

fn is_video_mime(file: &FileRef) -> bool {
    file.mime_type
        .as_deref()
        .map(|m| m.starts_with("video/"))
        .unwrap_or(false)
}

fn action_keyboard(principal: PrincipalId) -> Keyboard {
    vec![
        vec![Button::callback("Merge", format!("merge_{principal}"))],
        vec![Button::callback("Extract Sub", format!("extract_{principal}"))],
        vec![Button::callback("Generate Screenshot", format!("screenshot_{principal}"))],
        vec![Button::callback("❌ Cancel", format!("cancel_{principal}"))],
    ]
}

/// The post-creation menu: filled fields get a checkmark, two fields per row.
fn post_menu(principal: PrincipalId, fields: &MetaMap) -> Keyboard {
    let mut rows: Keyboard = MetaField::MENU
        .chunks(2)
        .map(|pair| {
            pair.iter()
                .map(|f| {
                    let mark = if fields.contains_key(f) { "✅ " } else { "" };
                    Button::callback(
                        format!("{mark}{}", f.label()),
                        format!("set_{}_{principal}", f.key()),
                    )
                })
                .collect()
        })
        .collect();
    rows.push(vec![Button::callback("✅ Create Post", format!("create_post_{principal}"))]);
    rows.push(vec![Button::callback("❌ Cancel", format!("cancel_{principal}"))]);
    rows
}

fn menu_text(fields: &MetaMap, short_synopsis: bool) -> String {
    if fields.is_empty() {
        return "🎬 Create New Post\n\nPlease fill in the details (Title and Direct Link are required):"
            .to_string();
    }
    format!(
        "Preview:\n\n{}\n\nPick the next field, or press Create Post.",
        PostBuilder::new(short_synopsis).build(fields)
    )
}
