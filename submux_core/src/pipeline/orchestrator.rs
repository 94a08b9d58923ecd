//! Drives sessions through the staged pipeline: fetch, strip, normalize,
//! mux, upload, publish. Owns the cleanup protocol shared by success,
//! failure, and cancellation.

use std::path::PathBuf;
use std::sync::Arc;

use tokio::sync::{mpsc, Semaphore};
use tokio_util::sync::CancellationToken;

use crate::chat::{Button, ChatAdapter, ChatId, MsgRef, PhotoSource, PrincipalId, ProgressFn};
use crate::config::Config;
use crate::download::{self, Aria2Client};
use crate::error::PipelineError;
use crate::media::{MediaOps, MuxSpec};
use crate::pipeline::temp::WorkDir;
use crate::post::PostBuilder;
use crate::progress::{Action, ProgressReporter, StatusSurfaces, SurfaceTracker};
use crate::session::{JobSpec, MetaField, MetaMap, SessionStore, Stage, VideoSource};
use crate::subtitle;
use crate::token;

pub struct Orchestrator {
    chat: Arc<dyn ChatAdapter>,
    media: MediaOps,
    aria2: Aria2Client,
    reporter: ProgressReporter,
    store: Arc<SessionStore>,
    post: PostBuilder,
    cfg: Arc<Config>,
    workdir: WorkDir,
    /// Bounds concurrent mux/strip jobs; downloads and uploads are not gated.
    mux_gate: Arc<Semaphore>,
    /// Resolved once at startup; a missing asset logs once and is skipped.
    font: Option<PathBuf>,
    default_thumb: Option<PathBuf>,
}

impl Orchestrator {
    pub fn new(
        chat: Arc<dyn ChatAdapter>,
        media: MediaOps,
        aria2: Aria2Client,
        store: Arc<SessionStore>,
        cfg: Arc<Config>,
    ) -> Arc<Self> {
        let font = existing_asset(&cfg.font, "font");
        let default_thumb = existing_asset(&cfg.thumbnail, "thumbnail");
        Arc::new(Self {
            reporter: ProgressReporter::new(Arc::clone(&chat)),
            chat,
            media,
            aria2,
            store: Arc::clone(&store),
            post: PostBuilder::new(cfg.short_synopsis),
            workdir: WorkDir::new(cfg.workdir.clone()),
            mux_gate: Arc::new(Semaphore::new(cfg.mux_jobs.max(1))),
            font,
            default_thumb,
            cfg,
        })
    }

    pub fn workdir(&self) -> &WorkDir {
        &self.workdir
    }

    // -----------------------------------------------------------------------
    // Job entry points
    // -----------------------------------------------------------------------

    /// Run the merge pipeline for a session whose inputs are complete.
    /// Detached: failures are rendered on the session's surfaces, never
    /// returned to the event loop.
    pub fn spawn_merge_job(self: &Arc<Self>, principal: PrincipalId, chat: ChatId, job: JobSpec) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = this.merge_job(principal, chat, job).await;
            this.conclude(principal, result).await;
        });
    }

    /// Run the URL-ingest pipeline: download through the daemon, then the
    /// same upload-and-publish tail as the merge path.
    pub fn spawn_url_job(self: &Arc<Self>, principal: PrincipalId, chat: ChatId, meta: MetaMap) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let result = this.url_job(principal, chat, meta).await;
            this.conclude(principal, result).await;
        });
    }

    async fn merge_job(
        &self,
        principal: PrincipalId,
        chat: ChatId,
        mut job: JobSpec,
    ) -> Result<(), PipelineError> {
        let (tracker, cancel) = self.begin(principal, chat).await?;
        tracker.status("🎬 Initializing process...").await;

        // 1. Materialize the video locally when it is still a message.
        let video = self
            .ensure_local(principal, &mut job.video, &cancel, &tracker)
            .await?;

        // 2-4. Strip, normalize, mux — gated so parallel sessions cannot
        // oversubscribe disk and CPU.
        tracker.status("🔄 Processing video...").await;
        let output = {
            let _permit = self
                .mux_gate
                .acquire()
                .await
                .map_err(|_| PipelineError::Internal("mux gate closed".into()))?;
            check_cancel(&cancel)?;

            let stripped = self.register_temp(principal, self.workdir.stripped(principal)).await;
            self.media
                .strip_subtitle_streams(&video, &stripped, &cancel)
                .await?;

            let canonical = self.normalize_subtitle(principal, &job.subtitle, &cancel).await?;

            tracker.status("🔄 Merging subtitles...").await;
            let output = self
                .register_temp(principal, self.workdir.output(&job.output_name))
                .await;
            let spec = MuxSpec {
                video: stripped,
                subtitle: canonical,
                font: job.font.clone().or_else(|| self.font.clone()),
                track_title: self.cfg.track_title.clone(),
                output: output.clone(),
            };
            self.media.mux(&spec, &cancel).await?;
            output
        };

        // 5. Upload and publish.
        self.set_stage(principal, Stage::Uploading).await;
        let thumb = job.thumbnail.clone().or_else(|| self.default_thumb.clone());
        self.upload_and_publish(&tracker, &output, &job.caption, thumb, &job.meta, &cancel)
            .await?;

        self.finish(principal, tracker).await;
        Ok(())
    }

    /// Auto-mode intake: after a video arrives, extract its embedded
    /// subtitle in place of an operator-supplied one and move the session
    /// straight to name entry. A video without a subtitle stream fails the
    /// session.
    pub fn spawn_auto_intake(
        self: &Arc<Self>,
        principal: PrincipalId,
        chat: ChatId,
        video: VideoSource,
    ) {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut video = video;
            let result: Result<(), PipelineError> = async {
                let (tracker, cancel) = this.begin(principal, chat).await?;
                tracker.status("🤖 Auto mode: extracting embedded subtitle...").await;
                let subtitle = this
                    .auto_subtitle(principal, &mut video, &tracker, &cancel)
                    .await?;
                this.set_stage(principal, Stage::AwaitingName { video, subtitle })
                    .await;
                tracker
                    .detach(
                        Some("✅ Subtitle extracted! Now send the new name for the output file (without extension)."),
                        true,
                    )
                    .await;
                Ok(())
            }
            .await;
            this.conclude(principal, result).await;
        });
    }

    async fn url_job(
        &self,
        principal: PrincipalId,
        chat: ChatId,
        meta: MetaMap,
    ) -> Result<(), PipelineError> {
        let url = meta
            .get(&MetaField::DdlUrl)
            .cloned()
            .ok_or(PipelineError::Validation {
                field: "ddl_url",
                reason: "missing".into(),
            })?;
        let caption = meta
            .get(&MetaField::Title)
            .cloned()
            .ok_or(PipelineError::Validation {
                field: "title",
                reason: "missing".into(),
            })?;

        let (tracker, cancel) = self.begin(principal, chat).await?;
        tracker.status("⬇️ Starting download...").await;

        // Drain daemon progress samples into the reporter.
        let (tx, mut rx) = mpsc::channel::<download::DownloadProgress>(32);
        let pump_tracker = Arc::clone(&tracker);
        let pump = tokio::spawn(async move {
            while let Some(p) = rx.recv().await {
                pump_tracker
                    .report(Action::Download, p.completed, p.total)
                    .await;
            }
        });

        let fetched = download::fetch(
            &self.aria2,
            &url,
            &self.workdir.base().to_string_lossy(),
            &filename_from_url(&url),
            &cancel,
            tx,
        )
        .await;
        let _ = pump.await;
        let path = self.register_temp(principal, fetched?).await;

        self.set_stage(principal, Stage::Uploading).await;
        self.upload_and_publish(&tracker, &path, &caption, self.default_thumb.clone(), &meta, &cancel)
            .await?;

        self.finish(principal, tracker).await;
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Shared stage bodies
    // -----------------------------------------------------------------------

    /// Create the status surfaces, store them on the session, and hand back
    /// the stage tracker plus the session's cancellation token.
    async fn begin(
        &self,
        principal: PrincipalId,
        chat: ChatId,
    ) -> Result<(Arc<SurfaceTracker>, CancellationToken), PipelineError> {
        let private = self.chat.send_message(chat, "🎬 Starting...", None).await?;
        let public = match self.cfg.main_channel {
            Some(channel) => match self.chat.send_message(channel, "🎬 Starting...", None).await {
                Ok(msg) => Some(msg),
                Err(e) => {
                    log::warn!("[pipeline] no public surface for {principal}: {e}");
                    None
                }
            },
            None => None,
        };
        let surfaces = StatusSurfaces { private, public };

        let session = self.store.get_or_create(principal, chat).await;
        let cancel = {
            let mut s = session.lock().await;
            s.surfaces = Some(surfaces.clone());
            s.touch();
            s.cancel.clone()
        };
        Ok((Arc::new(self.reporter.attach(surfaces)), cancel))
    }

    /// Fetch the session's video into its temp slot when it is still a
    /// message attachment.
    pub async fn ensure_local(
        &self,
        principal: PrincipalId,
        video: &mut VideoSource,
        cancel: &CancellationToken,
        tracker: &Arc<SurfaceTracker>,
    ) -> Result<PathBuf, PipelineError> {
        match video {
            VideoSource::Local(path) => Ok(path.clone()),
            VideoSource::Remote(file) => {
                check_cancel(cancel)?;
                let dest = self.register_temp(principal, self.workdir.video(principal)).await;
                let (progress, pump) = progress_pump(Arc::clone(tracker), Action::Download);
                let result = tokio::select! {
                    r = self.chat.download_media(file, &dest, Some(progress)) => r,
                    _ = cancel.cancelled() => Err(crate::chat::ChatError::Network("cancelled".into())),
                };
                pump.abort();
                if cancel.is_cancelled() {
                    return Err(PipelineError::Cancelled);
                }
                result?;
                *video = VideoSource::Local(dest.clone());
                self.sync_session_video(principal, dest.clone()).await;
                Ok(dest)
            }
        }
    }

    /// Convert a foreign subtitle to the canonical format if needed, then
    /// rewrite its style and dialogue records in place.
    async fn normalize_subtitle(
        &self,
        principal: PrincipalId,
        path: &PathBuf,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, PipelineError> {
        let canonical = if subtitle::is_foreign(path) {
            let out = self.register_temp(principal, self.workdir.subtitle(principal)).await;
            self.media.convert_subtitle(path, &out, cancel).await?;
            out
        } else {
            path.clone()
        };
        subtitle::normalize_file(&canonical, &self.cfg.font_name).await?;
        Ok(canonical)
    }

    /// Upload the artifact to the storage channel, mint the share token, and
    /// publish the announcement post.
    async fn upload_and_publish(
        &self,
        tracker: &Arc<SurfaceTracker>,
        artifact: &PathBuf,
        caption: &str,
        thumb: Option<PathBuf>,
        meta: &MetaMap,
        cancel: &CancellationToken,
    ) -> Result<(), PipelineError> {
        check_cancel(cancel)?;

        let size = tokio::fs::metadata(artifact).await?.len();
        if size == 0 {
            return Err(PipelineError::Validation {
                field: "artifact",
                reason: "refusing to upload an empty file".into(),
            });
        }

        tracker.status("📤 Starting upload...").await;
        let (progress, pump) = progress_pump(Arc::clone(tracker), Action::Upload);
        let upload = self.chat.send_document(
            self.cfg.db_channel,
            artifact,
            caption,
            thumb.as_deref(),
            Some(progress),
        );
        let stored: MsgRef = tokio::select! {
            r = tokio::time::timeout(self.cfg.upload_timeout, upload) => match r {
                Ok(r) => r?,
                Err(_) => {
                    pump.abort();
                    return Err(PipelineError::Timeout(self.cfg.upload_timeout));
                }
            },
            _ = cancel.cancelled() => {
                pump.abort();
                return Err(PipelineError::Cancelled);
            }
        };
        pump.abort();

        let share = token::share_url(
            &self.cfg.bot_username,
            &token::mint(stored.id, self.cfg.db_channel),
        );
        log::info!("[pipeline] stored message {} -> {share}", stored.id);

        self.publish_post(meta, caption, &share).await;
        Ok(())
    }

    /// Publish the announcement with its single Download/Watch button. A
    /// bad cover image falls back to a plain text post; a missing main
    /// channel skips publishing entirely.
    async fn publish_post(&self, meta: &MetaMap, fallback_title: &str, share_url: &str) {
        let Some(channel) = self.cfg.main_channel else {
            return;
        };

        let mut meta = meta.clone();
        meta.entry(MetaField::Title)
            .or_insert_with(|| fallback_title.to_string());
        let body = self.post.build(&meta);
        let markup = vec![vec![Button::url("• Download / Watch •", share_url)]];

        let sent = match self.post.cover_url(&meta) {
            Some(url) => {
                let photo = PhotoSource::Url(url.to_string());
                match self
                    .chat
                    .send_photo(channel, &photo, &body, Some(markup.clone()))
                    .await
                {
                    Ok(_) => Ok(()),
                    Err(e) => {
                        log::warn!("[pipeline] photo post failed, falling back to text: {e}");
                        self.chat.send_message(channel, &body, Some(markup)).await.map(|_| ())
                    }
                }
            }
            None => self.chat.send_message(channel, &body, Some(markup)).await.map(|_| ()),
        };
        if let Err(e) = sent {
            log::error!("[pipeline] failed to publish post: {e}");
        }
    }

    // -----------------------------------------------------------------------
    // Terminal paths — one cleanup protocol for success, failure, cancel
    // -----------------------------------------------------------------------

    /// Success: final line on the private surface, public surface deleted,
    /// session removed and temp files released.
    async fn finish(&self, principal: PrincipalId, tracker: Arc<SurfaceTracker>) {
        self.set_stage(principal, Stage::Done).await;
        tracker
            .detach(Some("✅ Process completed successfully!"), true)
            .await;
        self.remove_and_release(principal).await;
    }

    /// Failure tail of a spawned job. Cancellation is quiet here — the
    /// terminate path already rendered the final line.
    async fn conclude(&self, principal: PrincipalId, result: Result<(), PipelineError>) {
        let Err(e) = result else { return };
        match e {
            PipelineError::Cancelled => {
                self.remove_and_release(principal).await;
            }
            e => {
                log::error!("[pipeline] session {principal} failed: {e}");
                self.set_stage(principal, Stage::Failed).await;
                let surfaces = {
                    match self.store.get(principal).await {
                        Some(session) => session.lock().await.surfaces.clone(),
                        None => None,
                    }
                };
                if let Some(surfaces) = surfaces {
                    let _ = self
                        .chat
                        .edit_message_text(&surfaces.private, &e.user_line(), None)
                        .await;
                    if let Some(public) = &surfaces.public {
                        let _ = self.chat.delete_message(public).await;
                    }
                }
                self.remove_and_release(principal).await;
            }
        }
    }

    /// The shared termination path: cancel in-flight work, drop the record,
    /// release temp files, and close out the surfaces. Idempotent — a
    /// second call finds nothing and does nothing.
    pub async fn terminate(&self, principal: PrincipalId, final_line: &str) -> bool {
        let Some(session) = self.store.remove(principal).await else {
            return false;
        };
        let mut s = session.lock().await;
        s.cancel.cancel();
        s.temp.release_all();
        if let Some(surfaces) = s.surfaces.take() {
            if let Err(e) = self
                .chat
                .edit_message_text(&surfaces.private, final_line, None)
                .await
            {
                log::debug!("[pipeline] final edit on terminate: {e}");
            }
            if let Some(public) = &surfaces.public {
                let _ = self.chat.delete_message(public).await;
            }
        }
        let stage = s.stage.name();
        s.stage = Stage::Failed;
        log::info!("[pipeline] terminated session {principal} (was {stage})");
        true
    }

    async fn remove_and_release(&self, principal: PrincipalId) {
        if let Some(session) = self.store.remove(principal).await {
            let mut s = session.lock().await;
            s.temp.release_all();
        }
    }

    // -----------------------------------------------------------------------
    // Session-scoped operations outside the main pipeline
    // -----------------------------------------------------------------------

    /// Extract the first subtitle stream of the session's video and send
    /// both the raw and converted forms back. The session stays where it is.
    pub async fn extract_subtitles(
        self: &Arc<Self>,
        principal: PrincipalId,
        chat: ChatId,
    ) -> Result<(), PipelineError> {
        let (mut video, cancel) = self.session_video(principal).await?;
        let status = self.chat.send_message(chat, "Extracting subtitles...", None).await?;
        let tracker = Arc::new(self.reporter.attach(StatusSurfaces {
            private: status,
            public: None,
        }));

        let local = self.ensure_local(principal, &mut video, &cancel, &tracker).await?;
        let srt = self
            .register_temp(principal, self.workdir.subtitle_raw(principal, "srt"))
            .await;
        self.media.extract_subtitle_stream(&local, &srt, &cancel).await?;

        let ass = self.register_temp(principal, self.workdir.subtitle(principal)).await;
        self.media.convert_subtitle(&srt, &ass, &cancel).await?;

        self.chat
            .send_document(chat, &srt, "📄 Extracted SRT Subtitle", None, None)
            .await?;
        self.chat
            .send_document(chat, &ass, "📄 Converted ASS Subtitle", None, None)
            .await?;
        tracker
            .detach(Some("✅ Subtitles extracted successfully!"), false)
            .await;
        Ok(())
    }

    /// Capture a still from the session's video and send it as a photo.
    pub async fn screenshot(
        self: &Arc<Self>,
        principal: PrincipalId,
        chat: ChatId,
    ) -> Result<(), PipelineError> {
        let (mut video, cancel) = self.session_video(principal).await?;
        let status = self.chat.send_message(chat, "Generating screenshot...", None).await?;
        let tracker = Arc::new(self.reporter.attach(StatusSurfaces {
            private: status,
            public: None,
        }));

        let local = self.ensure_local(principal, &mut video, &cancel, &tracker).await?;
        let shot = self.register_temp(principal, self.workdir.still(principal)).await;
        self.media
            .capture_still(&local, &shot, &self.cfg.still_timecode, &cancel)
            .await?;

        self.chat
            .send_photo(chat, &PhotoSource::Path(shot), "Here is the screenshot.", None)
            .await?;
        tracker
            .detach(Some("✅ Screenshot generated and uploaded!"), false)
            .await;
        Ok(())
    }

    /// Auto mode: pull the embedded subtitle out of the just-arrived video
    /// and normalize it. A video with no subtitle stream fails the session.
    pub async fn auto_subtitle(
        self: &Arc<Self>,
        principal: PrincipalId,
        video: &mut VideoSource,
        tracker: &Arc<SurfaceTracker>,
        cancel: &CancellationToken,
    ) -> Result<PathBuf, PipelineError> {
        let local = self.ensure_local(principal, video, cancel, tracker).await?;
        let srt = self
            .register_temp(principal, self.workdir.subtitle_raw(principal, "srt"))
            .await;
        self.media
            .extract_subtitle_stream(&local, &srt, cancel)
            .await
            .map_err(|e| match e {
                crate::media::MediaError::Failed { .. } => {
                    PipelineError::NotFound("video has no subtitle stream".into())
                }
                other => other.into(),
            })?;
        self.normalize_subtitle(principal, &srt, cancel).await
    }

    /// Standalone conversion of a bare `.srt`/`.vtt` upload, outside any
    /// session: convert, normalize, send back.
    pub async fn convert_standalone(
        &self,
        principal: PrincipalId,
        chat: ChatId,
        raw: PathBuf,
    ) -> Result<(), PipelineError> {
        let mut temp = crate::pipeline::temp::TempSet::new();
        temp.register(raw.clone());
        let out = temp.register(self.workdir.subtitle(principal));

        let cancel = CancellationToken::new();
        self.media.convert_subtitle(&raw, &out, &cancel).await?;
        subtitle::normalize_file(&out, &self.cfg.font_name).await?;
        self.chat
            .send_document(
                chat,
                &out,
                "Here is the converted and modified subtitle file.",
                None,
                None,
            )
            .await?;
        Ok(())
    }

    /// Send the configured log file back to the operator.
    pub async fn send_logs(&self, chat: ChatId) -> Result<(), PipelineError> {
        match &self.cfg.log_file {
            Some(path) if path.exists() => {
                self.chat
                    .send_document(chat, path, "log file by submux", None, None)
                    .await?;
                Ok(())
            }
            _ => Err(PipelineError::NotFound("no log file configured".into())),
        }
    }

    /// Deliver a stored message to whoever presented a valid share token.
    pub async fn redeem_token(&self, chat: ChatId, raw_token: &str) -> Result<(), PipelineError> {
        let message_id = token::decode(raw_token, self.cfg.db_channel)
            .map_err(|e| PipelineError::Validation {
                field: "token",
                reason: e.to_string(),
            })?;
        let from = MsgRef {
            chat: self.cfg.db_channel,
            id: message_id,
        };
        self.chat.copy_message(&from, chat).await?;
        Ok(())
    }

    /// Background reaper: terminates sessions idle past the horizon.
    pub fn spawn_reaper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let this = Arc::clone(self);
        tokio::spawn(async move {
            let mut tick = tokio::time::interval(this.cfg.reap_interval);
            tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tick.tick().await;
                for principal in this.store.idle_principals(this.cfg.idle_horizon).await {
                    log::info!("[reaper] expiring idle session {principal}");
                    this.terminate(principal, "🛑 Session expired after inactivity.")
                        .await;
                }
            }
        })
    }

    // -----------------------------------------------------------------------
    // Small helpers
    // -----------------------------------------------------------------------

    async fn set_stage(&self, principal: PrincipalId, stage: Stage) {
        if let Some(session) = self.store.get(principal).await {
            let mut s = session.lock().await;
            s.stage = stage;
            s.touch();
        }
    }

    async fn register_temp(&self, principal: PrincipalId, path: PathBuf) -> PathBuf {
        if let Some(session) = self.store.get(principal).await {
            session.lock().await.temp.register(path.clone());
        }
        path
    }

    async fn sync_session_video(&self, principal: PrincipalId, path: PathBuf) {
        if let Some(session) = self.store.get(principal).await {
            let mut s = session.lock().await;
            if let Stage::AwaitingSubtitle { video }
            | Stage::AwaitingName { video, .. }
            | Stage::AwaitingThumbnail { video, .. } = &mut s.stage
            {
                *video = VideoSource::Local(path);
            }
        }
    }

    async fn session_video(
        &self,
        principal: PrincipalId,
    ) -> Result<(VideoSource, CancellationToken), PipelineError> {
        let session = self
            .store
            .get(principal)
            .await
            .ok_or_else(|| PipelineError::NotFound("no active session".into()))?;
        let s = session.lock().await;
        let video = match &s.stage {
            Stage::AwaitingSubtitle { video }
            | Stage::AwaitingName { video, .. }
            | Stage::AwaitingThumbnail { video, .. } => video.clone(),
            _ => {
                return Err(PipelineError::NotFound(
                    "session has no video yet".into(),
                ))
            }
        };
        Ok((video, s.cancel.clone()))
    }
}

fn check_cancel(cancel: &CancellationToken) -> Result<(), PipelineError> {
    if cancel.is_cancelled() {
        Err(PipelineError::Cancelled)
    } else {
        Ok(())
    }
}

fn existing_asset(path: &PathBuf, what: &str) -> Option<PathBuf> {
    if path.exists() {
        Some(path.clone())
    } else {
        log::warn!("[pipeline] configured {what} {} is missing, continuing without it", path.display());
        None
    }
}

/// Bridge the chat adapter's synchronous byte callback into async reporter
/// calls without ever blocking the pump.
fn progress_pump(
    tracker: Arc<SurfaceTracker>,
    action: Action,
) -> (ProgressFn, tokio::task::JoinHandle<()>) {
    let (tx, mut rx) = mpsc::channel::<(u64, u64)>(32);
    let handle = tokio::spawn(async move {
        while let Some((current, total)) = rx.recv().await {
            tracker.report(action, current, total).await;
        }
    });
    let f: ProgressFn = Arc::new(move |current, total| {
        let _ = tx.try_send((current, total));
    });
    (f, handle)
}

/// Last path segment of a URL, as the daemon's output name.
fn filename_from_url(url: &str) -> String {
    let path = url.split(['?', '#']).next().unwrap_or(url);
    let name = path.rsplit('/').next().unwrap_or("");
    if name.is_empty() || name.contains(':') {
        "download.bin".to_string()
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn filename_from_url_takes_last_segment() {
        assert_eq!(filename_from_url("https://example.com/a/f.mkv"), "f.mkv");
        assert_eq!(filename_from_url("https://example.com/a/f.mkv?x=1"), "f.mkv");
        assert_eq!(filename_from_url("https://example.com/"), "download.bin");
    }
}
