use std::sync::Arc;
use std::time::Instant;

use tokio::sync::Mutex;

use crate::chat::{ChatAdapter, ChatError, MsgRef};
use crate::progress::tracker::{Action, Decision, ProgressTracker, StatusSurfaces};

/// Issues rate-limited status edits to a session's private and public
/// surfaces. One tracker is attached per stage; edits within a tracker are
/// serialized, so text on the surfaces is always monotonic in sample order.
#[derive(Clone)]
pub struct ProgressReporter {
    chat: Arc<dyn ChatAdapter>,
}

impl ProgressReporter {
    pub fn new(chat: Arc<dyn ChatAdapter>) -> Self {
        Self { chat }
    }

    pub fn attach(&self, surfaces: StatusSurfaces) -> SurfaceTracker {
        SurfaceTracker {
            chat: Arc::clone(&self.chat),
            surfaces,
            tracker: Mutex::new(ProgressTracker::new(Instant::now())),
        }
    }
}

pub struct SurfaceTracker {
    chat: Arc<dyn ChatAdapter>,
    surfaces: StatusSurfaces,
    tracker: Mutex<ProgressTracker>,
}

impl SurfaceTracker {
    pub fn surfaces(&self) -> &StatusSurfaces {
        &self.surfaces
    }

    /// Offer a byte-progress sample. A no-op while inside the rate-limit
    /// window or when the rendered text has not changed.
    pub async fn report(&self, action: Action, current: u64, total: u64) {
        let now = Instant::now();
        let mut tracker = self.tracker.lock().await;
        match tracker.offer(now, action, current, total) {
            Decision::RateLimited | Decision::Unchanged => {}
            Decision::Edit(text) => {
                if self.edit_both(&text).await {
                    tracker.commit(now, text, current);
                }
            }
        }
    }

    /// Write a status line immediately, skipping only when unchanged.
    pub async fn status(&self, text: &str) {
        let now = Instant::now();
        let mut tracker = self.tracker.lock().await;
        if let Decision::Edit(text) = tracker.offer_status(text) {
            if self.edit_both(&text).await {
                tracker.commit(now, text, 0);
            }
        }
    }

    /// Render the final line on the private surface and drop or delete the
    /// public one. The stage is over; no further reports should follow.
    pub async fn detach(&self, final_text: Option<&str>, delete_public: bool) {
        if let Some(text) = final_text {
            if let Err(e) = self.chat.edit_message_text(&self.surfaces.private, text, None).await {
                if !matches!(e, ChatError::NotModified) {
                    log::info!("[progress] final edit failed: {e}");
                }
            }
        }
        if delete_public {
            if let Some(public) = &self.surfaces.public {
                if let Err(e) = self.chat.delete_message(public).await {
                    log::info!("[progress] public surface delete failed: {e}");
                }
            }
        }
    }

    /// Edit both surfaces with the same text. A failure on one surface never
    /// suppresses the other; "not modified" and flood-control errors are
    /// swallowed. Returns whether at least one surface accepted the edit.
    async fn edit_both(&self, text: &str) -> bool {
        let mut any = self.edit_one(&self.surfaces.private, text).await;
        if let Some(public) = &self.surfaces.public {
            any |= self.edit_one(public, text).await;
        }
        any
    }

    async fn edit_one(&self, msg: &MsgRef, text: &str) -> bool {
        match self.chat.edit_message_text(msg, text, None).await {
            Ok(()) => true,
            Err(ChatError::NotModified) => true,
            Err(ChatError::FloodWait(s)) => {
                log::info!("[progress] flood wait {s}s on {}:{}", msg.chat, msg.id);
                false
            }
            Err(e) => {
                log::info!("[progress] edit failed on {}:{}: {e}", msg.chat, msg.id);
                false
            }
        }
    }
}
