//! Process-wide wiring: adapters, stores, the orchestrator, the global
//! processing-mode flag, and the feed watcher's on/off handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::chat::ChatAdapter;
use crate::config::Config;
use crate::download::Aria2Client;
use crate::feed::{DedupStore, FeedSource, FeedWatcher};
use crate::media::{MediaOps, MediaRunner};
use crate::pipeline::Orchestrator;
use crate::session::SessionStore;

struct FeedHandle {
    cancel: CancellationToken,
    task: tokio::task::JoinHandle<()>,
}

pub struct App {
    pub cfg: Arc<Config>,
    pub chat: Arc<dyn ChatAdapter>,
    pub store: Arc<SessionStore>,
    pub orchestrator: Arc<Orchestrator>,
    /// Global ingestion mode; Auto extracts embedded subtitles itself.
    auto_mode: AtomicBool,
    feed_source: Option<Arc<dyn FeedSource>>,
    dedup: Arc<dyn DedupStore>,
    feed: Mutex<Option<FeedHandle>>,
}

impl App {
    pub fn new(
        cfg: Arc<Config>,
        chat: Arc<dyn ChatAdapter>,
        runner: Arc<dyn MediaRunner>,
        feed_source: Option<Arc<dyn FeedSource>>,
        dedup: Arc<dyn DedupStore>,
    ) -> Arc<Self> {
        let store = Arc::new(SessionStore::new());
        let media = MediaOps::new(runner, cfg.mux_timeout);
        let aria2 = Aria2Client::new(cfg.aria2_endpoint(), cfg.aria2_secret.clone());
        let orchestrator = Orchestrator::new(
            Arc::clone(&chat),
            media,
            aria2,
            Arc::clone(&store),
            Arc::clone(&cfg),
        );
        Arc::new(Self {
            cfg,
            chat,
            store,
            orchestrator,
            auto_mode: AtomicBool::new(true),
            feed_source,
            dedup,
            feed: Mutex::new(None),
        })
    }

    pub fn is_auto(&self) -> bool {
        self.auto_mode.load(Ordering::Relaxed)
    }

    /// Flip the process-wide mode; returns the new auto state.
    pub fn toggle_mode(&self) -> bool {
        !self.auto_mode.fetch_xor(true, Ordering::Relaxed)
    }

    /// Start the feed watcher. Returns false when it is already running or
    /// no feed is configured.
    pub async fn feed_on(&self) -> bool {
        let Some(source) = self.feed_source.clone() else {
            return false;
        };
        let mut slot = self.feed.lock().await;
        if slot.is_some() {
            return false;
        }

        let watcher = FeedWatcher::new(
            source,
            Arc::clone(&self.dedup),
            Arc::clone(&self.chat),
            self.cfg.feed_channels.clone(),
            self.cfg.feed_interval,
            self.cfg.feed_item_delay,
        );
        let cancel = CancellationToken::new();
        let task = tokio::spawn(watcher.run(cancel.clone()));
        *slot = Some(FeedHandle { cancel, task });
        true
    }

    /// Stop the feed watcher. Returns false when it was not running.
    pub async fn feed_off(&self) -> bool {
        let mut slot = self.feed.lock().await;
        match slot.take() {
            Some(handle) => {
                handle.cancel.cancel();
                // The watcher finishes its in-flight send, then exits.
                let _ = handle.task.await;
                true
            }
            None => false,
        }
    }

    pub fn feed_configured(&self) -> bool {
        self.feed_source.is_some()
    }
}
