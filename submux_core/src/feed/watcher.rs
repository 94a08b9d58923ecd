use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::chat::{ChatAdapter, ChatId, PhotoSource};
use crate::feed::source::{DedupStore, FeedEntry, FeedSource};

/// Periodically fetches the configured feed and republishes unseen entries
/// to the target channels, oldest first, pacing sends to stay clear of
/// upstream flood limits.
pub struct FeedWatcher {
    source: Arc<dyn FeedSource>,
    store: Arc<dyn DedupStore>,
    chat: Arc<dyn ChatAdapter>,
    channels: Vec<ChatId>,
    interval: Duration,
    item_delay: Duration,
}

impl FeedWatcher {
    pub fn new(
        source: Arc<dyn FeedSource>,
        store: Arc<dyn DedupStore>,
        chat: Arc<dyn ChatAdapter>,
        channels: Vec<ChatId>,
        interval: Duration,
        item_delay: Duration,
    ) -> Self {
        Self {
            source,
            store,
            chat,
            channels,
            interval,
            item_delay,
        }
    }

    /// Run until cancelled. Cancellation between entries abandons the rest
    /// of the tick; a send already in flight is never aborted.
    pub async fn run(self, cancel: CancellationToken) {
        log::info!("[feed] watcher started, interval {:?}", self.interval);
        loop {
            if let Err(e) = self.tick(&cancel).await {
                log::error!("[feed] tick failed: {e}");
            }
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(self.interval) => {}
            }
        }
        log::info!("[feed] watcher stopped");
    }

    async fn tick(&self, cancel: &CancellationToken) -> Result<(), crate::feed::FeedError> {
        let entries = self.source.fetch().await?;
        // Feeds publish newest-first; republish in arrival order.
        for entry in entries.into_iter().rev() {
            if cancel.is_cancelled() {
                return Ok(());
            }
            if self.store.exists(&entry.id).await? {
                continue;
            }

            self.publish(&entry).await;
            self.store.insert(&entry).await?;

            tokio::select! {
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(self.item_delay) => {}
            }
        }
        Ok(())
    }

    async fn publish(&self, entry: &FeedEntry) {
        let text = format!("{}\n\n{}", entry.title, entry.link);
        for channel in &self.channels {
            let sent = match &entry.thumbnail {
                Some(url) => {
                    let photo = PhotoSource::Url(url.clone());
                    match self.chat.send_photo(*channel, &photo, &text, None).await {
                        Ok(_) => Ok(()),
                        // Fall back to plain text when the image URL is bad.
                        Err(_) => self
                            .chat
                            .send_message(*channel, &text, None)
                            .await
                            .map(|_| ()),
                    }
                }
                None => self.chat.send_message(*channel, &text, None).await.map(|_| ()),
            };
            match sent {
                Ok(()) => log::info!("[feed] posted \"{}\" to {channel}", entry.title),
                Err(e) => log::error!("[feed] failed to post \"{}\" to {channel}: {e}", entry.title),
            }
        }
    }
}
