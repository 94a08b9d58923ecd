mod common;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use common::FakeChat;
use submux_core::feed::{DedupStore, FeedEntry, FeedError, FeedSource, FeedWatcher, MemoryDedup};

const CHANNEL: i64 = -100555;

struct StubSource {
    entries: Vec<FeedEntry>,
}

#[async_trait]
impl FeedSource for StubSource {
    async fn fetch(&self) -> Result<Vec<FeedEntry>, FeedError> {
        Ok(self.entries.clone())
    }
}

fn entry(id: &str, title: &str, thumbnail: Option<&str>) -> FeedEntry {
    FeedEntry {
        id: id.into(),
        title: title.into(),
        link: format!("https://example.com/{id}"),
        thumbnail: thumbnail.map(str::to_string),
    }
}

#[tokio::test(flavor = "multi_thread")]
async fn entries_publish_once_oldest_first() {
    let chat = Arc::new(FakeChat::new());
    let store = Arc::new(MemoryDedup::new());
    // Feed order is newest-first; ep1 is the oldest entry.
    let source = Arc::new(StubSource {
        entries: vec![entry("ep2", "Episode 2", None), entry("ep1", "Episode 1", None)],
    });

    let watcher = FeedWatcher::new(
        source,
        store.clone(),
        chat.clone(),
        vec![CHANNEL],
        Duration::from_millis(100),
        Duration::from_millis(10),
    );

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watcher.run(cancel.clone()));

    // Let several ticks pass; dedup must keep each entry to a single post.
    tokio::time::sleep(Duration::from_millis(450)).await;
    cancel.cancel();
    let _ = handle.await;

    let texts = chat.texts_sent_to(CHANNEL);
    assert_eq!(texts.len(), 2, "each entry posts exactly once: {texts:?}");
    assert!(texts[0].starts_with("Episode 1"));
    assert!(texts[1].starts_with("Episode 2"));
    assert!(store.exists("ep1").await.unwrap());
    assert!(store.exists("ep2").await.unwrap());
}

#[tokio::test(flavor = "multi_thread")]
async fn thumbnailed_entries_go_out_as_photos() {
    let chat = Arc::new(FakeChat::new());
    let source = Arc::new(StubSource {
        entries: vec![entry("ep1", "Episode 1", Some("https://example.com/t.jpg"))],
    });

    let watcher = FeedWatcher::new(
        source,
        Arc::new(MemoryDedup::new()),
        chat.clone(),
        vec![CHANNEL],
        Duration::from_millis(100),
        Duration::from_millis(10),
    );

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watcher.run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(150)).await;
    cancel.cancel();
    let _ = handle.await;

    let photos = chat.photos.lock().unwrap();
    assert_eq!(photos.len(), 1);
    assert!(photos[0].text.starts_with("Episode 1"));
    assert!(chat.sent.lock().unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn cancelling_mid_tick_abandons_remaining_entries() {
    let chat = Arc::new(FakeChat::new());
    let entries: Vec<FeedEntry> = (0..20)
        .map(|i| entry(&format!("ep{i}"), &format!("Episode {i}"), None))
        .collect();
    let source = Arc::new(StubSource { entries });

    let watcher = FeedWatcher::new(
        source,
        Arc::new(MemoryDedup::new()),
        chat.clone(),
        vec![CHANNEL],
        Duration::from_secs(60),
        Duration::from_millis(50),
    );

    let cancel = CancellationToken::new();
    let handle = tokio::spawn(watcher.run(cancel.clone()));
    tokio::time::sleep(Duration::from_millis(120)).await;
    cancel.cancel();
    let _ = handle.await;

    let posted = chat.texts_sent_to(CHANNEL).len();
    assert!(posted >= 1, "at least the first entry goes out");
    assert!(posted < 20, "cancellation stops the rest of the tick");
}
