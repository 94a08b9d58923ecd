//! Seams around the feed pipeline: the parser that produces entries and the
//! metadata store that deduplicates them are both external collaborators.

use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct FeedEntry {
    /// Stable id used for deduplication.
    pub id: String,
    pub title: String,
    pub link: String,
    pub thumbnail: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    #[error("feed fetch failed: {0}")]
    Fetch(String),
    #[error("store error: {0}")]
    Store(String),
}

/// Produces the current entry list, newest first (the order feeds publish).
#[async_trait]
pub trait FeedSource: Send + Sync + 'static {
    async fn fetch(&self) -> Result<Vec<FeedEntry>, FeedError>;
}

/// Key/value dedup store. Records are write-once; there is no eviction.
#[async_trait]
pub trait DedupStore: Send + Sync + 'static {
    async fn exists(&self, id: &str) -> Result<bool, FeedError>;
    async fn insert(&self, entry: &FeedEntry) -> Result<(), FeedError>;
}

/// In-memory dedup store. Enough for a single-process run; the durable
/// backing implementation lives outside the core.
#[derive(Default)]
pub struct MemoryDedup {
    seen: RwLock<HashSet<String>>,
}

impl MemoryDedup {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DedupStore for MemoryDedup {
    async fn exists(&self, id: &str) -> Result<bool, FeedError> {
        Ok(self.seen.read().await.contains(id))
    }

    async fn insert(&self, entry: &FeedEntry) -> Result<(), FeedError> {
        self.seen.write().await.insert(entry.id.clone());
        Ok(())
    }
}
