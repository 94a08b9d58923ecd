pub mod source;
pub mod watcher;

pub use source::{DedupStore, FeedEntry, FeedError, FeedSource, MemoryDedup};
pub use watcher::FeedWatcher;
