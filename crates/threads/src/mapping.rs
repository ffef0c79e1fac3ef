//! The mapping record and the persistence contract.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use ab_domain::error::Result;

/// One channel's conversation thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelMapping {
    pub channel_id: String,
    pub thread_id: String,
    pub created_at: DateTime<Utc>,
}

impl ChannelMapping {
    pub fn new(channel_id: impl Into<String>, thread_id: impl Into<String>) -> Self {
        Self {
            channel_id: channel_id.into(),
            thread_id: thread_id.into(),
            created_at: Utc::now(),
        }
    }
}

/// Key-value persistence for channel mappings.
///
/// `channel_id` is unique. `insert` keeps an existing mapping (first
/// writer wins) and returns whichever mapping is stored afterwards, so
/// two racing inserts for one channel agree on the survivor.
pub trait MappingStore: Send + Sync {
    fn get(&self, channel_id: &str) -> Option<ChannelMapping>;

    fn insert(&self, mapping: ChannelMapping) -> Result<ChannelMapping>;

    fn list(&self) -> Vec<ChannelMapping>;
}

/// Volatile store, for tests and throwaway CLI sessions.
#[derive(Default)]
pub struct MemoryMappingStore {
    mappings: RwLock<HashMap<String, ChannelMapping>>,
}

impl MemoryMappingStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MappingStore for MemoryMappingStore {
    fn get(&self, channel_id: &str) -> Option<ChannelMapping> {
        self.mappings.read().get(channel_id).cloned()
    }

    fn insert(&self, mapping: ChannelMapping) -> Result<ChannelMapping> {
        let mut mappings = self.mappings.write();
        Ok(mappings
            .entry(mapping.channel_id.clone())
            .or_insert(mapping)
            .clone())
    }

    fn list(&self) -> Vec<ChannelMapping> {
        self.mappings.read().values().cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_insert_wins() {
        let store = MemoryMappingStore::new();
        let first = store.insert(ChannelMapping::new("room-1", "thread_a")).unwrap();
        let second = store.insert(ChannelMapping::new("room-1", "thread_b")).unwrap();
        assert_eq!(first.thread_id, "thread_a");
        assert_eq!(second.thread_id, "thread_a");
        assert_eq!(store.list().len(), 1);
    }

    #[test]
    fn get_missing_is_none() {
        let store = MemoryMappingStore::new();
        assert!(store.get("nope").is_none());
    }
}
