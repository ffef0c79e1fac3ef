//! Get-or-create of a channel's conversation thread.

use std::sync::Arc;

use ab_assistants::AssistantsApi;
use ab_domain::error::{Error, Result};
use ab_domain::trace::TraceEvent;

use crate::mapping::{ChannelMapping, MappingStore};

/// Resolves a channel to its remote thread, creating the thread on first
/// contact.
///
/// Two concurrent first messages for the same channel can both miss the
/// lookup and each create a remote thread. Only the first mapping written
/// is kept and both callers receive it; the other remote thread is left
/// unused.
#[derive(Clone)]
pub struct ThreadStore {
    mappings: Arc<dyn MappingStore>,
    api: Arc<dyn AssistantsApi>,
}

impl ThreadStore {
    pub fn new(mappings: Arc<dyn MappingStore>, api: Arc<dyn AssistantsApi>) -> Self {
        Self { mappings, api }
    }

    /// Return the thread id for `channel_id`, creating and recording a new
    /// remote thread when the channel has none yet.
    pub async fn get_or_create(&self, channel_id: &str) -> Result<String> {
        // Fast path: mapping already exists.
        if let Some(existing) = self.mappings.get(channel_id) {
            return Ok(existing.thread_id);
        }

        // Slow path: create a remote thread and record it. The insert may
        // fsync, so it runs off the async workers.
        let thread = self.api.create_thread().await?;
        let mappings = self.mappings.clone();
        let mapping = ChannelMapping::new(channel_id, thread.id.clone());
        let stored = tokio::task::spawn_blocking(move || mappings.insert(mapping))
            .await
            .map_err(|e| Error::Store(format!("mapping insert task failed: {e}")))??;

        if stored.thread_id != thread.id {
            tracing::debug!(
                channel_id,
                kept = %stored.thread_id,
                discarded = %thread.id,
                "concurrent first message created a duplicate thread"
            );
        }

        TraceEvent::ThreadResolved {
            channel_id: channel_id.to_owned(),
            thread_id: stored.thread_id.clone(),
            is_new: true,
        }
        .emit();

        Ok(stored.thread_id)
    }

    /// The stored mapping for a channel, without touching the remote API.
    pub fn lookup(&self, channel_id: &str) -> Option<ChannelMapping> {
        self.mappings.get(channel_id)
    }

    pub fn list(&self) -> Vec<ChannelMapping> {
        self.mappings.list()
    }
}
