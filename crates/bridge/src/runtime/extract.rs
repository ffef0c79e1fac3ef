//! Reply extraction: the newest assistant message, text parts only.

use std::sync::Arc;

use ab_assistants::{AssistantsApi, Message, Role};
use ab_domain::error::Result;
use ab_domain::trace::TraceEvent;

/// How many of the newest messages are fetched when looking for a reply.
pub const MESSAGE_WINDOW: u32 = 20;

pub struct ResponseExtractor {
    api: Arc<dyn AssistantsApi>,
    window: u32,
}

impl ResponseExtractor {
    pub fn new(api: Arc<dyn AssistantsApi>) -> Self {
        Self {
            api,
            window: MESSAGE_WINDOW,
        }
    }

    pub fn with_window(mut self, window: u32) -> Self {
        self.window = window.max(1);
        self
    }

    /// Reply text of the most recent assistant message, if any.
    pub async fn extract(&self, thread_id: &str) -> Result<Option<String>> {
        let messages = self.api.list_messages(thread_id, self.window).await?;
        let reply = latest_assistant_reply(&messages);
        match &reply {
            Some(text) => TraceEvent::ReplyExtracted {
                thread_id: thread_id.to_owned(),
                reply_chars: text.chars().count(),
            }
            .emit(),
            None => tracing::info!(thread_id, scanned = messages.len(), "no assistant reply found"),
        }
        Ok(reply)
    }
}

/// Pick the first assistant message from a newest-first listing and join
/// its text segments with `\n`. Non-text parts are skipped. Trailing
/// whitespace is trimmed; an empty result counts as no reply.
pub fn latest_assistant_reply(newest_first: &[Message]) -> Option<String> {
    let message = newest_first.iter().find(|m| m.role == Role::Assistant)?;
    let joined = message.text_segments().collect::<Vec<_>>().join("\n");
    let trimmed = joined.trim_end();
    if trimmed.trim_start().is_empty() {
        None
    } else {
        Some(trimmed.to_owned())
    }
}
