use std::sync::Arc;

use ab_assistants::AssistantsApi;
use ab_domain::error::Result;

/// Posts one user message into a thread.
pub struct MessageAppender {
    api: Arc<dyn AssistantsApi>,
}

impl MessageAppender {
    pub fn new(api: Arc<dyn AssistantsApi>) -> Self {
        Self { api }
    }

    /// Returns the id of the created message.
    pub async fn append(&self, thread_id: &str, text: &str) -> Result<String> {
        let message = self.api.create_message(thread_id, text).await?;
        tracing::debug!(thread_id, message_id = %message.id, chars = text.chars().count(), "message appended");
        Ok(message.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_assistants::fake::FakeAssistantsApi;
    use ab_assistants::Role;

    #[tokio::test]
    async fn appends_a_user_message() {
        let api = Arc::new(FakeAssistantsApi::new());
        let thread = api.create_thread().await.unwrap();

        let id = MessageAppender::new(api.clone())
            .append(&thread.id, "hi there")
            .await
            .unwrap();

        let messages = api.messages(&thread.id);
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].id, id);
        assert_eq!(messages[0].role, Role::User);
        assert_eq!(messages[0].text_segments().collect::<Vec<_>>(), ["hi there"]);
    }

    #[tokio::test]
    async fn failure_is_returned_to_the_caller() {
        let api = Arc::new(FakeAssistantsApi::new().failing_append());
        let thread = api.create_thread().await.unwrap();

        let result = MessageAppender::new(api.clone()).append(&thread.id, "hi").await;

        assert!(result.is_err());
        assert!(api.messages(&thread.id).is_empty());
    }
}
