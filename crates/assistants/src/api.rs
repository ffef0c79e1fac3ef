//! The `AssistantsApi` trait defines the remote operations the bridge
//! consumes. Implemented by the REST client and by the test fake.

use async_trait::async_trait;
use ab_domain::error::Result;

use crate::types::{Assistant, CreateAssistantRequest, Message, Run, Thread};

/// Abstraction over the hosted assistants API surface.
///
/// All methods return `ab_domain::error::Result`; HTTP status failures
/// surface as [`ab_domain::error::Error::Api`] or
/// [`ab_domain::error::Error::Auth`].
#[async_trait]
pub trait AssistantsApi: Send + Sync {
    /// Create an empty conversation thread (POST /threads).
    async fn create_thread(&self) -> Result<Thread>;

    /// Append a user message to a thread (POST /threads/{thread}/messages).
    async fn create_message(&self, thread_id: &str, text: &str) -> Result<Message>;

    /// Start a run of `assistant_id` on a thread (POST /threads/{thread}/runs).
    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run>;

    /// Fetch the current state of a run (GET /threads/{thread}/runs/{run}).
    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// Request cancellation of a run (POST /threads/{thread}/runs/{run}/cancel).
    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run>;

    /// List up to `limit` messages of a thread, newest first
    /// (GET /threads/{thread}/messages?order=desc).
    async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<Message>>;

    /// List every assistant visible to the API key (GET /assistants, paginated).
    async fn list_assistants(&self) -> Result<Vec<Assistant>>;

    /// Create an assistant (POST /assistants).
    async fn create_assistant(&self, req: &CreateAssistantRequest) -> Result<Assistant>;
}
