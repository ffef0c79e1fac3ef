use std::sync::Arc;

use ab_assistants::{AssistantsApi, Run};
use ab_domain::error::Result;
use ab_domain::trace::TraceEvent;

/// Starts a run of an assistant over a thread.
pub struct RunLauncher {
    api: Arc<dyn AssistantsApi>,
}

impl RunLauncher {
    pub fn new(api: Arc<dyn AssistantsApi>) -> Self {
        Self { api }
    }

    /// Returns the created run; its `status` is usually `queued`.
    pub async fn launch(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let run = self.api.create_run(thread_id, assistant_id).await?;
        TraceEvent::RunLaunched {
            thread_id: thread_id.to_owned(),
            run_id: run.id.clone(),
            assistant_id: assistant_id.to_owned(),
        }
        .emit();
        Ok(run)
    }
}
