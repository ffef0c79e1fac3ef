use serde::Serialize;

/// Structured trace events emitted across all assistant-bridge crates.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event")]
pub enum TraceEvent {
    ApiCall {
        endpoint: String,
        status: u16,
        duration_ms: u64,
    },
    ThreadResolved {
        channel_id: String,
        thread_id: String,
        is_new: bool,
    },
    AssistantResolved {
        assistant_id: String,
        name: String,
        created: bool,
    },
    RunLaunched {
        thread_id: String,
        run_id: String,
        assistant_id: String,
    },
    RunFinished {
        thread_id: String,
        run_id: String,
        outcome: String,
        polls: u32,
        duration_ms: u64,
    },
    RunCancelled {
        thread_id: String,
        run_id: String,
        reason: String,
        ok: bool,
    },
    ReplyExtracted {
        thread_id: String,
        reply_chars: usize,
    },
}

impl TraceEvent {
    pub fn emit(&self) {
        let json = serde_json::to_string(self).unwrap_or_default();
        tracing::info!(trace_event = %json, "ab_event");
    }
}
