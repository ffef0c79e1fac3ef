//! In-memory [`AssistantsApi`] for tests.
//!
//! Threads, messages and assistants live in a mutex-guarded state. Run
//! status is scripted: `retrieve_run` pops the next status from the script
//! and repeats the last one once the script is exhausted. Every call is
//! counted so tests can assert on, for example, how many cancels happened.

use std::collections::{HashMap, VecDeque};

use async_trait::async_trait;
use parking_lot::Mutex;

use ab_domain::error::{Error, Result};

use crate::api::AssistantsApi;
use crate::types::{
    Assistant, ContentPart, CreateAssistantRequest, Message, Role, Run, RunStatus, Thread,
};

/// Per-method call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CallCounts {
    pub create_thread: u32,
    pub create_message: u32,
    pub create_run: u32,
    pub retrieve_run: u32,
    pub cancel_run: u32,
    pub list_messages: u32,
    pub list_assistants: u32,
    pub create_assistant: u32,
}

#[derive(Default)]
struct FakeState {
    next_id: u32,
    /// thread id → messages, oldest first.
    threads: HashMap<String, Vec<Message>>,
    assistants: Vec<Assistant>,
    launch_status: Option<RunStatus>,
    run_script: VecDeque<RunStatus>,
    last_status: Option<RunStatus>,
    reply: Option<Vec<String>>,
    fail_create_thread: bool,
    fail_append: bool,
    fail_launch: bool,
    fail_cancel: bool,
    retrieve_error: Option<u16>,
    hang_retrieve: bool,
    calls: CallCounts,
}

impl FakeState {
    fn next_id(&mut self, prefix: &str) -> String {
        self.next_id += 1;
        format!("{prefix}_{}", self.next_id)
    }

    fn push_message(&mut self, thread_id: &str, role: Role, segments: &[String], run_id: Option<String>) {
        let id = self.next_id("msg");
        let created_at = i64::from(self.next_id);
        let message = Message {
            id,
            role,
            content: segments.iter().map(ContentPart::text).collect(),
            run_id,
            created_at,
        };
        self.threads
            .entry(thread_id.to_owned())
            .or_default()
            .push(message);
    }
}

/// Scriptable in-memory stand-in for the remote assistants API.
#[derive(Default)]
pub struct FakeAssistantsApi {
    state: Mutex<FakeState>,
}

fn unavailable(endpoint: &str) -> Error {
    Error::Api {
        endpoint: endpoint.to_owned(),
        status: 500,
        message: "scripted failure".into(),
    }
}

impl FakeAssistantsApi {
    pub fn new() -> Self {
        Self::default()
    }

    /// Status returned by `create_run` (default `queued`).
    pub fn with_launch_status(self, status: RunStatus) -> Self {
        self.state.lock().launch_status = Some(status);
        self
    }

    /// Statuses returned by successive `retrieve_run` calls.
    pub fn with_run_statuses(self, statuses: impl IntoIterator<Item = RunStatus>) -> Self {
        self.state.lock().run_script = statuses.into_iter().collect();
        self
    }

    /// Text segments of the assistant message a run adds to its thread.
    pub fn with_reply<S: Into<String>>(self, segments: impl IntoIterator<Item = S>) -> Self {
        self.state.lock().reply = Some(segments.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_assistant(self, id: &str, name: &str) -> Self {
        self.state.lock().assistants.push(Assistant {
            id: id.to_owned(),
            name: Some(name.to_owned()),
            model: "gpt-4o".into(),
        });
        self
    }

    pub fn failing_create_thread(self) -> Self {
        self.state.lock().fail_create_thread = true;
        self
    }

    pub fn failing_append(self) -> Self {
        self.state.lock().fail_append = true;
        self
    }

    pub fn failing_launch(self) -> Self {
        self.state.lock().fail_launch = true;
        self
    }

    pub fn failing_cancel(self) -> Self {
        self.state.lock().fail_cancel = true;
        self
    }

    /// Every `retrieve_run` fails with the given HTTP status.
    pub fn with_retrieve_error(self, status: u16) -> Self {
        self.state.lock().retrieve_error = Some(status);
        self
    }

    /// `retrieve_run` never answers.
    pub fn hanging_retrieve(self) -> Self {
        self.state.lock().hang_retrieve = true;
        self
    }

    /// Seed a message directly into a thread.
    pub fn push_message<S: Into<String>>(
        &self,
        thread_id: &str,
        role: Role,
        segments: impl IntoIterator<Item = S>,
    ) {
        let segments: Vec<String> = segments.into_iter().map(Into::into).collect();
        self.state.lock().push_message(thread_id, role, &segments, None);
    }

    /// Messages of a thread, oldest first.
    pub fn messages(&self, thread_id: &str) -> Vec<Message> {
        self.state
            .lock()
            .threads
            .get(thread_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn thread_count(&self) -> usize {
        self.state.lock().threads.len()
    }

    pub fn calls(&self) -> CallCounts {
        self.state.lock().calls
    }
}

#[async_trait]
impl AssistantsApi for FakeAssistantsApi {
    async fn create_thread(&self) -> Result<Thread> {
        {
            let mut state = self.state.lock();
            state.calls.create_thread += 1;
            if state.fail_create_thread {
                return Err(unavailable("POST /threads"));
            }
        }
        // Suspend like a network round trip so concurrent callers interleave.
        tokio::task::yield_now().await;

        let mut state = self.state.lock();
        let id = state.next_id("thread");
        state.threads.insert(id.clone(), Vec::new());
        Ok(Thread { id, created_at: 0 })
    }

    async fn create_message(&self, thread_id: &str, text: &str) -> Result<Message> {
        let mut state = self.state.lock();
        state.calls.create_message += 1;
        if state.fail_append {
            return Err(unavailable("POST /threads/{thread}/messages"));
        }
        state.push_message(thread_id, Role::User, &[text.to_owned()], None);
        state.threads[thread_id]
            .last()
            .cloned()
            .ok_or_else(|| Error::Other("message vanished".into()))
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let mut state = self.state.lock();
        state.calls.create_run += 1;
        if state.fail_launch {
            return Err(unavailable("POST /threads/{thread}/runs"));
        }
        let run_id = state.next_id("run");
        if let Some(reply) = state.reply.clone() {
            state.push_message(thread_id, Role::Assistant, &reply, Some(run_id.clone()));
        }
        Ok(Run {
            id: run_id,
            thread_id: thread_id.to_owned(),
            assistant_id: Some(assistant_id.to_owned()),
            status: state.launch_status.unwrap_or(RunStatus::Queued),
            last_error: None,
        })
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let hang = {
            let mut state = self.state.lock();
            state.calls.retrieve_run += 1;
            state.hang_retrieve
        };
        if hang {
            return std::future::pending::<Result<Run>>().await;
        }

        let mut state = self.state.lock();
        if let Some(status) = state.retrieve_error {
            return Err(Error::Api {
                endpoint: "GET /threads/{thread}/runs/{run}".into(),
                status,
                message: "scripted failure".into(),
            });
        }
        let status = match state.run_script.pop_front() {
            Some(s) => {
                state.last_status = Some(s);
                s
            }
            None => state.last_status.unwrap_or(RunStatus::InProgress),
        };
        Ok(Run {
            id: run_id.to_owned(),
            thread_id: thread_id.to_owned(),
            assistant_id: None,
            status,
            last_error: None,
        })
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let mut state = self.state.lock();
        state.calls.cancel_run += 1;
        if state.fail_cancel {
            return Err(unavailable("POST /threads/{thread}/runs/{run}/cancel"));
        }
        Ok(Run {
            id: run_id.to_owned(),
            thread_id: thread_id.to_owned(),
            assistant_id: None,
            status: RunStatus::Cancelling,
            last_error: None,
        })
    }

    async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<Message>> {
        let mut state = self.state.lock();
        state.calls.list_messages += 1;
        let messages = state
            .threads
            .get(thread_id)
            .ok_or_else(|| Error::Api {
                endpoint: "GET /threads/{thread}/messages".into(),
                status: 404,
                message: format!("no thread {thread_id}"),
            })?;
        Ok(messages.iter().rev().take(limit as usize).cloned().collect())
    }

    async fn list_assistants(&self) -> Result<Vec<Assistant>> {
        let mut state = self.state.lock();
        state.calls.list_assistants += 1;
        Ok(state.assistants.clone())
    }

    async fn create_assistant(&self, req: &CreateAssistantRequest) -> Result<Assistant> {
        let mut state = self.state.lock();
        state.calls.create_assistant += 1;
        let assistant = Assistant {
            id: state.next_id("asst"),
            name: Some(req.name.clone()),
            model: req.model.clone(),
        };
        state.assistants.push(assistant.clone());
        Ok(assistant)
    }
}
