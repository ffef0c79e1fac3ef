//! The conversation run controller: one inbound message in, at most one
//! reply out.
//!
//! ```text
//! channel_id ──► ThreadStore ──► append ──► launch ──► poll ──► extract
//! ```
//!
//! Every failure ends the turn silently from the caller's point of view
//! (no reply); the reason goes to the log. A failed append is the one
//! exception: the run is launched anyway.

use std::sync::Arc;

use serde::Serialize;

use ab_assistants::AssistantsApi;
use ab_domain::config::{ControllerConfig, PollingConfig};
use ab_threads::ThreadStore;

use super::append::MessageAppender;
use super::channel_lock::ChannelLockMap;
use super::clock::Clock;
use super::extract::ResponseExtractor;
use super::launch::RunLauncher;
use super::poller::{PollReport, RunPoller};

/// What happened during one inbound message, stage by stage.
#[derive(Debug, Clone, Default, Serialize)]
pub struct TurnReport {
    pub channel_id: String,
    pub thread_id: Option<String>,
    pub appended: bool,
    pub run_id: Option<String>,
    pub poll: Option<PollReport>,
    pub reply: Option<String>,
}

impl TurnReport {
    fn new(channel_id: &str) -> Self {
        Self {
            channel_id: channel_id.to_owned(),
            ..Self::default()
        }
    }
}

pub struct ConversationController {
    threads: ThreadStore,
    appender: MessageAppender,
    launcher: RunLauncher,
    poller: RunPoller,
    extractor: ResponseExtractor,
    assistant_id: String,
    locks: Option<ChannelLockMap>,
}

impl ConversationController {
    pub fn new(
        api: Arc<dyn AssistantsApi>,
        threads: ThreadStore,
        clock: Arc<dyn Clock>,
        assistant_id: String,
        polling: &PollingConfig,
        controller: &ControllerConfig,
    ) -> Self {
        Self {
            threads,
            appender: MessageAppender::new(api.clone()),
            launcher: RunLauncher::new(api.clone()),
            poller: RunPoller::from_config(api.clone(), clock, polling),
            extractor: ResponseExtractor::new(api),
            assistant_id,
            locks: controller.serialize_channels.then(ChannelLockMap::new),
        }
    }

    pub fn assistant_id(&self) -> &str {
        &self.assistant_id
    }

    pub fn threads(&self) -> &ThreadStore {
        &self.threads
    }

    /// Relay `text` from `channel_id` and return the assistant's reply.
    pub async fn handle_inbound(&self, channel_id: &str, text: &str) -> Option<String> {
        self.handle_inbound_detailed(channel_id, text).await.reply
    }

    pub async fn handle_inbound_detailed(&self, channel_id: &str, text: &str) -> TurnReport {
        let Some(locks) = &self.locks else {
            return self.run_turn(channel_id, text).await;
        };

        let turn = match locks.acquire(channel_id).await {
            Ok(permit) => Some(permit),
            Err(e) => {
                tracing::warn!(channel_id, error = %e, "channel lock unavailable, running unserialized");
                None
            }
        };
        let report = self.run_turn(channel_id, text).await;
        drop(turn);
        locks.prune_idle();
        report
    }

    async fn run_turn(&self, channel_id: &str, text: &str) -> TurnReport {
        let mut report = TurnReport::new(channel_id);

        let thread_id = match self.threads.get_or_create(channel_id).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(channel_id, error = %e, "could not resolve thread for channel");
                return report;
            }
        };
        report.thread_id = Some(thread_id.clone());

        match self.appender.append(&thread_id, text).await {
            Ok(_) => report.appended = true,
            Err(e) => {
                tracing::warn!(channel_id, thread_id = %thread_id, error = %e, "append failed, launching run anyway");
            }
        }

        let run = match self.launcher.launch(&thread_id, &self.assistant_id).await {
            Ok(run) => run,
            Err(e) => {
                tracing::error!(channel_id, thread_id = %thread_id, error = %e, "run launch failed");
                return report;
            }
        };
        report.run_id = Some(run.id.clone());

        let poll = match self.poller.poll(&thread_id, &run.id).await {
            Ok(poll) => poll,
            Err(e) => {
                tracing::error!(channel_id, thread_id = %thread_id, run_id = %run.id, error = %e, "run polling failed");
                return report;
            }
        };
        report.poll = Some(poll);

        if !poll.outcome.is_success() {
            tracing::info!(
                channel_id, thread_id = %thread_id, run_id = %run.id,
                outcome = %poll.outcome,
                "run did not complete, no reply"
            );
            return report;
        }

        match self.extractor.extract(&thread_id).await {
            Ok(reply) => report.reply = reply,
            Err(e) => {
                tracing::warn!(channel_id, thread_id = %thread_id, error = %e, "reading the reply failed");
            }
        }
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_assistants::fake::FakeAssistantsApi;
    use ab_assistants::RunStatus;
    use ab_threads::MemoryMappingStore;

    use crate::runtime::clock::ManualClock;
    use crate::runtime::poller::RunOutcome;

    fn controller_with(api: &Arc<FakeAssistantsApi>, serialize_channels: bool) -> ConversationController {
        let threads = ThreadStore::new(Arc::new(MemoryMappingStore::new()), api.clone());
        let polling = PollingConfig {
            timeout_ms: 5_000,
            ..PollingConfig::default()
        };
        ConversationController::new(
            api.clone(),
            threads,
            Arc::new(ManualClock::new()),
            "asst_main".into(),
            &polling,
            &ControllerConfig { serialize_channels },
        )
    }

    fn controller(api: &Arc<FakeAssistantsApi>) -> ConversationController {
        controller_with(api, false)
    }

    fn completing() -> FakeAssistantsApi {
        FakeAssistantsApi::new().with_run_statuses([
            RunStatus::InProgress,
            RunStatus::InProgress,
            RunStatus::Completed,
        ])
    }

    #[tokio::test]
    async fn completed_run_returns_the_joined_reply() {
        let api = Arc::new(completing().with_reply(["Hello", "world"]));

        let report = controller(&api).handle_inbound_detailed("discord:1", "hi").await;

        assert_eq!(report.reply.as_deref(), Some("Hello\nworld"));
        assert!(report.appended);
        let poll = report.poll.unwrap();
        assert_eq!(poll.outcome, RunOutcome::Completed);
        assert_eq!(poll.polls, 3);
        assert_eq!(api.calls().cancel_run, 0);
    }

    #[tokio::test]
    async fn second_message_reuses_the_thread() {
        let api = Arc::new(FakeAssistantsApi::new().with_run_statuses([RunStatus::Completed]).with_reply(["ok"]));
        let ctl = controller(&api);

        let first = ctl.handle_inbound_detailed("ch", "one").await;
        let second = ctl.handle_inbound_detailed("ch", "two").await;

        assert_eq!(first.thread_id, second.thread_id);
        assert_eq!(api.calls().create_thread, 1);
        assert_eq!(api.calls().create_run, 2);
    }

    #[tokio::test]
    async fn no_assistant_message_means_no_reply() {
        let api = Arc::new(completing());

        let reply = controller(&api).handle_inbound("ch", "hello?").await;

        assert_eq!(reply, None);
        assert_eq!(api.calls().list_messages, 1);
    }

    #[tokio::test]
    async fn append_failure_still_launches_the_run() {
        let api = Arc::new(completing().with_reply(["still here"]).failing_append());

        let report = controller(&api).handle_inbound_detailed("ch", "hi").await;

        assert!(!report.appended);
        assert_eq!(api.calls().create_run, 1);
        assert_eq!(report.reply.as_deref(), Some("still here"));
    }

    #[tokio::test]
    async fn launch_failure_gives_no_reply_and_no_polling() {
        let api = Arc::new(completing().with_reply(["unused"]).failing_launch());

        let report = controller(&api).handle_inbound_detailed("ch", "hi").await;

        assert_eq!(report.reply, None);
        assert!(report.thread_id.is_some());
        assert!(report.run_id.is_none());
        assert_eq!(api.calls().retrieve_run, 0);
    }

    #[tokio::test]
    async fn thread_creation_failure_stops_before_append() {
        let api = Arc::new(completing().failing_create_thread());

        let report = controller(&api).handle_inbound_detailed("ch", "hi").await;

        assert_eq!(report.reply, None);
        assert!(report.thread_id.is_none());
        assert_eq!(api.calls().create_message, 0);
        assert_eq!(api.calls().create_run, 0);
    }

    #[tokio::test]
    async fn requires_action_is_cancelled_and_silent() {
        let api = Arc::new(
            FakeAssistantsApi::new()
                .with_run_statuses([RunStatus::RequiresAction])
                .with_reply(["half-finished"]),
        );

        let report = controller(&api).handle_inbound_detailed("ch", "use a tool").await;

        assert_eq!(report.reply, None);
        assert_eq!(report.poll.map(|p| p.outcome), Some(RunOutcome::ActionRequired));
        assert_eq!(api.calls().cancel_run, 1);
        assert_eq!(api.calls().list_messages, 0);
    }

    #[tokio::test]
    async fn timeout_is_cancelled_and_silent() {
        let api = Arc::new(FakeAssistantsApi::new().with_reply(["too late"]));

        let report = controller(&api).handle_inbound_detailed("ch", "slow").await;

        assert_eq!(report.reply, None);
        assert_eq!(report.poll.map(|p| p.outcome), Some(RunOutcome::TimedOut));
        assert_eq!(api.calls().cancel_run, 1);
    }

    #[tokio::test]
    async fn failed_run_gives_no_reply() {
        let api = Arc::new(FakeAssistantsApi::new().with_run_statuses([RunStatus::Failed]));

        let reply = controller(&api).handle_inbound("ch", "hi").await;

        assert_eq!(reply, None);
        assert_eq!(api.calls().cancel_run, 0);
    }

    #[tokio::test]
    async fn permanent_poll_error_gives_no_reply() {
        let api = Arc::new(FakeAssistantsApi::new().with_retrieve_error(401));

        let report = controller(&api).handle_inbound_detailed("ch", "hi").await;

        assert_eq!(report.reply, None);
        assert!(report.run_id.is_some());
        assert!(report.poll.is_none());
    }

    #[tokio::test]
    async fn serialized_channel_creates_one_thread_under_concurrency() {
        let api = Arc::new(FakeAssistantsApi::new().with_run_statuses([RunStatus::Completed]).with_reply(["ok"]));
        let ctl = controller_with(&api, true);

        let (a, b) = tokio::join!(
            ctl.handle_inbound_detailed("ch", "first"),
            ctl.handle_inbound_detailed("ch", "second"),
        );

        assert_eq!(a.thread_id, b.thread_id);
        assert_eq!(api.thread_count(), 1);
        assert_eq!(a.reply.as_deref(), Some("ok"));
        assert_eq!(b.reply.as_deref(), Some("ok"));
    }

    #[tokio::test]
    async fn unserialized_first_messages_race_but_share_the_kept_thread() {
        let api = Arc::new(FakeAssistantsApi::new().with_run_statuses([RunStatus::Completed]).with_reply(["ok"]));
        let ctl = controller_with(&api, false);

        let (a, b) = tokio::join!(
            ctl.handle_inbound_detailed("ch", "first"),
            ctl.handle_inbound_detailed("ch", "second"),
        );

        assert_eq!(api.thread_count(), 2);
        assert!(a.thread_id.is_some());
        assert_eq!(a.thread_id, b.thread_id);
        assert_eq!(ctl.threads().list().len(), 1);
    }

    #[tokio::test]
    async fn channel_locks_are_released_after_each_turn() {
        let api = Arc::new(FakeAssistantsApi::new().with_run_statuses([RunStatus::Completed]).with_reply(["ok"]));
        let ctl = controller_with(&api, true);
        let locks = ctl.locks.as_ref().unwrap();

        ctl.handle_inbound("telegram:1", "hi").await;
        ctl.handle_inbound("telegram:2", "hi").await;
        assert_eq!(locks.channel_count(), 0);

        tokio::join!(
            ctl.handle_inbound("telegram:1", "a"),
            ctl.handle_inbound("telegram:1", "b"),
        );
        assert_eq!(locks.channel_count(), 0);
    }
}
