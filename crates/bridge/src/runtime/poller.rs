//! Run poller: query a run until it settles, the assistant asks for tool
//! output, or the deadline passes.
//!
//! The deadline is enforced against the [`Clock`], not by counting loop
//! iterations: a status query still in flight when the deadline arrives is
//! dropped. On timeout and on `requires_action` the run is cancelled once,
//! best-effort.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use ab_assistants::{AssistantsApi, RunStatus};
use ab_domain::config::PollingConfig;
use ab_domain::error::Result;
use ab_domain::trace::TraceEvent;

use super::backoff::BackoffPolicy;
use super::clock::Clock;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Outcome
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// How a polled run ended. Only `Completed` carries a reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", content = "status", rename_all = "snake_case")]
pub enum RunOutcome {
    Completed,
    /// Terminal failure status reported by the API (`failed`, `cancelled`,
    /// `expired`, `incomplete`).
    Failed(RunStatus),
    /// The run asked for tool output; it was cancelled.
    ActionRequired,
    /// The deadline passed before a terminal status; the run was cancelled.
    TimedOut,
}

impl RunOutcome {
    pub fn is_success(self) -> bool {
        matches!(self, RunOutcome::Completed)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RunOutcome::Completed => "completed",
            RunOutcome::Failed(status) => status.as_str(),
            RunOutcome::ActionRequired => "requires_action",
            RunOutcome::TimedOut => "timed_out",
        }
    }
}

impl std::fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PollReport {
    #[serde(flatten)]
    pub outcome: RunOutcome,
    /// Number of status queries issued (including an abandoned one).
    pub polls: u32,
    #[serde(serialize_with = "as_millis")]
    pub elapsed: Duration,
}

fn as_millis<S: serde::Serializer>(d: &Duration, s: S) -> std::result::Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_millis() as u64)
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Poller
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub struct RunPoller {
    api: Arc<dyn AssistantsApi>,
    clock: Arc<dyn Clock>,
    backoff: BackoffPolicy,
    timeout: Duration,
}

impl RunPoller {
    pub fn new(
        api: Arc<dyn AssistantsApi>,
        clock: Arc<dyn Clock>,
        backoff: BackoffPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            api,
            clock,
            backoff,
            timeout,
        }
    }

    pub fn from_config(
        api: Arc<dyn AssistantsApi>,
        clock: Arc<dyn Clock>,
        cfg: &PollingConfig,
    ) -> Self {
        Self::new(api, clock, BackoffPolicy::from_config(cfg), cfg.timeout())
    }

    /// Poll `run_id` until it settles.
    ///
    /// Failure terminals, `requires_action` and the timeout are returned as
    /// outcomes. `Err` is reserved for permanent retrieval errors (auth,
    /// unknown run); transient ones are logged and retried until the
    /// deadline.
    pub async fn poll(&self, thread_id: &str, run_id: &str) -> Result<PollReport> {
        let start = self.clock.now();
        let deadline = start + self.timeout;
        let mut intervals = self.backoff.intervals();
        let mut polls: u32 = 0;

        loop {
            let Some(remaining) = time_left(self.clock.now(), deadline) else {
                return Ok(self.timed_out(thread_id, run_id, polls, start).await);
            };

            polls += 1;
            let retrieved = tokio::select! {
                biased;
                run = self.api.retrieve_run(thread_id, run_id) => Some(run),
                _ = self.clock.sleep(remaining) => None,
            };

            match retrieved {
                None => {
                    tracing::warn!(thread_id, run_id, "status query outlived the poll deadline");
                    return Ok(self.timed_out(thread_id, run_id, polls, start).await);
                }
                Some(Ok(run)) if run.status.is_terminal() => {
                    let outcome = if run.status.is_success() {
                        RunOutcome::Completed
                    } else {
                        if let Some(err) = &run.last_error {
                            tracing::warn!(
                                thread_id, run_id,
                                status = %run.status,
                                code = %err.code,
                                message = %err.message,
                                "run ended without completing"
                            );
                        }
                        RunOutcome::Failed(run.status)
                    };
                    return Ok(self.finish(thread_id, run_id, outcome, polls, start));
                }
                Some(Ok(run)) if run.status == RunStatus::RequiresAction => {
                    self.cancel(thread_id, run_id, "requires_action").await;
                    return Ok(self.finish(
                        thread_id,
                        run_id,
                        RunOutcome::ActionRequired,
                        polls,
                        start,
                    ));
                }
                Some(Ok(run)) => {
                    tracing::debug!(thread_id, run_id, status = %run.status, polls, "run pending");
                }
                Some(Err(e)) if e.is_transient() => {
                    tracing::warn!(thread_id, run_id, error = %e, "run status query failed, will retry");
                }
                Some(Err(e)) => {
                    tracing::error!(thread_id, run_id, error = %e, "run status query failed");
                    self.cancel(thread_id, run_id, "poll_error").await;
                    return Err(e);
                }
            }

            let Some(remaining) = time_left(self.clock.now(), deadline) else {
                return Ok(self.timed_out(thread_id, run_id, polls, start).await);
            };
            let interval = intervals.next().unwrap_or(self.backoff.max);
            self.clock.sleep(interval.min(remaining)).await;
        }
    }

    async fn timed_out(&self, thread_id: &str, run_id: &str, polls: u32, start: Instant) -> PollReport {
        tracing::warn!(thread_id, run_id, timeout_ms = self.timeout.as_millis() as u64, "run timed out");
        self.cancel(thread_id, run_id, "timeout").await;
        self.finish(thread_id, run_id, RunOutcome::TimedOut, polls, start)
    }

    /// Ask the API to cancel the run. Failures are logged, never retried.
    async fn cancel(&self, thread_id: &str, run_id: &str, reason: &str) {
        let ok = match self.api.cancel_run(thread_id, run_id).await {
            Ok(run) => {
                tracing::info!(thread_id, run_id, reason, status = %run.status, "run cancel requested");
                true
            }
            Err(e) => {
                tracing::warn!(thread_id, run_id, reason, error = %e, "run cancel failed");
                false
            }
        };
        TraceEvent::RunCancelled {
            thread_id: thread_id.to_owned(),
            run_id: run_id.to_owned(),
            reason: reason.to_owned(),
            ok,
        }
        .emit();
    }

    fn finish(
        &self,
        thread_id: &str,
        run_id: &str,
        outcome: RunOutcome,
        polls: u32,
        start: Instant,
    ) -> PollReport {
        let elapsed = self.clock.now().saturating_duration_since(start);
        TraceEvent::RunFinished {
            thread_id: thread_id.to_owned(),
            run_id: run_id.to_owned(),
            outcome: outcome.as_str().to_owned(),
            polls,
            duration_ms: elapsed.as_millis() as u64,
        }
        .emit();
        PollReport {
            outcome,
            polls,
            elapsed,
        }
    }
}

/// Time left before `deadline`, or `None` once it has passed.
fn time_left(now: Instant, deadline: Instant) -> Option<Duration> {
    deadline.checked_duration_since(now).filter(|d| !d.is_zero())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ab_assistants::fake::FakeAssistantsApi;
    use crate::runtime::clock::ManualClock;

    fn poller(api: &Arc<FakeAssistantsApi>, clock: &Arc<ManualClock>, timeout_secs: u64) -> RunPoller {
        RunPoller::new(
            api.clone(),
            clock.clone(),
            BackoffPolicy::default(),
            Duration::from_secs(timeout_secs),
        )
    }

    async fn launched(api: &FakeAssistantsApi) -> (String, String, RunStatus) {
        let thread = api.create_thread().await.unwrap();
        let run = api.create_run(&thread.id, "asst_1").await.unwrap();
        (thread.id, run.id, run.status)
    }

    #[tokio::test]
    async fn completes_after_three_polls_without_cancel() {
        let api = Arc::new(FakeAssistantsApi::new().with_run_statuses([
            RunStatus::InProgress,
            RunStatus::InProgress,
            RunStatus::Completed,
        ]));
        let clock = Arc::new(ManualClock::new());
        let (thread, run, launch_status) = launched(&api).await;
        assert_eq!(launch_status, RunStatus::Queued);

        let report = poller(&api, &clock, 60).poll(&thread, &run).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.polls, 3);
        assert_eq!(api.calls().cancel_run, 0);
        assert_eq!(
            clock.sleeps(),
            vec![Duration::from_secs(1), Duration::from_millis(1500)]
        );
        assert_eq!(report.elapsed, Duration::from_millis(2500));
    }

    #[tokio::test]
    async fn always_in_progress_times_out_with_one_cancel() {
        let api = Arc::new(FakeAssistantsApi::new().with_run_statuses([RunStatus::InProgress]));
        let clock = Arc::new(ManualClock::new());
        let (thread, run, _) = launched(&api).await;

        let report = poller(&api, &clock, 5).poll(&thread, &run).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::TimedOut);
        assert_eq!(api.calls().cancel_run, 1);
        assert_eq!(report.elapsed, Duration::from_secs(5));
        // 1 + 1.5 + 2.25 = 4.75, then the last sleep is trimmed to the deadline.
        assert_eq!(report.polls, 4);
        assert_eq!(clock.sleeps().last(), Some(&Duration::from_millis(250)));
    }

    #[tokio::test]
    async fn requires_action_cancels_once_without_waiting() {
        let api = Arc::new(FakeAssistantsApi::new().with_run_statuses([RunStatus::RequiresAction]));
        let clock = Arc::new(ManualClock::new());
        let (thread, run, _) = launched(&api).await;

        let report = poller(&api, &clock, 60).poll(&thread, &run).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::ActionRequired);
        assert!(!report.outcome.is_success());
        assert_eq!(report.polls, 1);
        assert_eq!(api.calls().cancel_run, 1);
        assert!(clock.sleeps().is_empty());
    }

    #[tokio::test]
    async fn failure_terminals_are_outcomes_not_errors() {
        for status in [
            RunStatus::Failed,
            RunStatus::Expired,
            RunStatus::Cancelled,
            RunStatus::Incomplete,
        ] {
            let api = Arc::new(FakeAssistantsApi::new().with_run_statuses([status]));
            let clock = Arc::new(ManualClock::new());
            let (thread, run, _) = launched(&api).await;

            let report = poller(&api, &clock, 60).poll(&thread, &run).await.unwrap();

            assert_eq!(report.outcome, RunOutcome::Failed(status));
            assert_eq!(api.calls().cancel_run, 0, "{status}");
        }
    }

    #[tokio::test]
    async fn cancelling_is_not_terminal() {
        let api = Arc::new(FakeAssistantsApi::new().with_run_statuses([
            RunStatus::Cancelling,
            RunStatus::Cancelled,
        ]));
        let clock = Arc::new(ManualClock::new());
        let (thread, run, _) = launched(&api).await;

        let report = poller(&api, &clock, 60).poll(&thread, &run).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Failed(RunStatus::Cancelled));
        assert_eq!(report.polls, 2);
    }

    #[tokio::test]
    async fn hanging_status_query_is_abandoned_at_the_deadline() {
        let api = Arc::new(FakeAssistantsApi::new().hanging_retrieve());
        let clock = Arc::new(ManualClock::new());
        let (thread, run, _) = launched(&api).await;

        let report = poller(&api, &clock, 5).poll(&thread, &run).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::TimedOut);
        assert_eq!(report.polls, 1);
        assert_eq!(api.calls().cancel_run, 1);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5)]);
    }

    #[tokio::test]
    async fn transient_errors_keep_polling_until_timeout() {
        let api = Arc::new(FakeAssistantsApi::new().with_retrieve_error(503));
        let clock = Arc::new(ManualClock::new());
        let (thread, run, _) = launched(&api).await;

        let report = poller(&api, &clock, 5).poll(&thread, &run).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::TimedOut);
        assert!(report.polls > 1);
        assert_eq!(api.calls().cancel_run, 1);
    }

    #[tokio::test]
    async fn permanent_error_cancels_and_propagates() {
        let api = Arc::new(FakeAssistantsApi::new().with_retrieve_error(404));
        let clock = Arc::new(ManualClock::new());
        let (thread, run, _) = launched(&api).await;

        let err = poller(&api, &clock, 5).poll(&thread, &run).await.unwrap_err();

        assert!(err.to_string().contains("404"));
        assert_eq!(api.calls().retrieve_run, 1);
        assert_eq!(api.calls().cancel_run, 1);
    }

    #[tokio::test]
    async fn cancel_failure_does_not_change_the_outcome() {
        let api = Arc::new(
            FakeAssistantsApi::new()
                .with_run_statuses([RunStatus::RequiresAction])
                .failing_cancel(),
        );
        let clock = Arc::new(ManualClock::new());
        let (thread, run, _) = launched(&api).await;

        let report = poller(&api, &clock, 60).poll(&thread, &run).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::ActionRequired);
        assert_eq!(api.calls().cancel_run, 1);
    }

    #[test]
    fn report_serializes_flat() {
        let report = PollReport {
            outcome: RunOutcome::Failed(RunStatus::Expired),
            polls: 7,
            elapsed: Duration::from_millis(1234),
        };
        let v = serde_json::to_value(report).unwrap();
        assert_eq!(v["outcome"], "failed");
        assert_eq!(v["status"], "expired");
        assert_eq!(v["polls"], 7);
        assert_eq!(v["elapsed"], 1234);
    }
}
