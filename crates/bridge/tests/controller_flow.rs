//! End-to-end turns through `bootstrap::build_state_with`: config → JSON
//! mapping store on disk → assistant resolution → controller, against the
//! in-memory API and a virtual clock.

use std::sync::Arc;
use std::time::Duration;

use ab_assistants::fake::FakeAssistantsApi;
use ab_assistants::{Role, RunStatus};
use ab_bridge::bootstrap::{build_state_with, BridgeState};
use ab_bridge::runtime::{ManualClock, RunOutcome};
use ab_domain::config::Config;
use ab_threads::{JsonMappingStore, MappingStore};

fn config_in(dir: &std::path::Path) -> Config {
    let raw = format!(
        r#"
[assistant]
name = "Helper"
model = "gpt-4o-mini"

[polling]
initial_interval_ms = 1000
max_interval_ms = 5000
multiplier = 1.5
timeout_ms = 5000

[threads]
state_path = "{}"
"#,
        dir.display().to_string().replace('\\', "/")
    );
    toml::from_str(&raw).unwrap()
}

async fn boot(
    dir: &std::path::Path,
    api: &Arc<FakeAssistantsApi>,
    clock: &Arc<ManualClock>,
) -> BridgeState {
    build_state_with(Arc::new(config_in(dir)), api.clone(), clock.clone())
        .await
        .unwrap()
}

#[tokio::test]
async fn reply_flows_back_and_mapping_persists() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(
        FakeAssistantsApi::new()
            .with_run_statuses([RunStatus::InProgress, RunStatus::InProgress, RunStatus::Completed])
            .with_reply(["Hello", "world"]),
    );
    let clock = Arc::new(ManualClock::new());
    let state = boot(dir.path(), &api, &clock).await;

    let reply = state.controller.handle_inbound("telegram:42", "hi!").await;

    assert_eq!(reply.as_deref(), Some("Hello\nworld"));
    assert_eq!(clock.elapsed(), Duration::from_millis(2500));
    assert_eq!(api.calls().create_assistant, 1);

    let thread_id = state.threads().lookup("telegram:42").unwrap().thread_id;
    let messages = api.messages(&thread_id);
    assert_eq!(messages[0].role, Role::User);
    assert_eq!(messages[0].text_segments().collect::<Vec<_>>(), ["hi!"]);

    let reopened = JsonMappingStore::new(dir.path()).unwrap();
    assert_eq!(reopened.get("telegram:42").unwrap().thread_id, thread_id);
}

#[tokio::test]
async fn restart_reuses_stored_thread_and_named_assistant() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(
        FakeAssistantsApi::new()
            .with_run_statuses([RunStatus::Completed])
            .with_reply(["ok"]),
    );
    let clock = Arc::new(ManualClock::new());

    let first = boot(dir.path(), &api, &clock).await;
    let before = first.controller.handle_inbound_detailed("slack:C1", "one").await;
    drop(first);

    let second = boot(dir.path(), &api, &clock).await;
    let after = second.controller.handle_inbound_detailed("slack:C1", "two").await;

    assert_eq!(before.thread_id, after.thread_id);
    assert_eq!(api.calls().create_thread, 1);
    assert_eq!(api.calls().create_assistant, 1);
    assert_eq!(api.calls().list_assistants, 2);
    assert_eq!(after.reply.as_deref(), Some("ok"));
}

#[tokio::test]
async fn stuck_run_times_out_with_a_single_cancel() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(FakeAssistantsApi::new().with_reply(["never shown"]));
    let clock = Arc::new(ManualClock::new());
    let state = boot(dir.path(), &api, &clock).await;

    let report = state.controller.handle_inbound_detailed("cli", "anyone?").await;

    assert_eq!(report.reply, None);
    assert_eq!(report.poll.map(|p| p.outcome), Some(RunOutcome::TimedOut));
    assert_eq!(api.calls().cancel_run, 1);
    assert_eq!(clock.elapsed(), Duration::from_secs(5));
}

#[tokio::test]
async fn turn_report_serializes_for_json_output() {
    let dir = tempfile::tempdir().unwrap();
    let api = Arc::new(
        FakeAssistantsApi::new()
            .with_run_statuses([RunStatus::Expired]),
    );
    let clock = Arc::new(ManualClock::new());
    let state = boot(dir.path(), &api, &clock).await;

    let report = state.controller.handle_inbound_detailed("cli", "hi").await;
    let v = serde_json::to_value(&report).unwrap();

    assert_eq!(v["channel_id"], "cli");
    assert_eq!(v["appended"], true);
    assert_eq!(v["poll"]["outcome"], "failed");
    assert_eq!(v["poll"]["status"], "expired");
    assert!(v["reply"].is_null());
}
