//! Wiring from a loaded [`Config`] to a ready [`ConversationController`].
//!
//! `ask` and `chat` share [`build_state`]; tests call [`build_state_with`]
//! to swap in a fake API and a virtual clock.

use std::sync::Arc;

use anyhow::Context;

use ab_assistants::{resolve_assistant_id, AssistantsApi, RestAssistantsClient};
use ab_domain::config::{Config, ConfigSeverity};
use ab_threads::{JsonMappingStore, ThreadStore};

use crate::runtime::{Clock, ConversationController, TokioClock};

/// Everything a front end needs to relay messages.
#[derive(Clone)]
pub struct BridgeState {
    pub config: Arc<Config>,
    pub api: Arc<dyn AssistantsApi>,
    pub controller: Arc<ConversationController>,
}

impl BridgeState {
    pub fn threads(&self) -> &ThreadStore {
        self.controller.threads()
    }
}

/// Log config issues and fail on errors.
pub fn check_config(config: &Config) -> anyhow::Result<()> {
    let issues = config.validate();
    for issue in &issues {
        match issue.severity {
            ConfigSeverity::Warning => tracing::warn!("config: {issue}"),
            ConfigSeverity::Error => tracing::error!("config: {issue}"),
        }
    }
    let errors = issues
        .iter()
        .filter(|i| i.severity == ConfigSeverity::Error)
        .count();
    if errors > 0 {
        anyhow::bail!("config validation failed with {errors} error(s)");
    }
    Ok(())
}

/// Build the REST client from `[api]`, resolving the API key.
pub fn build_api(config: &Config) -> anyhow::Result<Arc<dyn AssistantsApi>> {
    let client = RestAssistantsClient::new(&config.api).context("creating assistants API client")?;
    tracing::info!(base_url = %config.api.base_url, "assistants API client ready");
    Ok(Arc::new(client))
}

/// Open the channel → thread mapping file under `[threads].state_path`.
pub fn open_mappings(config: &Config) -> anyhow::Result<JsonMappingStore> {
    let store = JsonMappingStore::new(&config.threads.state_path).with_context(|| {
        format!(
            "opening thread mappings under {}",
            config.threads.state_path.display()
        )
    })?;
    tracing::info!(path = %store.path().display(), "thread mappings loaded");
    Ok(store)
}

/// Validate config, connect to the API, resolve the assistant and return
/// the wired controller.
pub async fn build_state(config: Arc<Config>) -> anyhow::Result<BridgeState> {
    check_config(&config)?;
    let api = build_api(&config)?;
    build_state_with(config, api, Arc::new(TokioClock)).await
}

pub async fn build_state_with(
    config: Arc<Config>,
    api: Arc<dyn AssistantsApi>,
    clock: Arc<dyn Clock>,
) -> anyhow::Result<BridgeState> {
    let mappings = open_mappings(&config)?;
    let threads = ThreadStore::new(Arc::new(mappings), api.clone());

    let assistant_id = resolve_assistant_id(api.as_ref(), &config.assistant)
        .await
        .context("resolving assistant")?;

    let controller = ConversationController::new(
        api.clone(),
        threads,
        clock,
        assistant_id,
        &config.polling,
        &config.controller,
    );
    tracing::info!(
        assistant_id = controller.assistant_id(),
        timeout_ms = config.polling.timeout_ms,
        serialize_channels = config.controller.serialize_channels,
        "conversation controller ready"
    );

    Ok(BridgeState {
        config,
        api,
        controller: Arc::new(controller),
    })
}
