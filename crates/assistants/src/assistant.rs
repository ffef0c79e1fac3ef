//! Assistant resolution: use the configured id, or find the assistant by
//! name and create it when it does not exist yet.

use ab_domain::config::AssistantConfig;
use ab_domain::error::{Error, Result};
use ab_domain::trace::TraceEvent;

use crate::api::AssistantsApi;
use crate::types::CreateAssistantRequest;

/// Return the id of the assistant that runs should be launched against.
pub async fn resolve_assistant_id(api: &dyn AssistantsApi, cfg: &AssistantConfig) -> Result<String> {
    if let Some(id) = cfg.id.as_deref().filter(|id| !id.is_empty()) {
        return Ok(id.to_owned());
    }

    if cfg.name.is_empty() {
        return Err(Error::Config(
            "assistant.name is required when assistant.id is not set".into(),
        ));
    }

    let assistants = api.list_assistants().await?;
    if let Some(existing) = assistants
        .iter()
        .find(|a| a.name.as_deref() == Some(cfg.name.as_str()))
    {
        TraceEvent::AssistantResolved {
            assistant_id: existing.id.clone(),
            name: cfg.name.clone(),
            created: false,
        }
        .emit();
        return Ok(existing.id.clone());
    }

    tracing::info!(name = %cfg.name, model = %cfg.model, "assistant not found, creating it");
    let created = api
        .create_assistant(&CreateAssistantRequest {
            name: cfg.name.clone(),
            model: cfg.model.clone(),
            instructions: cfg.instructions.clone(),
            description: cfg.description.clone(),
        })
        .await?;

    TraceEvent::AssistantResolved {
        assistant_id: created.id.clone(),
        name: cfg.name.clone(),
        created: true,
    }
    .emit();

    Ok(created.id)
}
