use ab_assistants::resolve_assistant_id;
use ab_domain::config::Config;

use crate::bootstrap;

/// `assistant-bridge assistant ensure`: print the id of the configured
/// assistant, creating it when no assistant has the configured name.
pub async fn ensure(config: &Config) -> anyhow::Result<()> {
    bootstrap::check_config(config)?;
    let api = bootstrap::build_api(config)?;
    let id = resolve_assistant_id(api.as_ref(), &config.assistant).await?;
    println!("{id}");
    Ok(())
}
