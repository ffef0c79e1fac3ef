//! `assistant-bridge ask`: relay one message and print the reply.

use std::sync::Arc;

use ab_domain::config::Config;

use crate::bootstrap;

/// Send `message` on `channel` and print the reply to stdout.
///
/// Returns `false` when no reply was produced (run failed, timed out, or
/// the assistant said nothing); the reason is on stderr via the log.
pub async fn ask(
    config: Arc<Config>,
    message: String,
    channel: String,
    json_output: bool,
) -> anyhow::Result<bool> {
    let state = bootstrap::build_state(config).await?;

    let report = state
        .controller
        .handle_inbound_detailed(&channel, &message)
        .await;

    if json_output {
        let json = serde_json::to_string_pretty(&report)
            .map_err(|e| anyhow::anyhow!("serializing turn report: {e}"))?;
        println!("{json}");
    } else if let Some(reply) = &report.reply {
        println!("{reply}");
    } else {
        let outcome = report
            .poll
            .map(|p| p.outcome.to_string())
            .unwrap_or_else(|| "not started".into());
        eprintln!("no reply (run {outcome})");
    }

    Ok(report.reply.is_some())
}
