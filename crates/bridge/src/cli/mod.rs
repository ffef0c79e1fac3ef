pub mod ask;
pub mod assistant;
pub mod chat;
pub mod config;
pub mod doctor;
pub mod threads;

use clap::{Parser, Subcommand};

/// assistant-bridge: relay chat messages to a hosted assistant.
#[derive(Debug, Parser)]
#[command(name = "assistant-bridge", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Send one message on a channel and print the assistant's reply.
    Ask {
        /// The message to send.
        message: String,
        /// Channel id the message arrives on (one remote thread per channel).
        #[arg(long, default_value = "cli:ask")]
        channel: String,
        /// Print the full turn report as JSON instead of the reply text.
        #[arg(long)]
        json: bool,
    },
    /// Interactive chat on a channel.
    Chat {
        /// Channel id to start on (switch with /channel).
        #[arg(long, default_value = "cli:chat")]
        channel: String,
    },
    /// Inspect stored channel → thread mappings.
    #[command(subcommand)]
    Threads(ThreadsCommand),
    /// Assistant management.
    #[command(subcommand)]
    Assistant(AssistantCommand),
    /// Configuration utilities.
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Run diagnostic checks against the current configuration.
    Doctor,
    /// Print version information.
    Version,
}

#[derive(Debug, Subcommand)]
pub enum ThreadsCommand {
    /// List every channel and the thread it maps to.
    List {
        /// Output as JSON.
        #[arg(long)]
        json: bool,
    },
}

#[derive(Debug, Subcommand)]
pub enum AssistantCommand {
    /// Find the configured assistant by id or name, creating it if missing,
    /// and print its id.
    Ensure,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse the config file and report any errors.
    Validate,
    /// Dump the resolved configuration (with defaults) as TOML.
    Show,
}

/// How a command sets up logging before it runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSetup {
    /// Per `[observability]`: compact or JSON stderr logs, optional OTLP.
    Relay,
    /// Compact stderr logs at `warn`, so warnings surface without touching
    /// stdout.
    Inspect,
    None,
}

impl Command {
    pub fn log_setup(&self) -> LogSetup {
        match self {
            Command::Ask { .. } | Command::Chat { .. } => LogSetup::Relay,
            Command::Threads(_) | Command::Assistant(_) | Command::Config(_) | Command::Doctor => {
                LogSetup::Inspect
            }
            Command::Version => LogSetup::None,
        }
    }
}

// ── Config loading helper ─────────────────────────────────────────────

/// Load the configuration from `AB_CONFIG` (or `config.toml`). A missing
/// file yields the defaults. Returns the config and the path that was
/// tried.
pub fn load_config() -> anyhow::Result<(ab_domain::config::Config, String)> {
    let config_path = std::env::var("AB_CONFIG").unwrap_or_else(|_| "config.toml".into());
    let config = load_config_from(std::path::Path::new(&config_path))?;
    Ok((config, config_path))
}

pub fn load_config_from(path: &std::path::Path) -> anyhow::Result<ab_domain::config::Config> {
    if !path.exists() {
        return Ok(ab_domain::config::Config::default());
    }
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("reading {}: {e}", path.display()))?;
    toml::from_str(&raw).map_err(|e| anyhow::anyhow!("parsing {}: {e}", path.display()))
}
