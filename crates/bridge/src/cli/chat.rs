//! `assistant-bridge chat`: interactive REPL.
//!
//! Each line is relayed as an inbound message on the current channel and
//! the reply is printed once the run settles. Slash commands switch
//! channels and show the thread behind the current one.

use std::sync::Arc;

use ab_domain::config::Config;

use crate::bootstrap::{self, BridgeState};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Public entry point
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

pub async fn chat(config: Arc<Config>, mut channel: String) -> anyhow::Result<()> {
    let state = bootstrap::build_state(config).await?;

    let history_path = dirs::home_dir()
        .unwrap_or_default()
        .join(".assistant-bridge")
        .join("chat_history.txt");
    if let Some(parent) = history_path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let mut rl = rustyline::DefaultEditor::new()?;
    let _ = rl.load_history(&history_path);

    // Banner on stderr; stdout carries replies only.
    eprintln!("assistant-bridge chat (assistant {})", state.controller.assistant_id());
    eprintln!("Channel: {channel}  |  Type /help for commands, Ctrl+D to exit");
    eprintln!();

    loop {
        match rl.readline("you> ") {
            Ok(line) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }

                rl.add_history_entry(&line).ok();

                if trimmed.starts_with('/') {
                    match parse_slash_command(trimmed) {
                        SlashCommand::Exit => break,
                        cmd => run_slash_command(cmd, &state, &mut channel),
                    }
                    continue;
                }

                send_message(&state, &channel, trimmed).await;
            }
            Err(rustyline::error::ReadlineError::Interrupted) => {
                eprintln!("(Use Ctrl+D or /exit to quit)");
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(e) => {
                eprintln!("\x1B[31mreadline error: {e}\x1B[0m");
                break;
            }
        }
    }

    rl.save_history(&history_path).ok();
    eprintln!("Goodbye!");
    Ok(())
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Slash commands
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, PartialEq, Eq)]
enum SlashCommand<'a> {
    Exit,
    Help,
    Thread,
    /// `/channel` with no argument shows the current channel.
    Channel(Option<&'a str>),
    Unknown(&'a str),
}

fn parse_slash_command(input: &str) -> SlashCommand<'_> {
    let (cmd, arg) = match input.split_once(char::is_whitespace) {
        Some((cmd, rest)) => (cmd, Some(rest.trim()).filter(|s| !s.is_empty())),
        None => (input, None),
    };
    match cmd {
        "/exit" | "/quit" => SlashCommand::Exit,
        "/help" => SlashCommand::Help,
        "/thread" => SlashCommand::Thread,
        "/channel" => SlashCommand::Channel(arg),
        other => SlashCommand::Unknown(other),
    }
}

fn run_slash_command(cmd: SlashCommand<'_>, state: &BridgeState, channel: &mut String) {
    match cmd {
        SlashCommand::Exit => {}
        SlashCommand::Help => {
            eprintln!("Commands:");
            eprintln!("  /channel <id>    Switch to another channel (own thread)");
            eprintln!("  /thread          Show the thread behind the current channel");
            eprintln!("  /exit, /quit     Exit the chat");
            eprintln!("  /help            Show this help");
        }
        SlashCommand::Thread => match state.threads().lookup(channel) {
            Some(m) => eprintln!("Channel {channel} → {} (since {})", m.thread_id, m.created_at),
            None => eprintln!("Channel {channel} has no thread yet"),
        },
        SlashCommand::Channel(Some(id)) => {
            *channel = id.to_owned();
            eprintln!("Channel switched to: {channel}");
        }
        SlashCommand::Channel(None) => {
            eprintln!("Current channel: {channel}");
            eprintln!("Usage: /channel <id>");
        }
        SlashCommand::Unknown(other) => {
            eprintln!("Unknown command: {other}  (type /help for a list)");
        }
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Message relay
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

async fn send_message(state: &BridgeState, channel: &str, text: &str) {
    eprint!("\x1B[2m…\x1B[0m\r");
    let report = state.controller.handle_inbound_detailed(channel, text).await;

    match (&report.reply, report.poll) {
        (Some(reply), _) => {
            println!("{reply}");
            println!();
        }
        (None, Some(poll)) => {
            eprintln!("\x1B[2m(no reply: run {} after {} poll(s))\x1B[0m", poll.outcome, poll.polls);
        }
        (None, None) => {
            eprintln!("\x1B[31m(no reply: see log for details)\x1B[0m");
        }
    }
}
