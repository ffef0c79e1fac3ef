//! Relay chat messages to a hosted assistant and bring the reply back.
//!
//! [`runtime::ConversationController`] drives one inbound message through
//! thread lookup, message append, run launch, polling and reply extraction.
//! [`bootstrap`] wires it up from a [`Config`](ab_domain::config::Config);
//! [`cli`] holds the `assistant-bridge` subcommands.

pub mod bootstrap;
pub mod cli;
pub mod runtime;
