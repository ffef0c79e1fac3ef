//! Shared domain types for assistant-bridge: the error enum, the
//! configuration tree and structured trace events.

pub mod config;
pub mod error;
pub mod trace;
