//! `ab-assistants`: client crate for the hosted assistants API.
//!
//! Provides the [`AssistantsApi`] trait over the thread / message / run
//! endpoints, a production REST implementation ([`RestAssistantsClient`])
//! with retry on transient failures, typed DTOs for the wire format, API
//! key resolution, and [`resolve_assistant_id`] which finds or creates the
//! configured assistant.
//!
//! # Quick start
//!
//! ```rust,no_run
//! use ab_domain::config::ApiConfig;
//! use ab_assistants::{AssistantsApi, RestAssistantsClient};
//!
//! # async fn example() -> ab_domain::error::Result<()> {
//! let client = RestAssistantsClient::new(&ApiConfig::default())?;
//! let thread = client.create_thread().await?;
//! client.create_message(&thread.id, "hello").await?;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod assistant;
pub mod auth;
pub mod rest;
pub mod types;

#[cfg(any(test, feature = "test-util"))]
pub mod fake;

// ── Re-exports for ergonomic imports ─────────────────────────────────

pub use api::AssistantsApi;
pub use assistant::resolve_assistant_id;
pub use rest::{from_reqwest, RestAssistantsClient};
pub use types::{
    Assistant, ContentPart, CreateAssistantRequest, Message, Role, Run, RunStatus, Thread,
};
