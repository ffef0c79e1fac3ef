//! Data Transfer Objects for the assistants wire format.
//!
//! Only the fields the bridge reads are modelled; everything else in the
//! API responses is ignored on deserialization.

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Threads
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A durable, ordered conversation held by the remote API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    #[serde(default)]
    pub created_at: i64,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Messages
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    #[serde(default)]
    pub content: Vec<ContentPart>,
    #[serde(default)]
    pub run_id: Option<String>,
    #[serde(default)]
    pub created_at: i64,
}

impl Message {
    /// The text segments of this message in order. Non-text parts
    /// (images, file references) are skipped.
    pub fn text_segments(&self) -> impl Iterator<Item = &str> {
        self.content.iter().filter_map(|part| match part {
            ContentPart::Text { text } => Some(text.value.as_str()),
            ContentPart::Other => None,
        })
    }
}

/// One part of a message's content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: TextContent },
    #[serde(other)]
    Other,
}

impl ContentPart {
    pub fn text(value: impl Into<String>) -> Self {
        ContentPart::Text {
            text: TextContent {
                value: value.into(),
                annotations: Vec::new(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextContent {
    pub value: String,
    #[serde(default)]
    pub annotations: Vec<serde_json::Value>,
}

/// POST /threads/{thread}/messages: request body.
#[derive(Debug, Clone, Serialize)]
pub struct CreateMessageRequest<'a> {
    pub role: Role,
    pub content: &'a str,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Runs
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Lifecycle of a remote run.
///
/// `queued → in_progress → {completed, failed, expired, cancelled,
/// incomplete, requires_action}`; `cancelling` sits between a cancel
/// request and `cancelled`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    /// A status this client does not know about; treated as non-terminal.
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    /// No further transition will occur. `requires_action` is not
    /// terminal on the remote side; the poller handles it separately.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Completed | Self::Failed | Self::Cancelled | Self::Expired | Self::Incomplete
        )
    }

    pub fn is_success(self) -> bool {
        self == Self::Completed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::InProgress => "in_progress",
            Self::RequiresAction => "requires_action",
            Self::Cancelling => "cancelling",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
            Self::Completed => "completed",
            Self::Incomplete => "incomplete",
            Self::Expired => "expired",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: String,
    pub thread_id: String,
    #[serde(default)]
    pub assistant_id: Option<String>,
    pub status: RunStatus,
    #[serde(default)]
    pub last_error: Option<RunError>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    pub code: String,
    pub message: String,
}

/// POST /threads/{thread}/runs: request body.
#[derive(Debug, Clone, Serialize)]
pub struct CreateRunRequest<'a> {
    pub assistant_id: &'a str,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Assistants
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assistant {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub model: String,
}

/// POST /assistants: request body.
#[derive(Debug, Clone, Serialize)]
pub struct CreateAssistantRequest {
    pub name: String,
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Pagination
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Envelope of every list endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct ListResponse<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub last_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_status_parses_wire_names() {
        let run: Run = serde_json::from_str(
            r#"{"id":"run_1","object":"thread.run","thread_id":"thread_1","status":"requires_action"}"#,
        )
        .unwrap();
        assert_eq!(run.status, RunStatus::RequiresAction);
        assert!(!run.status.is_terminal());
    }

    #[test]
    fn unknown_run_status_is_not_terminal() {
        let run: Run = serde_json::from_str(
            r#"{"id":"run_1","thread_id":"thread_1","status":"paused_for_review"}"#,
        )
        .unwrap();
        assert_eq!(run.status, RunStatus::Unknown);
        assert!(!run.status.is_terminal());
    }

    #[test]
    fn only_completed_is_success() {
        for status in [
            RunStatus::Failed,
            RunStatus::Cancelled,
            RunStatus::Expired,
            RunStatus::Incomplete,
        ] {
            assert!(status.is_terminal());
            assert!(!status.is_success());
        }
        assert!(RunStatus::Completed.is_success());
        assert!(!RunStatus::Cancelling.is_terminal());
    }

    #[test]
    fn message_text_segments_skip_non_text_parts() {
        let msg: Message = serde_json::from_str(
            r#"{
                "id": "msg_1",
                "role": "assistant",
                "content": [
                    {"type": "text", "text": {"value": "Hello", "annotations": []}},
                    {"type": "image_file", "image_file": {"file_id": "file_1"}},
                    {"type": "text", "text": {"value": "world", "annotations": []}}
                ]
            }"#,
        )
        .unwrap();
        let segments: Vec<&str> = msg.text_segments().collect();
        assert_eq!(segments, vec!["Hello", "world"]);
    }

    #[test]
    fn list_response_parses_envelope() {
        let list: ListResponse<Assistant> = serde_json::from_str(
            r#"{
                "object": "list",
                "data": [{"id": "asst_1", "name": "Main Assistant", "model": "gpt-4o"}],
                "first_id": "asst_1",
                "last_id": "asst_1",
                "has_more": false
            }"#,
        )
        .unwrap();
        assert_eq!(list.data.len(), 1);
        assert_eq!(list.data[0].name.as_deref(), Some("Main Assistant"));
        assert!(!list.has_more);
    }

    #[test]
    fn create_assistant_omits_unset_fields() {
        let req = CreateAssistantRequest {
            name: "Main Assistant".into(),
            model: "gpt-4o".into(),
            instructions: None,
            description: None,
        };
        let json = serde_json::to_value(&req).unwrap();
        assert!(json.get("instructions").is_none());
        assert_eq!(json["model"], "gpt-4o");
    }
}
