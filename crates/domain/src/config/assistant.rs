use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Assistant definition
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Which remote assistant runs are launched against.
///
/// With `id` set the assistant is used as-is. Otherwise the assistant is
/// looked up by `name` and created from the remaining fields when absent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssistantConfig {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default = "d_name")]
    pub name: String,
    #[serde(default = "d_model")]
    pub model: String,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
}

impl Default for AssistantConfig {
    fn default() -> Self {
        Self {
            id: None,
            name: d_name(),
            model: d_model(),
            instructions: None,
            description: None,
        }
    }
}

fn d_name() -> String {
    "Main Assistant".into()
}
fn d_model() -> String {
    "gpt-4o".into()
}
