use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Remote conversation API
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the assistants API, e.g. `https://api.openai.com/v1`.
    #[serde(default = "d_base_url")]
    pub base_url: String,
    /// Value of the `OpenAI-Beta` header. `None` omits the header.
    #[serde(default = "d_beta_header")]
    pub beta_header: Option<String>,
    /// Per-request timeout.
    #[serde(default = "d_timeout_ms")]
    pub timeout_ms: u64,
    /// Retries on transient (5xx / 429 / transport) failures. Applies to
    /// reads and thread creation; appends, run starts and cancels are sent
    /// once.
    #[serde(default = "d_max_retries")]
    pub max_retries: u32,
    #[serde(default = "d_auth")]
    pub auth: AuthConfig,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: d_base_url(),
            beta_header: d_beta_header(),
            timeout_ms: d_timeout_ms(),
            max_retries: d_max_retries(),
            auth: d_auth(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AuthConfig {
    /// Env var containing the key.
    #[serde(default)]
    pub env: Option<String>,
    /// Direct key (for config-only setups; prefer env or keychain).
    #[serde(default)]
    pub key: Option<String>,
    /// Keychain service name (e.g. `"assistant-bridge"`).
    #[serde(default)]
    pub service: Option<String>,
    /// Keychain account name (e.g. `"openai-api-key"`).
    #[serde(default)]
    pub account: Option<String>,
}

fn d_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn d_beta_header() -> Option<String> {
    Some("assistants=v2".into())
}
fn d_timeout_ms() -> u64 {
    30_000
}
fn d_max_retries() -> u32 {
    2
}
fn d_auth() -> AuthConfig {
    AuthConfig {
        env: Some("OPENAI_API_KEY".into()),
        ..Default::default()
    }
}
