//! REST implementation of [`AssistantsApi`].
//!
//! `RestAssistantsClient` wraps a `reqwest::Client` and translates every
//! trait method into the corresponding HTTP call. Reads and thread creation
//! are retried with exponential back-off on transient (5xx / 429 / timeout)
//! failures; calls that append, start or cancel something are sent once.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use uuid::Uuid;

use ab_domain::config::ApiConfig;
use ab_domain::error::{Error, Result};
use ab_domain::trace::TraceEvent;

use crate::api::AssistantsApi;
use crate::auth::resolve_api_key;
use crate::types::{
    Assistant, CreateAssistantRequest, CreateMessageRequest, CreateRunRequest, ListResponse,
    Message, Role, Run, Thread,
};

/// Page size used when walking paginated list endpoints.
const PAGE_LIMIT: u32 = 100;

/// Whether a failed call may be sent again.
///
/// A POST that timed out may still have been applied server-side, so only
/// calls whose repetition is harmless are retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Retry {
    Transient,
    Never,
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Client
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// A REST client for the hosted assistants API.
///
/// Created once and shared for the lifetime of the process; the underlying
/// `reqwest::Client` maintains a connection pool.
#[derive(Debug, Clone)]
pub struct RestAssistantsClient {
    http: Client,
    base_url: String,
    api_key: String,
    beta_header: Option<String>,
    max_retries: u32,
}

impl RestAssistantsClient {
    /// Build a client from `ApiConfig`, resolving the API key eagerly.
    pub fn new(cfg: &ApiConfig) -> Result<Self> {
        let api_key = resolve_api_key(&cfg.auth)?;
        Self::with_key(cfg, api_key)
    }

    /// Build a client with an already-resolved API key.
    pub fn with_key(cfg: &ApiConfig, api_key: String) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_millis(cfg.timeout_ms))
            .build()
            .map_err(from_reqwest)?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_owned(),
            api_key,
            beta_header: cfg.beta_header.clone(),
            max_retries: cfg.max_retries,
        })
    }

    // ── request helpers ──────────────────────────────────────────────

    /// Add auth, content-type, beta and request-id headers.
    fn decorate(&self, rb: RequestBuilder) -> RequestBuilder {
        let mut rb = rb
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .header("X-Request-Id", Uuid::new_v4().to_string());
        if let Some(ref beta) = self.beta_header {
            rb = rb.header("OpenAI-Beta", beta);
        }
        rb
    }

    /// Build the full URL for a path like `/threads`.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    // ── retry engine ─────────────────────────────────────────────────

    /// Execute a request with retry + exponential back-off on transient errors.
    ///
    /// * With `Retry::Transient`, retries on 5xx, 429 and transport failures.
    /// * With `Retry::Never`, the request is sent exactly once.
    /// * Does **not** retry on other 4xx (client errors are permanent).
    /// * Emits a `TraceEvent::ApiCall` after every attempt.
    async fn execute_with_retry(
        &self,
        endpoint: &str,
        retry: Retry,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<Response> {
        let max_retries = match retry {
            Retry::Transient => self.max_retries,
            Retry::Never => 0,
        };
        let mut last_err: Option<Error> = None;

        for attempt in 0..=max_retries {
            if attempt > 0 {
                let backoff = Duration::from_millis(200 * 2u64.pow(attempt - 1));
                tracing::debug!(endpoint, attempt, ?backoff, "retrying assistants API call");
                tokio::time::sleep(backoff).await;
            }

            let start = Instant::now();
            let result = self.decorate(build_request()).send().await;
            let duration_ms = start.elapsed().as_millis() as u64;

            match result {
                Ok(resp) => {
                    let status = resp.status();

                    TraceEvent::ApiCall {
                        endpoint: endpoint.to_owned(),
                        status: status.as_u16(),
                        duration_ms,
                    }
                    .emit();

                    if status.is_success() {
                        return Ok(resp);
                    }

                    let body = resp.text().await.unwrap_or_default();
                    let err = status_error(endpoint, status, body);
                    if err.is_transient() {
                        last_err = Some(err);
                        continue;
                    }
                    return Err(err);
                }
                Err(e) => {
                    TraceEvent::ApiCall {
                        endpoint: endpoint.to_owned(),
                        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                        duration_ms,
                    }
                    .emit();

                    last_err = Some(from_reqwest(e));
                }
            }
        }

        Err(last_err.unwrap_or_else(|| Error::Other(format!("{endpoint}: all retries exhausted"))))
    }

    /// Execute and decode the JSON body into `T`.
    async fn execute_json<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        retry: Retry,
        build_request: impl Fn() -> RequestBuilder,
    ) -> Result<T> {
        let resp = self.execute_with_retry(endpoint, retry, build_request).await?;
        let body = resp.text().await.map_err(from_reqwest)?;
        serde_json::from_str(&body).map_err(|e| {
            Error::Other(format!("{endpoint}: failed to parse response: {e}: {body}"))
        })
    }
}

/// Map a non-success HTTP status to a domain error.
fn status_error(endpoint: &str, status: StatusCode, body: String) -> Error {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        return Error::Auth(format!("{endpoint} auth failed ({}): {body}", status.as_u16()));
    }
    Error::Api {
        endpoint: endpoint.to_owned(),
        status: status.as_u16(),
        message: body,
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Trait implementation
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[async_trait]
impl AssistantsApi for RestAssistantsClient {
    async fn create_thread(&self) -> Result<Thread> {
        let url = self.url("/threads");
        self.execute_json("POST /threads", Retry::Transient, || {
            self.http.post(&url).json(&serde_json::json!({}))
        })
        .await
    }

    async fn create_message(&self, thread_id: &str, text: &str) -> Result<Message> {
        let url = self.url(&format!("/threads/{thread_id}/messages"));
        let req = CreateMessageRequest {
            role: Role::User,
            content: text,
        };
        self.execute_json("POST /threads/{thread}/messages", Retry::Never, || {
            self.http.post(&url).json(&req)
        })
        .await
    }

    async fn create_run(&self, thread_id: &str, assistant_id: &str) -> Result<Run> {
        let url = self.url(&format!("/threads/{thread_id}/runs"));
        let req = CreateRunRequest { assistant_id };
        self.execute_json("POST /threads/{thread}/runs", Retry::Never, || {
            self.http.post(&url).json(&req)
        })
        .await
    }

    async fn retrieve_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let url = self.url(&format!("/threads/{thread_id}/runs/{run_id}"));
        self.execute_json("GET /threads/{thread}/runs/{run}", Retry::Transient, || {
            self.http.get(&url)
        })
        .await
    }

    async fn cancel_run(&self, thread_id: &str, run_id: &str) -> Result<Run> {
        let url = self.url(&format!("/threads/{thread_id}/runs/{run_id}/cancel"));
        self.execute_json("POST /threads/{thread}/runs/{run}/cancel", Retry::Never, || {
            self.http.post(&url)
        })
        .await
    }

    async fn list_messages(&self, thread_id: &str, limit: u32) -> Result<Vec<Message>> {
        let url = self.url(&format!("/threads/{thread_id}/messages"));
        let list: ListResponse<Message> = self
            .execute_json("GET /threads/{thread}/messages", Retry::Transient, || {
                self.http
                    .get(&url)
                    .query(&[("order", "desc"), ("limit", &limit.to_string())])
            })
            .await?;
        Ok(list.data)
    }

    async fn list_assistants(&self) -> Result<Vec<Assistant>> {
        let url = self.url("/assistants");
        let limit = PAGE_LIMIT.to_string();
        let mut after: Option<String> = None;
        let mut all = Vec::new();

        loop {
            let page: ListResponse<Assistant> = self
                .execute_json("GET /assistants", Retry::Transient, || {
                    let mut rb = self
                        .http
                        .get(&url)
                        .query(&[("order", "desc"), ("limit", limit.as_str())]);
                    if let Some(ref cursor) = after {
                        rb = rb.query(&[("after", cursor.as_str())]);
                    }
                    rb
                })
                .await?;

            all.extend(page.data);
            match (page.has_more, page.last_id) {
                (true, Some(last)) => after = Some(last),
                _ => break,
            }
        }

        Ok(all)
    }

    async fn create_assistant(&self, req: &CreateAssistantRequest) -> Result<Assistant> {
        let url = self.url("/assistants");
        self.execute_json("POST /assistants", Retry::Never, || {
            self.http.post(&url).json(req)
        })
        .await
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Error conversion helper
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Convert a `reqwest::Error` into a domain `Error`.
///
/// Timeout errors become `Error::Timeout`; everything else becomes
/// `Error::Http`.
pub fn from_reqwest(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout(e.to_string())
    } else {
        Error::Http(e.to_string())
    }
}
