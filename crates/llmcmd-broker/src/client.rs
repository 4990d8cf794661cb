//! The LLM broker: a single-flight HTTP client over the upstream
//! chat-completions endpoint, enforcing the weighted-token quota before
//! every dispatch and reconciling actual usage after.

use crate::catalog::PricingCatalog;
use crate::types::{ChatRequest, ChatResponse, ToolCall, Usage};
use llmcmd_core::{EngineError, SessionStats};
use reqwest::StatusCode;
use reqwest::header::{HeaderMap, RETRY_AFTER};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;

/// Below this trimmed `max_tokens`, a dispatched call is marked
/// "last chance" rather than denied outright.
pub const MIN_VIABLE_MAX_TOKENS: u32 = 16;

const MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF: Duration = Duration::from_millis(200);

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub request_timeout: Duration,
}

struct BrokerState {
    remaining_weighted: f64,
    total_weighted_used: f64,
}

/// Exposes `Chat(ctx, req) -> resp`, serializing all calls so concurrent
/// callers queue behind one in-flight request.
pub struct Broker {
    http: reqwest::Client,
    config: BrokerConfig,
    catalog: PricingCatalog,
    state: Mutex<BrokerState>,
    stats: Arc<SessionStats>,
}

impl Broker {
    pub fn new(
        config: BrokerConfig,
        catalog: PricingCatalog,
        initial_budget: f64,
        stats: Arc<SessionStats>,
    ) -> Result<Self, EngineError> {
        let http = reqwest::Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| EngineError::ConfigError(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            config,
            catalog,
            state: Mutex::new(BrokerState {
                remaining_weighted: initial_budget,
                total_weighted_used: 0.0,
            }),
            stats,
        })
    }

    pub async fn remaining_weighted(&self) -> f64 {
        self.state.lock().await.remaining_weighted
    }

    pub async fn total_weighted_used(&self) -> f64 {
        self.state.lock().await.total_weighted_used
    }

    /// Dispatch one chat turn. Holds the broker's internal lock for the
    /// full request/response cycle, which is what makes the broker
    /// single-flight.
    pub async fn chat(&self, mut req: ChatRequest, tools: Value) -> Result<ChatResponse, EngineError> {
        req.tools = tools;
        if req.model.is_empty() {
            req.model = self.config.model.clone();
        }

        let mut state = self.state.lock().await;
        if state.remaining_weighted <= 0.0 {
            return Err(EngineError::QuotaExhausted(state.remaining_weighted));
        }

        let (weights, _source) = self.catalog.resolve(&req.model);
        let last_chance = if weights.output > 0.0 {
            let cap = (state.remaining_weighted / weights.output).floor().max(0.0) as u32;
            req.max_tokens = req.max_tokens.min(cap.max(1));
            cap < MIN_VIABLE_MAX_TOKENS
        } else {
            false
        };

        let mut response = self.dispatch_with_retry(&req).await?;
        let weighted = weights.weigh(
            response.usage.prompt_tokens,
            response.usage.prompt_cached_tokens,
            response.usage.completion_tokens,
        );
        state.remaining_weighted -= weighted;
        state.total_weighted_used += weighted;
        response.last_chance = last_chance;
        Ok(response)
    }

    async fn dispatch_with_retry(&self, req: &ChatRequest) -> Result<ChatResponse, EngineError> {
        let url = format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'));
        let mut attempt = 0u32;
        loop {
            attempt += 1;
            let body = json!({
                "model": req.model,
                "messages": req.messages,
                "tools": req.tools,
                "max_tokens": req.max_tokens,
                "temperature": req.temperature,
            });

            let sent = self
                .http
                .post(&url)
                .bearer_auth(&self.config.api_key)
                .json(&body)
                .send()
                .await;

            let response = match sent {
                Ok(resp) => resp,
                Err(err) if attempt < MAX_ATTEMPTS && !err.is_timeout() => {
                    self.stats.record_retry();
                    tokio::time::sleep(BASE_BACKOFF * 2u32.pow(attempt - 1)).await;
                    continue;
                }
                Err(err) => {
                    return Err(EngineError::Transient(format!("broker request failed: {err}")));
                }
            };

            let status = response.status();
            let headers = response.headers().clone();
            let text = response
                .text()
                .await
                .map_err(|e| EngineError::Transient(format!("failed to read response body: {e}")))?;

            if status.is_success() {
                return parse_chat_response(&text);
            }

            if is_auth_or_client_error(status) {
                return Err(EngineError::ConfigError(format!(
                    "broker request rejected: status {status}"
                )));
            }

            if is_rate_or_quota_error(status, &text) && attempt < MAX_ATTEMPTS {
                self.stats.record_retry();
                let backoff = parse_retry_after(&headers).unwrap_or(BASE_BACKOFF * 2u32.pow(attempt - 1));
                tokio::time::sleep(backoff).await;
                continue;
            }

            if attempt < MAX_ATTEMPTS {
                self.stats.record_retry();
                tokio::time::sleep(BASE_BACKOFF * 2u32.pow(attempt - 1)).await;
                continue;
            }

            return Err(EngineError::Transient(format!(
                "broker request failed after {attempt} attempts: status {status}, body {text}"
            )));
        }
    }
}

fn is_auth_or_client_error(status: StatusCode) -> bool {
    status == StatusCode::UNAUTHORIZED
        || status == StatusCode::FORBIDDEN
        || status == StatusCode::BAD_REQUEST
        || status == StatusCode::NOT_FOUND
}

fn is_rate_or_quota_error(status: StatusCode, body: &str) -> bool {
    if status == StatusCode::TOO_MANY_REQUESTS {
        return true;
    }
    let lower = body.to_ascii_lowercase();
    lower.contains("rate_limit") || lower.contains("quota") || lower.contains("insufficient_quota")
}

fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    let raw = headers.get(RETRY_AFTER)?.to_str().ok()?.trim();
    raw.parse::<u64>().ok().map(Duration::from_secs)
}

fn parse_chat_response(body: &str) -> Result<ChatResponse, EngineError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| EngineError::Transient(format!("malformed completion JSON: {e}")))?;

    let message = value
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .ok_or_else(|| EngineError::Transient("missing choices[0].message in completion response".to_string()))?;

    let content = message.get("content").and_then(Value::as_str).map(str::to_string);

    let tool_calls: Vec<ToolCall> = message
        .get("tool_calls")
        .and_then(Value::as_array)
        .map(|arr| {
            arr.iter()
                .filter_map(|v| serde_json::from_value::<ToolCall>(v.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    let usage = value
        .get("usage")
        .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok())
        .unwrap_or_default();

    Ok(ChatResponse {
        content,
        tool_calls,
        usage,
        last_chance: false,
    })
}
