//! The LLM broker and pricing resolver: serializes calls to the upstream
//! chat-completions API, soft-trims `max_tokens` against the session's
//! weighted-token budget, and reconciles actual usage afterward.

mod catalog;
mod client;
mod types;

pub use catalog::PricingCatalog;
pub use client::{Broker, BrokerConfig, MIN_VIABLE_MAX_TOKENS};
pub use types::{ChatMessage, ChatRequest, ChatResponse, ToolCall, ToolCallFunction, Usage};
