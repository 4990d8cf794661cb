use chrono::{DateTime, Utc};
use serde::Serialize;

/// One JSONL record of a significant engine action, written by the global
/// audit log.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub seq: u64,
    pub ts: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: AuditEventKind,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuditEventKind {
    ToolCallDispatched { call_id: String, tool: String },
    ToolCallResult { call_id: String, ok: bool },
    QuotaReconciled { weighted_delta: f64, remaining: f64 },
    SessionTerminated { code: i32, message: Option<String> },
}

/// Sink for audit events. Implementations must never panic or propagate an
/// error back into the caller's control flow — a logging failure increments
/// a stats counter instead of aborting the session.
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent);
}

/// An audit sink that discards every event. Useful for tests and for
/// `--no-audit`-style configurations.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: AuditEvent) {}
}
