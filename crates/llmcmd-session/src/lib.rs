//! The interaction loop and audit log: drives turns against the broker,
//! dispatches tool calls through the FD table/orchestrator/VFS, and
//! records an append-only JSONL trail of every significant action.

mod audit_log;
mod engine;
mod tool_call;

pub use audit_log::FileAuditLog;
pub use engine::{resolve_dash, stdin_auto_binds, ExitOutcome, Session, SessionConfig};
pub use tool_call::{ReadCount, ToolCall};
