//! Shared types and error taxonomy for the llmcmd tool-execution engine.

pub mod audit;
pub mod error;
pub mod stats;
pub mod types;

pub use audit::{AuditEvent, AuditEventKind, AuditSink, NullAuditSink};
pub use error::EngineError;
pub use stats::SessionStats;
pub use types::{BuiltinCommand, FdDirection, ModelWeights, PricingSource};
