/// Stable error taxonomy for the tool-execution engine.
///
/// Variants map 1:1 onto the error kinds an LLM tool call can observe, plus
/// the process-level kinds (`ConfigError`, `BugAssertion`) that abort before
/// or outside any tool dispatch.
#[derive(thiserror::Error, Debug)]
pub enum EngineError {
    #[error("invalid arguments: {0}")]
    InvalidArgs(String),

    #[error("invalid fd {0}")]
    InvalidFd(u32),

    #[error("fd {0} is closed")]
    ClosedFd(u32),

    #[error("fd {0} is not readable")]
    NotReadable(u32),

    #[error("fd {0} is not writable")]
    NotWritable(u32),

    #[error("fd {0} is already closed")]
    AlreadyClosed(u32),

    #[error("fd {fd} has {open_dependents} open tee dependent(s); close them first")]
    DependencyViolation { fd: u32, open_dependents: u32 },

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("deprecated / forbidden parameter '{0}'")]
    DeprecatedParam(String),

    #[error("permission denied: '{0}' is not in the session allow-list")]
    Permission(String),

    #[error("file '{name}' exceeds size cap of {cap_bytes} bytes")]
    Size { name: String, cap_bytes: u64 },

    #[error("file '{0}' looks binary, refusing to read as text")]
    Binary(String),

    #[error("broken pipe on fd {0}")]
    BrokenPipe(u32),

    #[error("quota exhausted: {0} weighted units remaining")]
    QuotaExhausted(f64),

    #[error("session deadline exceeded after {0:.1}s")]
    Timeout(f64),

    #[error("transient upstream error: {0}")]
    Transient(String),

    #[error("configuration error: {0}")]
    ConfigError(String),

    #[error("audit log write failed: {0}")]
    AuditError(String),

    #[error("internal invariant violated: {0}")]
    BugAssertion(String),
}

impl EngineError {
    /// Whether this error is one the LLM can plausibly recover from by
    /// retrying or adjusting its next tool call, vs. one that terminates
    /// the session outright.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            EngineError::QuotaExhausted(_)
                | EngineError::Timeout(_)
                | EngineError::ConfigError(_)
                | EngineError::BugAssertion(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_invalid_fd() {
        let err = EngineError::InvalidFd(7);
        assert_eq!(err.to_string(), "invalid fd 7");
    }

    #[test]
    fn display_dependency_violation() {
        let err = EngineError::DependencyViolation {
            fd: 4,
            open_dependents: 2,
        };
        assert_eq!(
            err.to_string(),
            "fd 4 has 2 open tee dependent(s); close them first"
        );
    }

    #[test]
    fn display_deprecated_param() {
        let err = EngineError::DeprecatedParam("in_fd".to_string());
        assert_eq!(
            err.to_string(),
            "deprecated / forbidden parameter 'in_fd'"
        );
    }

    #[test]
    fn recoverable_classification() {
        assert!(EngineError::InvalidFd(0).is_recoverable());
        assert!(EngineError::BrokenPipe(3).is_recoverable());
        assert!(!EngineError::QuotaExhausted(0.0).is_recoverable());
        assert!(!EngineError::Timeout(300.0).is_recoverable());
        assert!(!EngineError::ConfigError("bad".into()).is_recoverable());
        assert!(!EngineError::BugAssertion("invariant".into()).is_recoverable());
    }

    #[test]
    fn is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<EngineError>();
    }
}
