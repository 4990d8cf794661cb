//! JSONL audit log: one line per significant engine action, appended to a
//! file and mirrored to `tracing`. A write failure never propagates -- it
//! increments `SessionStats::audit_write_failures` and is otherwise
//! swallowed; logging must never crash the session.

use llmcmd_core::{AuditEvent, AuditSink, SessionStats};
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct FileAuditLog {
    writer: Mutex<BufWriter<File>>,
    stats: Arc<SessionStats>,
}

impl FileAuditLog {
    pub fn init(path: &Path, stats: Arc<SessionStats>) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            writer: Mutex::new(BufWriter::new(file)),
            stats,
        })
    }

    /// Flush and drop the underlying file handle.
    pub fn close(self) {
        if let Ok(mut w) = self.writer.lock() {
            let _ = w.flush();
        }
    }
}

impl AuditSink for FileAuditLog {
    fn record(&self, event: AuditEvent) {
        let line = match serde_json::to_string(&event) {
            Ok(line) => line,
            Err(err) => {
                tracing::warn!(%err, "failed to serialize audit event");
                self.stats.record_audit_failure();
                return;
            }
        };

        let wrote = (|| -> std::io::Result<()> {
            let mut writer = self
                .writer
                .lock()
                .map_err(|_| std::io::Error::other("audit log writer lock poisoned"))?;
            writeln!(writer, "{line}")?;
            writer.flush()
        })();

        if let Err(err) = wrote {
            tracing::warn!(%err, "audit log write failed");
            self.stats.record_audit_failure();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use llmcmd_core::AuditEventKind;
    use std::io::BufRead;

    #[test]
    fn appends_one_json_line_per_event() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("audit.jsonl");
        let stats = Arc::new(SessionStats::new());
        let log = FileAuditLog::init(&path, Arc::clone(&stats)).unwrap();

        log.record(AuditEvent {
            seq: 1,
            ts: chrono::Utc::now(),
            kind: AuditEventKind::ToolCallDispatched {
                call_id: "call_1".to_string(),
                tool: "read".to_string(),
            },
        });
        log.record(AuditEvent {
            seq: 2,
            ts: chrono::Utc::now(),
            kind: AuditEventKind::SessionTerminated { code: 0, message: None },
        });
        log.close();

        let contents = std::fs::read(&path).unwrap();
        let lines: Vec<_> = contents.lines().map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("\"seq\":1"));
        assert!(lines[1].contains("session_terminated"));
        assert_eq!(stats.snapshot().audit_write_failures, 0);
    }
}
