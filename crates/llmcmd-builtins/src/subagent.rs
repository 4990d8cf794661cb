use crate::text::{wants_help, write_help};
use llmcmd_core::EngineError;
use std::io::{BufRead, Write};

const LLMCMD_HELP: &str =
    "llmcmd - run a recursive sub-session (not wired up in this build)\n\nUsage: llmcmd PROMPT\n\n  -h, --help  show this help\n";
const LLMSH_HELP: &str =
    "llmsh - run a recursive shell sub-session (not wired up in this build)\n\nUsage: llmsh PROMPT\n\n  -h, --help  show this help\n";

/// `llmcmd` / `llmsh` are registered members of the closed built-in enum
/// but, unlike the text filters in this crate, they name a *recursive*
/// sub-session rather than a pure stream transform: spawning one would need
/// its own broker handle, quota sub-budget, and FD sub-table. That
/// composition is the orchestrator's concern, not a filter's -- a filter
/// body has no way to reach the broker or table it would need. Until the
/// orchestrator grows a recursive-session path, dispatching either command
/// here is a clear, immediate error rather than a silent no-op.
fn unsupported(name: &str) -> EngineError {
    EngineError::InvalidArgs(format!(
        "'{name}' requires a recursive sub-session, which this build's spawn path does not wire up"
    ))
}

pub fn run_llmcmd(args: &[String], _reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, LLMCMD_HELP);
    }
    Err(unsupported("llmcmd"))
}

pub fn run_llmsh(args: &[String], _reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, LLMSH_HELP);
    }
    Err(unsupported("llmsh"))
}
