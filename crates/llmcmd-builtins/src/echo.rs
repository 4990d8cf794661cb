use crate::text::{wants_help, write_help};
use llmcmd_core::EngineError;
use std::io::{BufRead, Write};

const HELP: &str = "echo - print arguments\n\nUsage: echo [ARGS...]\n\n  -h, --help  show this help\n";

/// `echo ARGS...`: write the arguments, space-joined, followed by a
/// newline. Ignores stdin.
pub fn run(args: &[String], _reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, HELP);
    }
    writer
        .write_all(args.join(" ").as_bytes())
        .and_then(|_| writer.write_all(b"\n"))
        .map_err(|_| EngineError::BrokenPipe(0))
}
