use crate::text::{parse_count_flag, read_lines, wants_help, write_help, write_lines};
use llmcmd_core::EngineError;
use std::io::{BufRead, Write};

const HEAD_HELP: &str = "head - print the first lines of input\n\n\
Usage: head [-n N]\n\n\
  -n N        print the first N lines (default 10)\n\
  -h, --help  show this help\n";

const TAIL_HELP: &str = "tail - print the last lines of input\n\n\
Usage: tail [-n N]\n\n\
  -n N        print the last N lines (default 10)\n\
  -h, --help  show this help\n";

/// `head [-n N]`: the first `N` lines (default 10).
pub fn run_head(args: &[String], reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, HEAD_HELP);
    }
    let n = parse_count_flag(args, "-n", 10)?;
    let lines = read_lines(reader)?;
    write_lines(writer, &lines[..lines.len().min(n)])
}

/// `tail [-n N]`: the last `N` lines (default 10).
pub fn run_tail(args: &[String], reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, TAIL_HELP);
    }
    let n = parse_count_flag(args, "-n", 10)?;
    let lines = read_lines(reader)?;
    let start = lines.len().saturating_sub(n);
    write_lines(writer, &lines[start..])
}
