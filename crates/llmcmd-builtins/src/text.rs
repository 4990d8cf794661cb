//! Small helpers shared by several filters.

use llmcmd_core::EngineError;
use std::io::{BufRead, Write};

/// True if `args` asks for help. Every filter checks this before touching
/// its reader, so `-h`/`--help` never gets mistaken for a pattern, script,
/// or file argument.
pub fn wants_help(args: &[String]) -> bool {
    args.iter().any(|a| a == "-h" || a == "--help")
}

/// Write a canonical help block and return without reading stdin.
pub fn write_help(writer: &mut dyn Write, block: &str) -> Result<(), EngineError> {
    writer
        .write_all(block.as_bytes())
        .map_err(|_| EngineError::BrokenPipe(0))
}

/// Read every line from `reader`, stripping the trailing `\n` (and a
/// preceding `\r`, for inputs produced on another platform). The final
/// element carries whatever trailing partial line had no newline.
pub fn read_lines(reader: &mut dyn BufRead) -> Result<Vec<String>, EngineError> {
    let mut lines = Vec::new();
    let mut buf = String::new();
    loop {
        buf.clear();
        let n = reader
            .read_line(&mut buf)
            .map_err(|e| EngineError::InvalidArgs(format!("read error: {e}")))?;
        if n == 0 {
            break;
        }
        if buf.ends_with('\n') {
            buf.pop();
            if buf.ends_with('\r') {
                buf.pop();
            }
        }
        lines.push(std::mem::take(&mut buf));
    }
    Ok(lines)
}

/// Write `lines` to `writer`, each terminated with `\n`.
pub fn write_lines(writer: &mut dyn Write, lines: &[impl AsRef<str>]) -> Result<(), EngineError> {
    for line in lines {
        writer
            .write_all(line.as_ref().as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|_| EngineError::BrokenPipe(0))?;
    }
    Ok(())
}

/// Parse a `-n N` / `-nN` style numeric flag, returning `default` if absent.
pub fn parse_count_flag(args: &[String], flag: &str, default: usize) -> Result<usize, EngineError> {
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == flag {
            let value = iter
                .next()
                .ok_or_else(|| EngineError::InvalidArgs(format!("{flag} requires a value")))?;
            return value
                .parse()
                .map_err(|_| EngineError::InvalidArgs(format!("invalid count '{value}'")));
        }
        if let Some(rest) = arg.strip_prefix(flag) {
            if !rest.is_empty() {
                return rest
                    .parse()
                    .map_err(|_| EngineError::InvalidArgs(format!("invalid count '{rest}'")));
            }
        }
    }
    Ok(default)
}
