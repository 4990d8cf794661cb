use crate::text::{read_lines, wants_help, write_help};
use llmcmd_core::EngineError;
use std::io::{BufRead, Write};

const HELP: &str = "uniq - collapse consecutive identical lines\n\n\
Usage: uniq [-c]\n\n\
  -c          prefix each surviving line with its occurrence count\n\
  -h, --help  show this help\n";

/// `uniq [-c]`: collapse runs of consecutive identical lines. `-c` prefixes
/// each surviving line with its occurrence count.
pub fn run(args: &[String], reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, HELP);
    }
    let with_count = args.iter().any(|a| a == "-c");
    for other in args.iter().filter(|a| a.as_str() != "-c") {
        return Err(EngineError::InvalidArgs(format!("uniq: unknown argument '{other}'")));
    }

    let lines = read_lines(reader)?;
    let mut out_lines: Vec<String> = Vec::new();
    let mut counts: Vec<usize> = Vec::new();
    for line in lines {
        if out_lines.last() == Some(&line) {
            *counts.last_mut().unwrap() += 1;
        } else {
            out_lines.push(line);
            counts.push(1);
        }
    }

    for (line, count) in out_lines.iter().zip(counts.iter()) {
        let rendered = if with_count {
            format!("{count:>7} {line}")
        } else {
            line.clone()
        };
        writer
            .write_all(rendered.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|_| EngineError::BrokenPipe(0))?;
    }
    Ok(())
}
