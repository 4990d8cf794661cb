use crate::text::{read_lines, wants_help, write_help};
use llmcmd_core::EngineError;
use std::io::{BufRead, Write};

const HELP: &str = "nl - number non-blank lines\n\n\
Usage: nl\n\n\
  Right-aligns a 6-wide line number and a tab before each non-blank line.\n\
  -h, --help  show this help\n";

/// `nl`: number non-blank lines, right-aligned in a 6-wide field followed by
/// a tab, matching traditional `nl` default behavior. Blank lines are
/// printed unnumbered.
pub fn run(args: &[String], reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, HELP);
    }
    let lines = read_lines(reader)?;
    let mut next_number = 1u64;
    for line in lines {
        let rendered = if line.is_empty() {
            String::new()
        } else {
            let n = next_number;
            next_number += 1;
            format!("{n:>6}\t{line}")
        };
        writer
            .write_all(rendered.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|_| EngineError::BrokenPipe(0))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn numbers_only_non_blank_lines() {
        let mut input = Cursor::new(b"first\n\nsecond\n".to_vec());
        let mut out = Vec::new();
        run(&[], &mut input, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "     1\tfirst\n\n     2\tsecond\n"
        );
    }

    #[test]
    fn help_flag_short_circuits() {
        let mut input = Cursor::new(Vec::new());
        let mut out = Vec::new();
        run(&["-h".to_string()], &mut input, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("nl - "));
    }
}
