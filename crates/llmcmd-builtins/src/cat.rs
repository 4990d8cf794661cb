use crate::text::{wants_help, write_help};
use llmcmd_core::EngineError;
use std::io::{BufRead, Write};

const HELP: &str = "cat - copy input to output verbatim\n\nUsage: cat\n\n  -h, --help  show this help\n";

/// Copy `reader` to `writer` verbatim. `args` beyond `-h`/`--help` is
/// ignored: any file name an LLM passes to `cat` is resolved upstream by
/// the orchestrator.
pub fn run(args: &[String], reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, HELP);
    }
    std::io::copy(reader, writer).map_err(|_| EngineError::BrokenPipe(0))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn copies_bytes_verbatim() {
        let mut input = Cursor::new(b"line1\nline2\n".to_vec());
        let mut out = Vec::new();
        run(&[], &mut input, &mut out).unwrap();
        assert_eq!(out, b"line1\nline2\n");
    }

    #[test]
    fn ignores_args() {
        let mut input = Cursor::new(b"x".to_vec());
        let mut out = Vec::new();
        run(&["whatever.txt".to_string()], &mut input, &mut out).unwrap();
        assert_eq!(out, b"x");
    }

    #[test]
    fn help_flag_short_circuits_without_reading_stdin() {
        let mut input = Cursor::new(b"should not be read".to_vec());
        let mut out = Vec::new();
        run(&["--help".to_string()], &mut input, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("cat - "));
    }
}
