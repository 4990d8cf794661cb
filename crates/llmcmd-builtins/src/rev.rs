use crate::text::{read_lines, wants_help, write_help, write_lines};
use llmcmd_core::EngineError;
use std::io::{BufRead, Write};

const HELP: &str = "rev - reverse the characters of each line\n\nUsage: rev\n\n  -h, --help  show this help\n";

/// `rev`: reverse the characters of each line.
pub fn run(args: &[String], reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, HELP);
    }
    let lines = read_lines(reader)?;
    let reversed: Vec<String> = lines.iter().map(|l| l.chars().rev().collect()).collect();
    write_lines(writer, &reversed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn reverses_each_line() {
        let mut input = Cursor::new(b"abc\ndef\n".to_vec());
        let mut out = Vec::new();
        run(&[], &mut input, &mut out).unwrap();
        assert_eq!(out, b"cba\nfed\n");
    }

    #[test]
    fn help_flag_short_circuits() {
        let mut input = Cursor::new(Vec::new());
        let mut out = Vec::new();
        run(&["-h".to_string()], &mut input, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("rev - "));
    }
}
