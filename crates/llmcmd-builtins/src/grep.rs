use crate::text::{read_lines, wants_help, write_help};
use llmcmd_core::EngineError;
use regex::RegexBuilder;
use std::io::{BufRead, Write};

const HELP: &str = "grep - print lines matching a pattern\n\n\
Usage: grep [-i] [-v] [-n] PATTERN\n\n\
  -i          ignore case\n\
  -v          invert match\n\
  -n          prefix each printed line with its line number\n\
  -h, --help  show this help\n";

/// `grep [-i] [-v] [-n] PATTERN`: print lines matching (or, with `-v`, not
/// matching) a regular expression.
pub fn run(args: &[String], reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, HELP);
    }
    let mut ignore_case = false;
    let mut invert = false;
    let mut line_numbers = false;
    let mut pattern = None;

    for arg in args {
        match arg.as_str() {
            "-i" => ignore_case = true,
            "-v" => invert = true,
            "-n" => line_numbers = true,
            other => {
                if pattern.is_none() {
                    pattern = Some(other.to_string());
                } else {
                    return Err(EngineError::InvalidArgs(format!(
                        "grep accepts exactly one pattern, got extra '{other}'"
                    )));
                }
            }
        }
    }

    let pattern = pattern.ok_or_else(|| EngineError::InvalidArgs("grep requires a pattern".to_string()))?;
    let re = RegexBuilder::new(&pattern)
        .case_insensitive(ignore_case)
        .build()
        .map_err(|e| EngineError::InvalidArgs(format!("invalid pattern: {e}")))?;

    let lines = read_lines(reader)?;
    for (idx, line) in lines.iter().enumerate() {
        if re.is_match(line) != invert {
            if line_numbers {
                writer
                    .write_all(format!("{}:{}\n", idx + 1, line).as_bytes())
                    .map_err(|_| EngineError::BrokenPipe(0))?;
            } else {
                writer
                    .write_all(line.as_bytes())
                    .and_then(|_| writer.write_all(b"\n"))
                    .map_err(|_| EngineError::BrokenPipe(0))?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn filters_matching_lines() {
        let mut input = Cursor::new(b"apple\nbanana\navocado\n".to_vec());
        let mut out = Vec::new();
        run(&["^a".to_string()], &mut input, &mut out).unwrap();
        assert_eq!(out, b"apple\navocado\n");
    }

    #[test]
    fn invert_flag_negates_match() {
        let mut input = Cursor::new(b"apple\nbanana\n".to_vec());
        let mut out = Vec::new();
        run(&["-v".to_string(), "^a".to_string()], &mut input, &mut out).unwrap();
        assert_eq!(out, b"banana\n");
    }

    #[test]
    fn missing_pattern_is_an_error() {
        let mut input = Cursor::new(Vec::new());
        let mut out = Vec::new();
        assert!(run(&[], &mut input, &mut out).is_err());
    }

    #[test]
    fn help_flag_is_not_treated_as_a_pattern() {
        let mut input = Cursor::new(b"anything\n".to_vec());
        let mut out = Vec::new();
        run(&["-h".to_string()], &mut input, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("grep - "));
    }

    #[test]
    fn line_numbers_flag_prefixes_index() {
        let mut input = Cursor::new(b"a\nb\na\n".to_vec());
        let mut out = Vec::new();
        run(&["-n".to_string(), "a".to_string()], &mut input, &mut out).unwrap();
        assert_eq!(out, b"1:a\n3:a\n");
    }
}
