use crate::text::{read_lines, wants_help, write_help, write_lines};
use llmcmd_core::EngineError;
use std::cmp::Ordering;
use std::io::{BufRead, Write};

const HELP: &str = "sort - sort lines of input\n\n\
Usage: sort [-r] [-n] [-u]\n\n\
  -n          numeric comparison instead of lexical\n\
  -r          reverse the result\n\
  -u          drop duplicates after sorting\n\
  -h, --help  show this help\n";

/// `sort [-r] [-n] [-u]`: lexical sort by default; `-n` numeric, `-r`
/// reverse, `-u` drop duplicates after sorting.
pub fn run(args: &[String], reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, HELP);
    }
    let mut reverse = false;
    let mut numeric = false;
    let mut unique = false;
    for arg in args {
        match arg.as_str() {
            "-r" => reverse = true,
            "-n" => numeric = true,
            "-u" => unique = true,
            other => return Err(EngineError::InvalidArgs(format!("sort: unknown flag '{other}'"))),
        }
    }

    let mut lines = read_lines(reader)?;
    lines.sort_by(|a, b| {
        let ord = if numeric {
            let na: f64 = a.trim().parse().unwrap_or(f64::NEG_INFINITY);
            let nb: f64 = b.trim().parse().unwrap_or(f64::NEG_INFINITY);
            na.partial_cmp(&nb).unwrap_or(Ordering::Equal)
        } else {
            a.cmp(b)
        };
        if reverse {
            ord.reverse()
        } else {
            ord
        }
    });
    if unique {
        lines.dedup();
    }
    write_lines(writer, &lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn sorts_lexically_by_default() {
        let mut input = Cursor::new(b"banana\napple\ncherry\n".to_vec());
        let mut out = Vec::new();
        run(&[], &mut input, &mut out).unwrap();
        assert_eq!(out, b"apple\nbanana\ncherry\n");
    }

    #[test]
    fn numeric_flag_sorts_by_value() {
        let mut input = Cursor::new(b"10\n2\n1\n".to_vec());
        let mut out = Vec::new();
        run(&["-n".to_string()], &mut input, &mut out).unwrap();
        assert_eq!(out, b"1\n2\n10\n");
    }

    #[test]
    fn reverse_and_unique_compose() {
        let mut input = Cursor::new(b"b\na\nb\na\n".to_vec());
        let mut out = Vec::new();
        run(&["-r".to_string(), "-u".to_string()], &mut input, &mut out).unwrap();
        assert_eq!(out, b"b\na\n");
    }

    #[test]
    fn help_flag_is_handled_before_unknown_flag_rejection() {
        let mut input = Cursor::new(Vec::new());
        let mut out = Vec::new();
        run(&["--help".to_string()], &mut input, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("sort - "));
    }
}
