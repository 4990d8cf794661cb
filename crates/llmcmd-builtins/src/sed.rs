use crate::text::{read_lines, wants_help, write_help};
use llmcmd_core::EngineError;
use regex::Regex;
use std::io::{BufRead, Write};

const HELP: &str = "sed - stream editor (substitute command only)\n\n\
Usage: sed 's/PATTERN/REPLACEMENT/[g][i]'\n\n\
  /           any single non-alphanumeric delimiter may replace '/'\n\
  g           replace every match per line, not just the first\n\
  i           case-insensitive pattern match\n\
  -h, --help  show this help\n";

/// `sed 's/PATTERN/REPLACEMENT/[g][i]'`: the substitute command only. `/`
/// may be replaced by any single non-alphanumeric delimiter character.
pub fn run(args: &[String], reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, HELP);
    }
    if args.len() != 1 {
        return Err(EngineError::InvalidArgs(
            "sed requires exactly one script argument".to_string(),
        ));
    }
    let script = &args[0];
    let mut chars = script.chars();
    let cmd = chars.next().ok_or_else(|| EngineError::InvalidArgs("empty sed script".to_string()))?;
    if cmd != 's' {
        return Err(EngineError::InvalidArgs(format!(
            "unsupported sed command '{cmd}', only 's' is implemented"
        )));
    }
    let delim = chars
        .next()
        .ok_or_else(|| EngineError::InvalidArgs("sed script missing delimiter".to_string()))?;

    let rest: String = chars.collect();
    let parts: Vec<&str> = rest.splitn(3, delim).collect();
    if parts.len() != 3 {
        return Err(EngineError::InvalidArgs(
            "sed script must be 's/pattern/replacement/[flags]'".to_string(),
        ));
    }
    let (pattern, replacement, flags) = (parts[0], parts[1], parts[2]);
    let global = flags.contains('g');
    let ignore_case = flags.contains('i');

    let re = if ignore_case {
        Regex::new(&format!("(?i){pattern}"))
    } else {
        Regex::new(pattern)
    }
    .map_err(|e| EngineError::InvalidArgs(format!("invalid sed pattern: {e}")))?;

    // Convert `\1`-style backreferences to regex's `$1` syntax.
    let replacement = backref_to_dollar(replacement);

    let lines = read_lines(reader)?;
    for line in lines {
        let out = if global {
            re.replace_all(&line, replacement.as_str()).into_owned()
        } else {
            re.replace(&line, replacement.as_str()).into_owned()
        };
        writer
            .write_all(out.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|_| EngineError::BrokenPipe(0))?;
    }
    Ok(())
}

fn backref_to_dollar(replacement: &str) -> String {
    let mut out = String::with_capacity(replacement.len());
    let mut chars = replacement.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(d) = chars.peek() {
                if d.is_ascii_digit() {
                    out.push('$');
                    out.push(*d);
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}
