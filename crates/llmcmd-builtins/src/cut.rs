use crate::text::{read_lines, wants_help, write_help};
use llmcmd_core::EngineError;
use std::io::{BufRead, Write};

const HELP: &str = "cut - select fields from each line\n\n\
Usage: cut -f FIELDS [-d DELIM]\n\n\
  -f FIELDS   comma-separated, 1-based field list\n\
  -d DELIM    field delimiter (default: tab)\n\
  -h, --help  show this help\n";

/// `cut -d DELIM -f FIELDS`: select the given, comma-separated, 1-based
/// field list from each delimiter-separated line. `DELIM` defaults to tab.
pub fn run(args: &[String], reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, HELP);
    }

    let mut delim = '\t';
    let mut fields: Option<Vec<usize>> = None;

    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-d" => {
                let value = iter
                    .next()
                    .ok_or_else(|| EngineError::InvalidArgs("-d requires a delimiter".to_string()))?;
                delim = value
                    .chars()
                    .next()
                    .ok_or_else(|| EngineError::InvalidArgs("-d delimiter must not be empty".to_string()))?;
            }
            "-f" => {
                let value = iter
                    .next()
                    .ok_or_else(|| EngineError::InvalidArgs("-f requires a field list".to_string()))?;
                let parsed = value
                    .split(',')
                    .map(|s| {
                        s.trim()
                            .parse::<usize>()
                            .map_err(|_| EngineError::InvalidArgs(format!("invalid field '{s}'")))
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                fields = Some(parsed);
            }
            other => return Err(EngineError::InvalidArgs(format!("cut: unknown argument '{other}'"))),
        }
    }

    let fields = fields.ok_or_else(|| EngineError::InvalidArgs("cut requires -f FIELDS".to_string()))?;
    if fields.iter().any(|&f| f == 0) {
        return Err(EngineError::InvalidArgs("cut field numbers are 1-based".to_string()));
    }

    let lines = read_lines(reader)?;
    for line in lines {
        let parts: Vec<&str> = line.split(delim).collect();
        let selected: Vec<&str> = fields
            .iter()
            .filter_map(|&f| parts.get(f - 1).copied())
            .collect();
        writer
            .write_all(selected.join(&delim.to_string()).as_bytes())
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
    fn selects_fields_by_index() {
        let mut input = Cursor::new(b"a:b:c\nd:e:f\n".to_vec());
        let mut out = Vec::new();
        run(
            &["-d".to_string(), ":".to_string(), "-f".to_string(), "1,3".to_string()],
            &mut input,
            &mut out,
        )
        .unwrap();
        assert_eq!(out, b"a:c\nd:f\n");
    }

    #[test]
    fn defaults_to_tab_delimiter() {
        let mut input = Cursor::new(b"a\tb\tc\n".to_vec());
        let mut out = Vec::new();
        run(&["-f".to_string(), "2".to_string()], &mut input, &mut out).unwrap();
        assert_eq!(out, b"b\n");
    }

    #[test]
    fn missing_fields_flag_is_an_error() {
        let mut input = Cursor::new(Vec::new());
        let mut out = Vec::new();
        assert!(run(&[], &mut input, &mut out).is_err());
    }

    #[test]
    fn help_flag_is_handled_before_validation() {
        let mut input = Cursor::new(Vec::new());
        let mut out = Vec::new();
        run(&["-h".to_string()], &mut input, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("cut - "));
    }
}
