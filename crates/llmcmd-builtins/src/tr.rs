use crate::text::{wants_help, write_help};
use llmcmd_core::EngineError;
use std::io::{BufRead, Read, Write};

const HELP: &str = "tr - translate or delete characters\n\n\
Usage: tr SET1 SET2\n       tr -d SET1\n\n\
  SET1 SET2   map each byte in SET1 to the byte at the same position in SET2\n\
  -d SET1     delete every byte in SET1\n\
  -h, --help  show this help\n";

/// `tr SET1 SET2`: map each byte in `SET1` to the byte at the same position
/// in `SET2`. `tr -d SET1`: delete every byte in `SET1`.
pub fn run(args: &[String], reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, HELP);
    }
    let mut data = Vec::new();
    reader
        .read_to_end(&mut data)
        .map_err(|_| EngineError::BrokenPipe(0))?;

    let out = if args.first().map(String::as_str) == Some("-d") {
        let set: Vec<u8> = args
            .get(1)
            .ok_or_else(|| EngineError::InvalidArgs("tr -d requires a set argument".to_string()))?
            .bytes()
            .collect();
        data.into_iter().filter(|b| !set.contains(b)).collect()
    } else {
        if args.len() != 2 {
            return Err(EngineError::InvalidArgs(
                "tr requires SET1 and SET2 arguments".to_string(),
            ));
        }
        let set1: Vec<u8> = args[0].bytes().collect();
        let set2: Vec<u8> = args[1].bytes().collect();
        if set1.len() != set2.len() || set1.is_empty() {
            return Err(EngineError::InvalidArgs(
                "tr SET1 and SET2 must be equal-length and non-empty".to_string(),
            ));
        }
        data.into_iter()
            .map(|b| match set1.iter().position(|&s| s == b) {
                Some(idx) => set2[idx],
                None => b,
            })
            .collect()
    };

    writer.write_all(&out).map_err(|_| EngineError::BrokenPipe(0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn maps_character_sets() {
        let mut input = Cursor::new(b"hello".to_vec());
        let mut out = Vec::new();
        run(
            &["el".to_string(), "ip".to_string()],
            &mut input,
            &mut out,
        )
        .unwrap();
        assert_eq!(out, b"hippo");
    }

    #[test]
    fn delete_flag_strips_set() {
        let mut input = Cursor::new(b"hello world".to_vec());
        let mut out = Vec::new();
        run(&["-d".to_string(), "lo".to_string()], &mut input, &mut out).unwrap();
        assert_eq!(out, b"he wrd");
    }

    #[test]
    fn mismatched_set_lengths_are_an_error() {
        let mut input = Cursor::new(Vec::new());
        let mut out = Vec::new();
        assert!(run(&["ab".to_string(), "x".to_string()], &mut input, &mut out).is_err());
    }

    #[test]
    fn help_flag_is_not_treated_as_set1() {
        let mut input = Cursor::new(Vec::new());
        let mut out = Vec::new();
        run(&["-h".to_string()], &mut input, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("tr - "));
    }
}
