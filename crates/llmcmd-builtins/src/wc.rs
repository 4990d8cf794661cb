use crate::text::{wants_help, write_help};
use llmcmd_core::EngineError;
use std::io::{BufRead, Read, Write};

const HELP: &str = "wc - count lines, words, and bytes\n\n\
Usage: wc [-l] [-w] [-c]\n\n\
  -l          print the line count\n\
  -w          print the word count\n\
  -c          print the byte count\n\
  (with no flags, all three are printed as \"lines words bytes\")\n\
  -h, --help  show this help\n";

/// `wc [-l] [-w] [-c]`: line, word, and/or byte counts. With no flags,
/// prints all three as `lines words bytes`.
pub fn run(args: &[String], reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, HELP);
    }
    let mut want_lines = args.iter().any(|a| a == "-l");
    let mut want_words = args.iter().any(|a| a == "-w");
    let mut want_bytes = args.iter().any(|a| a == "-c");
    if !want_lines && !want_words && !want_bytes {
        want_lines = true;
        want_words = true;
        want_bytes = true;
    }

    let mut data = Vec::new();
    reader
        .read_to_end(&mut data)
        .map_err(|_| EngineError::BrokenPipe(0))?;

    let bytes = data.len();
    let text = String::from_utf8_lossy(&data);
    let lines = text.lines().count();
    let words = text.split_whitespace().count();

    let mut fields = Vec::new();
    if want_lines {
        fields.push(lines.to_string());
    }
    if want_words {
        fields.push(words.to_string());
    }
    if want_bytes {
        fields.push(bytes.to_string());
    }
    writer
        .write_all(fields.join(" ").as_bytes())
        .and_then(|_| writer.write_all(b"\n"))
        .map_err(|_| EngineError::BrokenPipe(0))?;
    Ok(())
}
