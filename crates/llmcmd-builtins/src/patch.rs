use crate::diff::DiffOp;
use crate::text::{read_lines, wants_help, write_help};
use llmcmd_core::{EngineError, PATCH_SEPARATOR};
use std::io::{BufRead, Write};

const HELP: &str = "patch - apply a patch produced by diff\n\n\
Usage: patch [--dry-run] [--strict]\n\n\
  Reads original, a separator line, then a diff-format patch from stdin and\n\
  writes the reconstructed text.\n\n\
  --dry-run   validate without writing output\n\
  --strict    fail if a context/delete line does not match the original\n\
  -h, --help  show this help\n";

/// `patch [--dry-run] [--strict]`: reads `original\n{PATCH_SEPARATOR}\npatch`
/// from stdin (`patch` in this engine's own `diff` format, see
/// [`crate::diff`]) and writes the reconstructed text.
///
/// `--dry-run` validates without writing output. `--strict` turns a context
/// or deletion line that doesn't match `original` at its expected position
/// into an error; without it, mismatches are tolerated and the patch is
/// applied anyway (the default mirrors the reference CLI's exit-0-on-mismatch
/// behavior, `--strict` opts into failing).
pub fn run(args: &[String], reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, HELP);
    }
    let dry_run = args.iter().any(|a| a == "--dry-run");
    let strict = args.iter().any(|a| a == "--strict");
    for other in args.iter().filter(|a| a.as_str() != "--dry-run" && a.as_str() != "--strict") {
        return Err(EngineError::InvalidArgs(format!("patch: unknown argument '{other}'")));
    }

    let lines = read_lines(reader)?;
    let sep_idx = lines
        .iter()
        .position(|l| l == PATCH_SEPARATOR)
        .ok_or_else(|| EngineError::InvalidArgs(format!("patch input missing separator '{PATCH_SEPARATOR}'")))?;
    let (original, patch_text) = (&lines[..sep_idx], &lines[sep_idx + 1..]);

    let ops = parse_patch(patch_text)?;
    let (output, mismatch) = apply_patch(original, &ops);

    if strict && mismatch {
        return Err(EngineError::InvalidArgs(
            "patch: context does not match original (--strict)".to_string(),
        ));
    }

    if dry_run {
        return Ok(());
    }

    for line in output {
        writer
            .write_all(line.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|_| EngineError::BrokenPipe(0))?;
    }
    Ok(())
}

fn parse_patch(lines: &[String]) -> Result<Vec<DiffOp>, EngineError> {
    lines
        .iter()
        .map(|line| {
            let mut chars = line.chars();
            match chars.next() {
                Some(' ') => Ok(DiffOp::Context(chars.as_str().to_string())),
                Some('-') => Ok(DiffOp::Delete(chars.as_str().to_string())),
                Some('+') => Ok(DiffOp::Insert(chars.as_str().to_string())),
                _ => Err(EngineError::InvalidArgs(format!(
                    "patch: malformed hunk line '{line}'"
                ))),
            }
        })
        .collect()
}

/// Replays `ops` to produce the resulting text, tracking whether any
/// context/delete line diverged from `original` at its expected offset.
fn apply_patch(original: &[String], ops: &[DiffOp]) -> (Vec<String>, bool) {
    let mut output = Vec::new();
    let mut orig_idx = 0usize;
    let mut mismatch = false;

    for op in ops {
        match op {
            DiffOp::Context(l) => {
                if original.get(orig_idx) != Some(l) {
                    mismatch = true;
                }
                output.push(l.clone());
                orig_idx += 1;
            }
            DiffOp::Delete(l) => {
                if original.get(orig_idx) != Some(l) {
                    mismatch = true;
                }
                orig_idx += 1;
            }
            DiffOp::Insert(l) => {
                output.push(l.clone());
            }
        }
    }
    (output, mismatch)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff;
    use std::io::Cursor;

    fn patch_text_for(a: &[String], b: &[String]) -> String {
        diff::diff_lines(a, b)
            .into_iter()
            .map(|op| match op {
                DiffOp::Context(l) => format!(" {l}"),
                DiffOp::Delete(l) => format!("-{l}"),
                DiffOp::Insert(l) => format!("+{l}"),
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn round_trips_diff_then_patch() {
        let a: Vec<String> = ["line1", "line2", "line3"].iter().map(|s| s.to_string()).collect();
        let b: Vec<String> = ["line1", "modified_line2", "line3", "line4"]
            .iter()
            .map(|s| s.to_string())
            .collect();

        let patch_body = patch_text_for(&a, &b);
        let input_text = format!("{}\n{PATCH_SEPARATOR}\n{}\n", a.join("\n"), patch_body);
        let mut input = Cursor::new(input_text.into_bytes());
        let mut out = Vec::new();
        run(&[], &mut input, &mut out).unwrap();

        assert_eq!(String::from_utf8(out).unwrap(), b.join("\n") + "\n");
    }

    #[test]
    fn dry_run_writes_nothing() {
        let a = vec!["x".to_string()];
        let b = vec!["y".to_string()];
        let patch_body = patch_text_for(&a, &b);
        let input_text = format!("x\n{PATCH_SEPARATOR}\n{patch_body}\n");
        let mut input = Cursor::new(input_text.into_bytes());
        let mut out = Vec::new();
        run(&["--dry-run".to_string()], &mut input, &mut out).unwrap();
        assert!(out.is_empty());
    }

    #[test]
    fn strict_flag_rejects_mismatched_context() {
        let input_text = format!("actual\n{PATCH_SEPARATOR}\n expected\n+new\n");
        let mut input = Cursor::new(input_text.into_bytes());
        let mut out = Vec::new();
        assert!(run(&["--strict".to_string()], &mut input, &mut out).is_err());
    }

    #[test]
    fn non_strict_tolerates_mismatched_context() {
        let input_text = format!("actual\n{PATCH_SEPARATOR}\n expected\n+new\n");
        let mut input = Cursor::new(input_text.into_bytes());
        let mut out = Vec::new();
        run(&[], &mut input, &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "expected\nnew\n");
    }

    #[test]
    fn help_flag_is_handled_before_strict_arg_validation() {
        let mut input = Cursor::new(Vec::new());
        let mut out = Vec::new();
        run(&["--help".to_string()], &mut input, &mut out).unwrap();
        assert!(String::from_utf8(out).unwrap().starts_with("patch - "));
    }

    #[test]
    fn missing_separator_is_an_error() {
        let mut input = Cursor::new(b"just one file\n".to_vec());
        let mut out = Vec::new();
        assert!(run(&[], &mut input, &mut out).is_err());
    }
}
