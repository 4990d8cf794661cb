use crate::text::{read_lines, wants_help, write_help};
use llmcmd_core::{EngineError, DIFF_SEPARATOR};
use std::io::{BufRead, Write};

const HELP: &str = "diff - compare two texts read from stdin\n\n\
Usage: diff\n\n\
  Reads file1, a separator line, then file2 from stdin and writes a\n\
  line-oriented patch ( , -, + prefixed lines) of file1 against file2.\n\
  -h, --help  show this help\n";

/// `diff`: reads `file1\n{DIFF_SEPARATOR}\nfile2` from stdin and writes a
/// line-oriented patch of `file1` against `file2`. Unchanged lines are
/// emitted with a ` ` prefix, lines only in `file1` with `-`, lines only in
/// `file2` with `+` -- an engine-internal format `patch` (this module's
/// sibling) can replay losslessly, not a literal GNU unified diff.
pub fn run(args: &[String], reader: &mut dyn BufRead, writer: &mut dyn Write) -> Result<(), EngineError> {
    if wants_help(args) {
        return write_help(writer, HELP);
    }
    let lines = read_lines(reader)?;
    let sep_idx = lines
        .iter()
        .position(|l| l == DIFF_SEPARATOR)
        .ok_or_else(|| EngineError::InvalidArgs(format!("diff input missing separator '{DIFF_SEPARATOR}'")))?;
    let (file1, file2) = (&lines[..sep_idx], &lines[sep_idx + 1..]);

    let ops = diff_lines(file1, file2);
    for op in ops {
        let rendered = match op {
            DiffOp::Context(l) => format!(" {l}"),
            DiffOp::Delete(l) => format!("-{l}"),
            DiffOp::Insert(l) => format!("+{l}"),
        };
        writer
            .write_all(rendered.as_bytes())
            .and_then(|_| writer.write_all(b"\n"))
            .map_err(|_| EngineError::BrokenPipe(0))?;
    }
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiffOp {
    Context(String),
    Delete(String),
    Insert(String),
}

/// Compute a minimal line-level edit script from `a` to `b` via the
/// classic LCS dynamic-programming table (quadratic; fine for the
/// session-scale text this engine handles).
pub fn diff_lines(a: &[String], b: &[String]) -> Vec<DiffOp> {
    let (n, m) = (a.len(), b.len());
    let mut lcs = vec![vec![0u32; m + 1]; n + 1];
    for i in (0..n).rev() {
        for j in (0..m).rev() {
            lcs[i][j] = if a[i] == b[j] {
                lcs[i + 1][j + 1] + 1
            } else {
                lcs[i + 1][j].max(lcs[i][j + 1])
            };
        }
    }

    let mut ops = Vec::new();
    let (mut i, mut j) = (0usize, 0usize);
    while i < n && j < m {
        if a[i] == b[j] {
            ops.push(DiffOp::Context(a[i].clone()));
            i += 1;
            j += 1;
        } else if lcs[i + 1][j] >= lcs[i][j + 1] {
            ops.push(DiffOp::Delete(a[i].clone()));
            i += 1;
        } else {
            ops.push(DiffOp::Insert(b[j].clone()));
            j += 1;
        }
    }
    while i < n {
        ops.push(DiffOp::Delete(a[i].clone()));
        i += 1;
    }
    while j < m {
        ops.push(DiffOp::Insert(b[j].clone()));
        j += 1;
    }
    ops
}
