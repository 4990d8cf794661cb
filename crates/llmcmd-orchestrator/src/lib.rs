//! The spawn / pipe orchestrator: launches built-in filters as
//! cooperatively scheduled tasks wired to the FD table via pipes, and
//! implements `tee` fan-out with dependency-tracked cleanup.

use llmcmd_builtins::resolve;
use llmcmd_core::{BuiltinCommand, EngineError};
use llmcmd_fd::pipe::{BlockingPipeReader, BlockingPipeWriter};
use llmcmd_fd::{Fd, FdTable, PipeReceiver, PipeSender};
use std::io::BufReader;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// `spawn`'s input. Already shape-validated: legacy
/// `in_fd`/`out_fd` keys from an older wire schema, or a bare `script` key,
/// are rejected before a `SpawnRequest` is ever constructed -- that check
/// reads the raw tool-call JSON and belongs to the interaction loop that
/// deserializes it, not to this strongly-typed API.
#[derive(Debug, Clone)]
pub struct SpawnRequest {
    pub cmd: BuiltinCommand,
    pub args: Vec<String>,
    pub in_fd: Option<Fd>,
    pub out_fd: Option<Fd>,
    /// Bounds bytes transferred when both `in_fd` and `out_fd` are given
    /// Reserved for that synchronous direct-copy path; async task spawns
    /// ignore it.
    pub size: Option<usize>,
}

/// `spawn`'s return value, re-echoing caller-supplied FDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnResponse {
    pub success: bool,
    pub stdin_fd: Fd,
    pub stdout_fd: Fd,
    pub stderr_fd: Fd,
    pub pid: u64,
    pub script_len: usize,
}

/// Owns task bookkeeping atop a shared [`FdTable`].
pub struct Orchestrator {
    table: Arc<FdTable>,
    next_pid: AtomicU64,
}

impl Orchestrator {
    pub fn new(table: Arc<FdTable>) -> Self {
        Self {
            table,
            next_pid: AtomicU64::new(1),
        }
    }

    /// Launch `req.cmd` as a background task, wiring its stdin/stdout to
    /// either the caller-supplied FDs or freshly allocated pipes, and a
    /// fresh pipe for stderr always; stderr is never merged into stdout.
    pub async fn spawn(&self, req: SpawnRequest) -> Result<SpawnResponse, EngineError> {
        let script_len = req.args.iter().map(|a| a.len() + 1).sum::<usize>();

        let (stdin_fd, stdin_rx) = match req.in_fd {
            Some(fd) => (fd, self.table.take_reader(fd).await?),
            None => self.table.new_pipe_writer().await,
        };
        let (stdout_fd, stdout_tx) = match req.out_fd {
            Some(fd) => (fd, self.table.take_writer(fd).await?),
            None => self.table.new_pipe_reader().await,
        };
        let (stderr_fd, stderr_tx) = self.table.new_pipe_reader().await;

        let pid = self.next_pid.fetch_add(1, Ordering::Relaxed);
        let filter = resolve(req.cmd);
        let args = req.args.clone();

        tokio::task::spawn_blocking(move || {
            run_filter_task(filter, args, stdin_rx, stdout_tx, stderr_tx);
        });

        tracing::debug!(pid, cmd = req.cmd.as_str(), stdin_fd, stdout_fd, stderr_fd, "spawned task");

        Ok(SpawnResponse {
            success: true,
            stdin_fd,
            stdout_fd,
            stderr_fd,
            pid,
            script_len,
        })
    }

    /// Install a `tee` fan-out: a background task reads `source` and copies
    /// every chunk to each of `dests`, while the FD table enforces that
    /// `source` cannot close until all `dests` have.
    pub async fn tee(&self, source: Fd, dests: &[Fd]) -> Result<(), EngineError> {
        self.table.install_tee(source, dests).await?;

        let source_rx = self.table.take_reader(source).await?;
        let mut dest_txs = Vec::with_capacity(dests.len());
        for &dest in dests {
            dest_txs.push(self.table.take_writer(dest).await?);
        }

        tokio::task::spawn(async move {
            run_tee_task(source_rx, dest_txs).await;
        });

        Ok(())
    }
}

fn run_filter_task(
    filter: llmcmd_builtins::Filter,
    args: Vec<String>,
    stdin_rx: PipeReceiver,
    stdout_tx: PipeSender,
    stderr_tx: PipeSender,
) {
    let mut reader = BufReader::new(BlockingPipeReader::new(stdin_rx));
    let mut stdout_writer = BlockingPipeWriter::new(stdout_tx);
    let mut stderr_writer = BlockingPipeWriter::new(stderr_tx);

    if let Err(err) = filter(&args, &mut reader, &mut stdout_writer) {
        use std::io::Write;
        let _ = writeln!(stderr_writer, "{err}");
        tracing::debug!(%err, "filter task failed");
    }
}

async fn run_tee_task(mut source_rx: PipeReceiver, mut dest_txs: Vec<PipeSender>) {
    loop {
        match source_rx.recv().await {
            Some(chunk) => {
                let mut live = Vec::with_capacity(dest_txs.len());
                for tx in dest_txs.drain(..) {
                    if tx.send(chunk.clone()).await.is_ok() {
                        live.push(tx);
                    }
                }
                dest_txs = live;
                if dest_txs.is_empty() {
                    break;
                }
            }
            None => break,
        }
    }
}
