//! The virtual FD table: allocation, read/write, close, chain/EOF
//! traversal, and tee dependency tracking.

use crate::pipe::{self, PipeReceiver, PipeSender};
use llmcmd_core::{EngineError, FdDirection};
use std::collections::{HashSet, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

pub type Fd = u32;

/// Reserved FDs, always present and never reallocated (invariant V2).
pub const STDIN: Fd = 0;
pub const STDOUT: Fd = 1;
pub const STDERR: Fd = 2;

/// Maximum bytes a single `Read` call may request.
pub const MAX_READ_BYTES: usize = 4096;
/// Maximum lines a single line-oriented `Read` call may request.
pub const MAX_READ_LINES: usize = 1000;

/// What a `Read` call asks for: a byte budget or a line budget, never both.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReadRequest {
    Bytes(usize),
    Lines(usize),
}

impl ReadRequest {
    pub fn validate(self) -> Result<Self, EngineError> {
        match self {
            ReadRequest::Bytes(n) if n == 0 || n > MAX_READ_BYTES => Err(EngineError::InvalidArgs(
                format!("count must be 1..={MAX_READ_BYTES}, got {n}"),
            )),
            ReadRequest::Lines(n) if n == 0 || n > MAX_READ_LINES => Err(EngineError::InvalidArgs(
                format!("lines must be 1..={MAX_READ_LINES}, got {n}"),
            )),
            other => Ok(other),
        }
    }
}

/// Result of one `Read` call: a possibly-short payload plus an EOF marker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadOutcome {
    pub data: Vec<u8>,
    pub eof: bool,
}

/// Flags accompanying a `Write` call.
#[derive(Debug, Clone, Copy, Default)]
pub struct WriteFlags {
    pub newline: bool,
    pub eof: bool,
}

/// Host-level reserved writer kind for fds 1/2 when not redirected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostStream {
    Stdout,
    Stderr,
}

pub(crate) struct ReaderState {
    rx: PipeReceiver,
    carry: Vec<u8>,
}

pub(crate) enum WriterState {
    Pipe(PipeSender),
    Host(HostStream),
}

pub(crate) enum Endpoint {
    Reader(ReaderState),
    Writer(WriterState),
    /// The endpoint was handed to a task (via `take_reader`/`take_writer`);
    /// the slot survives for close-dependency bookkeeping only.
    Taken,
}

struct Slot {
    direction: FdDirection,
    closed: bool,
    eof_reached: bool,
    chain_parents: HashSet<Fd>,
    /// Present, and non-empty, while this FD is a live tee source with open
    /// destinations.
    tee_dependents: Option<HashSet<Fd>>,
    /// If this FD is itself a tee destination, the source it belongs to.
    tee_source: Option<Fd>,
    endpoint: Arc<Mutex<Endpoint>>,
}

/// The engine's virtual file-descriptor table.
pub struct FdTable {
    slots: Mutex<Vec<Slot>>,
}

impl Default for FdTable {
    fn default() -> Self {
        Self::new()
    }
}

impl FdTable {
    /// Build a table with the three reserved FDs pre-registered, stdout and
    /// stderr targeting the host streams.
    pub fn new() -> Self {
        let table = Self {
            slots: Mutex::new(Vec::new()),
        };
        {
            let mut slots = table.slots.blocking_lock_owned_or_panic();
            slots.push(Slot {
                direction: FdDirection::In,
                closed: false,
                eof_reached: false,
                chain_parents: HashSet::new(),
                tee_dependents: None,
                tee_source: None,
                endpoint: Arc::new(Mutex::new(Endpoint::Taken)),
            });
            slots.push(Slot {
                direction: FdDirection::Out,
                closed: false,
                eof_reached: false,
                chain_parents: HashSet::new(),
                tee_dependents: None,
                tee_source: None,
                endpoint: Arc::new(Mutex::new(Endpoint::Writer(WriterState::Host(
                    HostStream::Stdout,
                )))),
            });
            slots.push(Slot {
                direction: FdDirection::Out,
                closed: false,
                eof_reached: false,
                chain_parents: HashSet::new(),
                tee_dependents: None,
                tee_source: None,
                endpoint: Arc::new(Mutex::new(Endpoint::Writer(WriterState::Host(
                    HostStream::Stderr,
                )))),
            });
        }
        table
    }

    async fn alloc_slot(&self, direction: FdDirection, endpoint: Endpoint) -> Fd {
        let mut slots = self.slots.lock().await;
        let fd = slots.len() as Fd;
        slots.push(Slot {
            direction,
            closed: false,
            eof_reached: false,
            chain_parents: HashSet::new(),
            tee_dependents: None,
            tee_source: None,
            endpoint: Arc::new(Mutex::new(endpoint)),
        });
        fd
    }

    /// Allocate a fresh pipe; returns the reader-side FD (handed to the LLM
    /// or chained onward) and the writer-side [`PipeSender`] (handed to the
    /// producing task).
    pub async fn new_pipe_reader(&self) -> (Fd, PipeSender) {
        let (tx, rx) = pipe::pipe();
        let fd = self
            .alloc_slot(
                FdDirection::In,
                Endpoint::Reader(ReaderState {
                    rx,
                    carry: Vec::new(),
                }),
            )
            .await;
        (fd, tx)
    }

    /// Allocate a fresh pipe; returns the writer-side FD (handed to the LLM)
    /// and the reader-side [`PipeReceiver`] (handed to the consuming task).
    pub async fn new_pipe_writer(&self) -> (Fd, PipeReceiver) {
        let (tx, rx) = pipe::pipe();
        let fd = self
            .alloc_slot(FdDirection::Out, Endpoint::Writer(WriterState::Pipe(tx)))
            .await;
        (fd, rx)
    }

    /// Bind the reserved stdin FD to an already-collected byte buffer (the
    /// process's real standard input, read once up front). Replaces
    /// whatever endpoint fd 0 currently holds; the synthetic pipe's sender
    /// is dropped immediately so the reader observes EOF once `data` is
    /// drained.
    pub async fn bind_stdin(&self, data: Vec<u8>) -> Result<(), EngineError> {
        let (tx, rx) = pipe::pipe();
        drop(tx);
        let arc = {
            let slots = self.slots.lock().await;
            Self::slot_endpoint_arc(&slots, STDIN)?
        };
        let mut endpoint = arc.lock().await;
        *endpoint = Endpoint::Reader(ReaderState { rx, carry: data });
        Ok(())
    }

    fn slot_endpoint_arc(slots: &[Slot], fd: Fd) -> Result<Arc<Mutex<Endpoint>>, EngineError> {
        let slot = slots
            .get(fd as usize)
            .ok_or(EngineError::InvalidFd(fd))?;
        if slot.closed {
            return Err(EngineError::ClosedFd(fd));
        }
        Ok(Arc::clone(&slot.endpoint))
    }

    /// Read up to `request`'s budget from `fd`. A short read is not an
    /// error; EOF is surfaced as `{data: [], eof: true}` and is idempotent
    /// thereafter (invariant P2).
    pub async fn read(&self, fd: Fd, request: ReadRequest) -> Result<ReadOutcome, EngineError> {
        let request = request.validate()?;

        let (arc, already_eof, readable) = {
            let slots = self.slots.lock().await;
            let slot = slots.get(fd as usize).ok_or(EngineError::InvalidFd(fd))?;
            if slot.closed {
                return Err(EngineError::ClosedFd(fd));
            }
            (
                Self::slot_endpoint_arc(&slots, fd)?,
                slot.eof_reached,
                slot.direction.is_readable(),
            )
        };

        if !readable {
            return Err(EngineError::NotReadable(fd));
        }
        if already_eof {
            return Ok(ReadOutcome {
                data: Vec::new(),
                eof: true,
            });
        }

        let mut endpoint = arc.lock().await;
        let state = match &mut *endpoint {
            Endpoint::Reader(state) => state,
            Endpoint::Writer(_) => return Err(EngineError::NotReadable(fd)),
            Endpoint::Taken => return Err(EngineError::NotReadable(fd)),
        };

        if state.carry.is_empty() {
            match state.rx.recv().await {
                Some(chunk) => state.carry = chunk,
                None => {
                    drop(endpoint);
                    self.mark_eof(fd).await;
                    return Ok(ReadOutcome {
                        data: Vec::new(),
                        eof: true,
                    });
                }
            }
        }

        let take_n = match request {
            ReadRequest::Bytes(n) => n.min(state.carry.len()),
            ReadRequest::Lines(n) => {
                let mut newlines_seen = 0usize;
                let mut idx = state.carry.len();
                for (i, b) in state.carry.iter().enumerate() {
                    if *b == b'\n' {
                        newlines_seen += 1;
                        if newlines_seen == n {
                            idx = i + 1;
                            break;
                        }
                    }
                }
                idx
            }
        };

        let data: Vec<u8> = state.carry.drain(..take_n).collect();
        Ok(ReadOutcome { data, eof: false })
    }

    /// Write `data` to `fd`. `flags.eof` closes the writer end after the
    /// write, propagating EOF to the chain exactly as an explicit `Close`
    /// would.
    pub async fn write(
        &self,
        fd: Fd,
        mut data: Vec<u8>,
        flags: WriteFlags,
    ) -> Result<usize, EngineError> {
        if flags.newline {
            data.push(b'\n');
        }
        let len = data.len();

        let (arc, writable) = {
            let slots = self.slots.lock().await;
            let slot = slots.get(fd as usize).ok_or(EngineError::InvalidFd(fd))?;
            if slot.closed {
                return Err(EngineError::ClosedFd(fd));
            }
            (Self::slot_endpoint_arc(&slots, fd)?, slot.direction.is_writable())
        };
        if !writable {
            return Err(EngineError::NotWritable(fd));
        }

        {
            let mut endpoint = arc.lock().await;
            match &mut *endpoint {
                Endpoint::Writer(WriterState::Pipe(tx)) => {
                    if !data.is_empty() {
                        tx.send(data)
                            .await
                            .map_err(|_| EngineError::BrokenPipe(fd))?;
                    }
                }
                Endpoint::Writer(WriterState::Host(HostStream::Stdout)) => {
                    use tokio::io::AsyncWriteExt;
                    tokio::io::stdout()
                        .write_all(&data)
                        .await
                        .map_err(|_| EngineError::BrokenPipe(fd))?;
                }
                Endpoint::Writer(WriterState::Host(HostStream::Stderr)) => {
                    use tokio::io::AsyncWriteExt;
                    tokio::io::stderr()
                        .write_all(&data)
                        .await
                        .map_err(|_| EngineError::BrokenPipe(fd))?;
                }
                Endpoint::Reader(_) => return Err(EngineError::NotWritable(fd)),
                Endpoint::Taken => return Err(EngineError::NotWritable(fd)),
            }
        }

        if flags.eof {
            self.close(fd).await?;
        }

        Ok(len)
    }

    /// Close `fd`. Fails with `DependencyViolation` if `fd` is a tee source
    /// with still-open destinations (invariant P3).
    pub async fn close(&self, fd: Fd) -> Result<(), EngineError> {
        let (arc, dependents_open, source_of) = {
            let mut slots = self.slots.lock().await;
            let slot = slots.get_mut(fd as usize).ok_or(EngineError::InvalidFd(fd))?;
            if slot.closed {
                return Err(EngineError::AlreadyClosed(fd));
            }
            let dependents_open = slot
                .tee_dependents
                .as_ref()
                .map(|d| d.len() as u32)
                .unwrap_or(0);
            if dependents_open > 0 {
                return Err(EngineError::DependencyViolation {
                    fd,
                    open_dependents: dependents_open,
                });
            }
            slot.closed = true;
            let source_of = slot.tee_source;
            (Arc::clone(&slot.endpoint), dependents_open, source_of)
        };
        debug_assert_eq!(dependents_open, 0);

        // Dropping the endpoint releases the underlying pipe half, which is
        // how downstream readers observe EOF.
        {
            let mut endpoint = arc.lock().await;
            *endpoint = Endpoint::Taken;
        }

        if let Some(source_fd) = source_of {
            let mut slots = self.slots.lock().await;
            if let Some(source_slot) = slots.get_mut(source_fd as usize) {
                if let Some(deps) = &mut source_slot.tee_dependents {
                    deps.remove(&fd);
                }
            }
        }

        self.mark_eof(fd).await;
        Ok(())
    }

    /// Remove a reader endpoint from the table for exclusive use by a task,
    /// leaving the slot registered (for dependency/close bookkeeping).
    pub async fn take_reader(&self, fd: Fd) -> Result<PipeReceiver, EngineError> {
        let arc = {
            let slots = self.slots.lock().await;
            let slot = slots.get(fd as usize).ok_or(EngineError::InvalidFd(fd))?;
            if slot.closed {
                return Err(EngineError::ClosedFd(fd));
            }
            if !slot.direction.is_readable() {
                return Err(EngineError::NotReadable(fd));
            }
            Arc::clone(&slot.endpoint)
        };
        let mut endpoint = arc.lock().await;
        match std::mem::replace(&mut *endpoint, Endpoint::Taken) {
            Endpoint::Reader(ReaderState { rx, .. }) => Ok(rx),
            other => {
                *endpoint = other;
                Err(EngineError::NotReadable(fd))
            }
        }
    }

    /// Remove a writer endpoint from the table for exclusive use by a task.
    pub async fn take_writer(&self, fd: Fd) -> Result<PipeSender, EngineError> {
        let arc = {
            let slots = self.slots.lock().await;
            let slot = slots.get(fd as usize).ok_or(EngineError::InvalidFd(fd))?;
            if slot.closed {
                return Err(EngineError::ClosedFd(fd));
            }
            if !slot.direction.is_writable() {
                return Err(EngineError::NotWritable(fd));
            }
            Arc::clone(&slot.endpoint)
        };
        let mut endpoint = arc.lock().await;
        match std::mem::replace(&mut *endpoint, Endpoint::Taken) {
            Endpoint::Writer(WriterState::Pipe(tx)) => Ok(tx),
            other => {
                *endpoint = other;
                Err(EngineError::NotWritable(fd))
            }
        }
    }

    /// Install a 1:N tee binding: `source` must be a live readable FD, each
    /// of `dests` a live writable FD; `dests` must be non-empty and
    /// duplicate-free.
    pub async fn install_tee(&self, source: Fd, dests: &[Fd]) -> Result<(), EngineError> {
        if dests.is_empty() {
            return Err(EngineError::InvalidArgs(
                "tee requires at least one destination fd".to_string(),
            ));
        }
        let unique: HashSet<Fd> = dests.iter().copied().collect();
        if unique.len() != dests.len() {
            return Err(EngineError::InvalidArgs(
                "tee destinations must not contain duplicates".to_string(),
            ));
        }

        let mut slots = self.slots.lock().await;
        {
            let source_slot = slots
                .get(source as usize)
                .ok_or(EngineError::InvalidFd(source))?;
            if source_slot.closed {
                return Err(EngineError::ClosedFd(source));
            }
            if !source_slot.direction.is_readable() {
                return Err(EngineError::NotReadable(source));
            }
        }
        for &dest in dests {
            let dest_slot = slots.get(dest as usize).ok_or(EngineError::InvalidFd(dest))?;
            if dest_slot.closed {
                return Err(EngineError::ClosedFd(dest));
            }
            if !dest_slot.direction.is_writable() {
                return Err(EngineError::NotWritable(dest));
            }
        }

        for &dest in dests {
            if let Some(dest_slot) = slots.get_mut(dest as usize) {
                dest_slot.tee_source = Some(source);
                dest_slot.chain_parents.insert(source);
            }
        }
        if let Some(source_slot) = slots.get_mut(source as usize) {
            source_slot.tee_dependents = Some(unique);
        }
        Ok(())
    }

    /// Mark `fd` as having reached EOF, then cascade to any FD whose
    /// `chain_parents` are now all EOF. Walks the `chain_parents` map, not
    /// object graphs. Traversal order is deterministic: parents are marked
    /// before the children whose cascade they unblock.
    async fn mark_eof(&self, fd: Fd) {
        let mut queue = VecDeque::new();
        queue.push_back(fd);

        while let Some(current) = queue.pop_front() {
            let mut slots = self.slots.lock().await;
            if let Some(slot) = slots.get_mut(current as usize) {
                if slot.eof_reached {
                    continue;
                }
                slot.eof_reached = true;
            } else {
                continue;
            }

            for (idx, slot) in slots.iter().enumerate() {
                let child = idx as Fd;
                if slot.eof_reached || !slot.chain_parents.contains(&current) {
                    continue;
                }
                if slot.chain_parents.iter().all(|p| {
                    slots
                        .get(*p as usize)
                        .map(|s| s.eof_reached)
                        .unwrap_or(true)
                }) {
                    queue.push_back(child);
                }
            }
        }
    }

    /// Whether `fd` has reached EOF (used by orchestrator progress checks).
    pub async fn is_eof(&self, fd: Fd) -> Result<bool, EngineError> {
        let slots = self.slots.lock().await;
        let slot = slots.get(fd as usize).ok_or(EngineError::InvalidFd(fd))?;
        Ok(slot.eof_reached)
    }

    /// Whether `fd` is closed.
    pub async fn is_closed(&self, fd: Fd) -> Result<bool, EngineError> {
        let slots = self.slots.lock().await;
        let slot = slots.get(fd as usize).ok_or(EngineError::InvalidFd(fd))?;
        Ok(slot.closed)
    }

    /// Force-close every non-reserved, non-already-closed FD, bypassing the
    /// tee dependency check. Used for session-deadline teardown.
    pub async fn force_close_all(&self) {
        let count = self.slots.lock().await.len();
        for fd in 3..count as Fd {
            let mut slots = self.slots.lock().await;
            if let Some(slot) = slots.get_mut(fd as usize) {
                if slot.closed {
                    continue;
                }
                slot.closed = true;
                slot.tee_dependents = None;
                let arc = Arc::clone(&slot.endpoint);
                drop(slots);
                let mut endpoint = arc.lock().await;
                *endpoint = Endpoint::Taken;
            }
        }
        for fd in 3..count as Fd {
            self.mark_eof(fd).await;
        }
    }
}

/// A tiny helper so `FdTable::new()` can stay synchronous even though the
/// table is otherwise entirely async; reserved-FD registration never
/// contends with anything since it runs before the table is shared.
trait BlockingLockOwnedOrPanic<T> {
    fn blocking_lock_owned_or_panic(&self) -> tokio::sync::MutexGuard<'_, T>;
}

impl<T> BlockingLockOwnedOrPanic<T> for Mutex<T> {
    fn blocking_lock_owned_or_panic(&self) -> tokio::sync::MutexGuard<'_, T> {
        self.try_lock()
            .expect("FdTable::new() must not contend with other holders")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn reserved_fds_are_preregistered() {
        let table = FdTable::new();
        assert!(table.is_closed(STDIN).await.unwrap().eq(&false));
        assert!(table.is_closed(STDOUT).await.unwrap().eq(&false));
        assert!(table.is_closed(STDERR).await.unwrap().eq(&false));
    }

    #[tokio::test]
    async fn bind_stdin_makes_fd_0_readable() {
        let table = FdTable::new();
        table.bind_stdin(b"hello".to_vec()).await.unwrap();

        let out = table.read(STDIN, ReadRequest::Bytes(16)).await.unwrap();
        assert_eq!(out.data, b"hello");
        assert!(!out.eof);

        let out2 = table.read(STDIN, ReadRequest::Bytes(16)).await.unwrap();
        assert_eq!(out2.data, Vec::<u8>::new());
        assert!(out2.eof);
    }

    #[tokio::test]
    async fn bind_stdin_on_empty_input_is_immediate_eof() {
        let table = FdTable::new();
        table.bind_stdin(Vec::new()).await.unwrap();
        let out = table.read(STDIN, ReadRequest::Bytes(16)).await.unwrap();
        assert_eq!(out.data, Vec::<u8>::new());
        assert!(out.eof);
    }

    #[tokio::test]
    async fn alloc_returns_increasing_fds_never_reused() {
        let table = FdTable::new();
        let (fd_a, _tx_a) = table.new_pipe_reader().await;
        let (fd_b, _tx_b) = table.new_pipe_reader().await;
        assert!(fd_b > fd_a);
        table.close(fd_a).await.unwrap();
        let (fd_c, _tx_c) = table.new_pipe_reader().await;
        assert_ne!(fd_c, fd_a);
        assert!(fd_c > fd_b);
    }

    #[tokio::test]
    async fn write_then_read_round_trips_bytes() {
        let table = FdTable::new();
        let (reader_fd, tx) = table.new_pipe_reader().await;
        tx.send(b"hello".to_vec()).await.unwrap();
        drop(tx);

        let out = table
            .read(reader_fd, ReadRequest::Bytes(16))
            .await
            .unwrap();
        assert_eq!(out.data, b"hello");
        assert!(!out.eof);

        let out2 = table
            .read(reader_fd, ReadRequest::Bytes(16))
            .await
            .unwrap();
        assert_eq!(out2.data, Vec::<u8>::new());
        assert!(out2.eof);
    }

    #[tokio::test]
    async fn eof_is_idempotent() {
        let table = FdTable::new();
        let (reader_fd, tx) = table.new_pipe_reader().await;
        drop(tx);
        for _ in 0..3 {
            let out = table
                .read(reader_fd, ReadRequest::Bytes(4))
                .await
                .unwrap();
            assert_eq!(out.data, Vec::<u8>::new());
            assert!(out.eof);
        }
    }

    #[tokio::test]
    async fn read_short_read_is_not_an_error() {
        let table = FdTable::new();
        let (reader_fd, tx) = table.new_pipe_reader().await;
        tx.send(b"ab".to_vec()).await.unwrap();

        let out = table
            .read(reader_fd, ReadRequest::Bytes(10))
            .await
            .unwrap();
        assert_eq!(out.data, b"ab");
        assert!(!out.eof);
    }

    #[tokio::test]
    async fn write_to_closed_fd_is_an_error() {
        let table = FdTable::new();
        let (writer_fd, _rx) = table.new_pipe_writer().await;
        table.close(writer_fd).await.unwrap();
        let err = table
            .write(writer_fd, b"x".to_vec(), WriteFlags::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ClosedFd(_)));
    }

    #[tokio::test]
    async fn double_close_is_an_error() {
        let table = FdTable::new();
        let (fd, _tx) = table.new_pipe_reader().await;
        table.close(fd).await.unwrap();
        let err = table.close(fd).await.unwrap_err();
        assert!(matches!(err, EngineError::AlreadyClosed(_)));
    }

    #[tokio::test]
    async fn tee_blocks_source_close_until_dependents_close() {
        let table = FdTable::new();
        let (source_fd, _producer_tx) = table.new_pipe_reader().await;
        let (dest_a, _consumer_a_rx) = table.new_pipe_writer().await;
        let (dest_b, _consumer_b_rx) = table.new_pipe_writer().await;

        table.install_tee(source_fd, &[dest_a, dest_b]).await.unwrap();

        let err = table.close(source_fd).await.unwrap_err();
        assert!(matches!(err, EngineError::DependencyViolation { .. }));

        table.close(dest_a).await.unwrap();
        let err = table.close(source_fd).await.unwrap_err();
        assert!(matches!(err, EngineError::DependencyViolation { .. }));

        table.close(dest_b).await.unwrap();
        table.close(source_fd).await.unwrap();
    }

    #[tokio::test]
    async fn tee_rejects_empty_or_duplicate_destinations() {
        let table = FdTable::new();
        let (source_fd, _tx) = table.new_pipe_reader().await;
        let (dest_a, _rx) = table.new_pipe_writer().await;

        assert!(matches!(
            table.install_tee(source_fd, &[]).await.unwrap_err(),
            EngineError::InvalidArgs(_)
        ));
        assert!(matches!(
            table
                .install_tee(source_fd, &[dest_a, dest_a])
                .await
                .unwrap_err(),
            EngineError::InvalidArgs(_)
        ));
    }

    #[tokio::test]
    async fn eof_cascades_through_chain_parents() {
        let table = FdTable::new();
        let (source_fd, _producer_tx) = table.new_pipe_reader().await;
        let (dest_a, _rx_a) = table.new_pipe_writer().await;
        table.install_tee(source_fd, &[dest_a]).await.unwrap();

        table.mark_eof(source_fd).await;
        assert!(table.is_eof(source_fd).await.unwrap());
        assert!(table.is_eof(dest_a).await.unwrap());
    }

    #[tokio::test]
    async fn take_reader_then_read_is_not_readable() {
        let table = FdTable::new();
        let (fd, _tx) = table.new_pipe_reader().await;
        let _rx = table.take_reader(fd).await.unwrap();
        let err = table.read(fd, ReadRequest::Bytes(4)).await.unwrap_err();
        assert!(matches!(err, EngineError::NotReadable(_)));
    }

    #[tokio::test]
    async fn invalid_read_request_is_rejected() {
        let table = FdTable::new();
        let (fd, _tx) = table.new_pipe_reader().await;
        assert!(matches!(
            table.read(fd, ReadRequest::Bytes(0)).await.unwrap_err(),
            EngineError::InvalidArgs(_)
        ));
        assert!(matches!(
            table
                .read(fd, ReadRequest::Bytes(MAX_READ_BYTES + 1))
                .await
                .unwrap_err(),
            EngineError::InvalidArgs(_)
        ));
    }

    #[tokio::test]
    async fn write_eof_flag_closes_and_propagates() {
        let table = FdTable::new();
        let (writer_fd, mut rx) = table.new_pipe_writer().await;
        table
            .write(writer_fd, b"done".to_vec(), WriteFlags { newline: false, eof: true })
            .await
            .unwrap();
        assert!(table.is_closed(writer_fd).await.unwrap());
        assert_eq!(rx.recv().await, Some(b"done".to_vec()));
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn force_close_all_closes_non_reserved_fds() {
        let table = FdTable::new();
        let (fd_a, _tx) = table.new_pipe_reader().await;
        let (fd_b, _rx) = table.new_pipe_writer().await;
        table.force_close_all().await;
        assert!(table.is_closed(fd_a).await.unwrap());
        assert!(table.is_closed(fd_b).await.unwrap());
        assert!(!table.is_closed(STDOUT).await.unwrap());
    }
}
