//! A unidirectional bounded byte channel.
//!
//! Backed by a bounded `tokio::sync::mpsc` channel of byte chunks. FIFO
//! within one pipe is inherited from the channel; backpressure is the
//! channel's own bounded-capacity blocking; EOF is observed as the sender
//! being dropped once the buffer is drained.

use tokio::sync::mpsc;

/// Default channel capacity, in chunks, not bytes -- each chunk is already
/// bounded by the 4096-byte read cap.
pub const DEFAULT_PIPE_CAPACITY: usize = 64;

pub type PipeSender = mpsc::Sender<Vec<u8>>;
pub type PipeReceiver = mpsc::Receiver<Vec<u8>>;

/// Create a fresh pipe with the default capacity.
pub fn pipe() -> (PipeSender, PipeReceiver) {
    mpsc::channel(DEFAULT_PIPE_CAPACITY)
}

/// A synchronous `Read` adapter over a pipe receiver, for use inside
/// `spawn_blocking` filter tasks (C1 filters are plain synchronous
/// `(args, reader, writer) -> Result<()>` functions).
pub struct BlockingPipeReader {
    rx: PipeReceiver,
    carry: Vec<u8>,
    carry_pos: usize,
}

impl BlockingPipeReader {
    pub fn new(rx: PipeReceiver) -> Self {
        Self {
            rx,
            carry: Vec::new(),
            carry_pos: 0,
        }
    }
}

impl std::io::Read for BlockingPipeReader {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        if self.carry_pos >= self.carry.len() {
            match self.rx.blocking_recv() {
                Some(chunk) => {
                    self.carry = chunk;
                    self.carry_pos = 0;
                }
                None => return Ok(0),
            }
        }
        let remaining = &self.carry[self.carry_pos..];
        let n = remaining.len().min(buf.len());
        buf[..n].copy_from_slice(&remaining[..n]);
        self.carry_pos += n;
        Ok(n)
    }
}

/// A synchronous `Write` adapter over a pipe sender, for use inside
/// `spawn_blocking` filter tasks.
pub struct BlockingPipeWriter {
    tx: PipeSender,
}

impl BlockingPipeWriter {
    pub fn new(tx: PipeSender) -> Self {
        Self { tx }
    }
}

impl std::io::Write for BlockingPipeWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        self.tx
            .blocking_send(buf.to_vec())
            .map_err(|_| std::io::Error::from(std::io::ErrorKind::BrokenPipe))?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};

    #[test]
    fn blocking_write_then_read_round_trips() {
        let (tx, rx) = pipe();
        let handle = std::thread::spawn(move || {
            let mut writer = BlockingPipeWriter::new(tx);
            writer.write_all(b"hello world").unwrap();
        });
        handle.join().unwrap();

        let mut reader = BlockingPipeReader::new(rx);
        let mut out = Vec::new();
        reader.read_to_end(&mut out).unwrap();
        assert_eq!(out, b"hello world");
    }

    #[test]
    fn read_after_sender_drop_returns_eof() {
        let (tx, rx) = pipe();
        drop(tx);
        let mut reader = BlockingPipeReader::new(rx);
        let mut buf = [0u8; 16];
        let n = reader.read(&mut buf).unwrap();
        assert_eq!(n, 0);
    }
}
