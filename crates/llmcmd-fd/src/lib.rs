//! The FD table and pipe primitives: the engine's virtual plumbing layer
//! between tool calls and the bytes flowing through spawned tasks.

pub mod pipe;
pub mod table;

pub use pipe::{pipe, BlockingPipeReader, BlockingPipeWriter, PipeReceiver, PipeSender};
pub use table::{
    Fd, FdTable, HostStream, ReadOutcome, ReadRequest, WriteFlags, MAX_READ_BYTES,
    MAX_READ_LINES, STDERR, STDIN, STDOUT,
};
