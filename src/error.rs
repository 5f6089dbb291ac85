use crate::message;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    SerializingFailure(#[from] quick_xml::DeError),
    #[error("remote procedure call failed:\n{0}")]
    Netconf(#[from] message::RpcReply),
    #[error("transport closed in the middle of a message")]
    UnexpectedEof,
    #[error(
        "malformed message chunk (expected {:?}, actual {:?})",
        expected,
        actual
    )]
    MalformedChunk { expected: char, actual: char },
    #[error("chunk size must be between 1 and 4294967295")]
    ChunkSizeOutOfRange,
    #[error("chunked framing requires at least one chunk per message")]
    EmptyChunkedMessage,
    #[error("framing buffer exceeded {0} bytes without completing a message")]
    BufferOverflow(usize),
    #[error("timed out waiting for peer hello")]
    HelloTimeout(#[from] tokio::time::error::Elapsed),
}
