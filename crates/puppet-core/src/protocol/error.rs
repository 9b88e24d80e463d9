//! Framing and decode errors

use thiserror::Error;

/// Failure to decode a command payload or delimit a frame.
///
/// Every variant is fatal for the channel it occurred on: the byte stream has
/// no structure that would allow resynchronising after a bad frame.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The payload ended before a field could be read
    #[error("truncated payload: needed {needed} bytes for {field}, {remaining} remaining")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// Bytes were left over after the command was fully decoded
    #[error("{count} trailing bytes after {command} payload")]
    TrailingBytes { command: &'static str, count: usize },

    /// A string field did not hold valid UTF-8
    #[error("invalid UTF-8 in {field}")]
    InvalidUtf8 { field: &'static str },

    /// An enumerated field carried a value outside its range
    #[error("invalid {field} value {value}")]
    InvalidEnum { field: &'static str, value: u32 },
}

/// Errors raised while delimiting frames on the byte stream.
#[derive(Debug, Error)]
pub enum FrameError {
    /// The length prefix exceeds the maximum accepted payload
    #[error("frame payload of {length} bytes exceeds limit of {limit} bytes")]
    Oversized { length: usize, limit: usize },

    /// The kind discriminator is the reserved value zero
    #[error("reserved command kind 0 in frame header")]
    ReservedKind,

    /// A known kind failed to decode
    #[error("malformed {kind} frame: {source}")]
    Payload {
        kind: &'static str,
        #[source]
        source: DecodeError,
    },

    /// The underlying transport failed
    #[error("transport error: {0}")]
    Io(#[from] std::io::Error),
}

impl FrameError {
    /// Whether this error came from the transport rather than the byte layout
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Io(_))
    }
}
