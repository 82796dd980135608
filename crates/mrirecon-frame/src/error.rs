use crate::kind::MessageKind;

/// Errors raised by the payload primitives.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WireError {
    /// Not enough room (encode) or bytes (decode) left in the buffer.
    #[error("buffer capacity exceeded ({needed} bytes needed, {remaining} remaining)")]
    Capacity { needed: usize, remaining: usize },

    /// A string at or above the length cap.
    #[error("string too long ({len} bytes, max {max})")]
    StringTooLong { len: usize, max: usize },

    /// A length or count field decoded to a negative value.
    #[error("negative length field ({0})")]
    NegativeLength(i32),

    /// A dimension extent is negative on the wire or too large to encode.
    #[error("invalid dimension extent ({0})")]
    InvalidDimension(i64),

    /// A field decoded fine but carries a value the message forbids.
    #[error("unexpected value {value} for {field}")]
    UnexpectedValue { field: &'static str, value: i64 },

    /// A string payload is not valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,
}

/// Errors that can occur on a frame channel.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// The underlying transport failed or the peer went away.
    #[error(transparent)]
    Transport(#[from] mrirecon_transport::TransportError),

    /// A message did not fit into the channel buffer.
    #[error("failed to encode {kind}: {source}")]
    Encode {
        kind: MessageKind,
        source: WireError,
    },

    /// A held payload could not be decoded. The frame stays buffered.
    #[error("failed to decode {kind}: {source}")]
    Decode {
        kind: MessageKind,
        source: WireError,
    },

    /// The buffered frame is of a different kind. It stays buffered.
    #[error("expected {expected}, found {found}")]
    KindMismatch {
        expected: MessageKind,
        found: MessageKind,
    },

    /// A frame header announced an empty or oversized payload.
    #[error("invalid payload length {len} (capacity {capacity})")]
    InvalidPayloadLength { len: i32, capacity: usize },

    /// A frame header carried a tag outside the message catalog.
    #[error("unknown message tag {0}")]
    UnknownTag(i32),

    /// `flush` was called with nothing buffered.
    #[error("no message buffered")]
    NothingBuffered,
}

impl ChannelError {
    /// True when the error leaves a frame buffered on the channel.
    pub fn keeps_frame(&self) -> bool {
        matches!(self, Self::KindMismatch { .. } | Self::Decode { .. })
    }
}

pub type Result<T> = std::result::Result<T, ChannelError>;
