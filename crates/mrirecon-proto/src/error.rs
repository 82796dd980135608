use mrirecon_frame::{ChannelError, Dimensions, MessageKind};

/// Errors raised by sample arrays and measurement transfers.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtoError {
    /// Every axis of an array must be at least 1.
    #[error("shape {0} has an empty axis")]
    EmptyAxis(Dimensions),

    /// The array would exceed the value cap.
    #[error("shape {dims} needs more than {max} values")]
    TooLarge { dims: Dimensions, max: usize },

    /// A value buffer does not match the declared shape.
    #[error("shape {dims} needs {expected} values, got {found}")]
    LengthMismatch {
        dims: Dimensions,
        expected: usize,
        found: usize,
    },

    /// A measurement does not fit into an array.
    #[error("measurement at {index} does not fit: {reason}")]
    Incompatible {
        index: Dimensions,
        reason: &'static str,
    },
}

pub type Result<T> = std::result::Result<T, ProtoError>;

/// Errors raised while streaming a dataset over a channel.
#[derive(Debug, thiserror::Error)]
pub enum StreamError {
    /// A channel operation failed outside the measurement loop.
    #[error(transparent)]
    Channel(#[from] ChannelError),

    /// The stream ended without an end signal.
    #[error("stream ended before the end signal: {0}")]
    Disconnected(ChannelError),

    /// A measurement frame arrived but did not decode.
    #[error("malformed measurement: {0}")]
    MalformedMeasurement(ChannelError),

    /// An end signal arrived but did not carry the sentinel value.
    #[error("invalid end signal: {0}")]
    InvalidEndSignal(ChannelError),

    /// A frame of another kind interrupted the measurement stream.
    #[error("unexpected {found} frame in measurement stream")]
    UnexpectedFrame { found: MessageKind },

    /// The dataset could not be allocated or filled.
    #[error(transparent)]
    Data(#[from] ProtoError),
}
