use bytes::BytesMut;
use mrirecon_transport::Transport;
use tracing::{debug, trace, warn};

use crate::error::{ChannelError, Result};
use crate::kind::MessageKind;
use crate::wire::{
    decode_header, encode_header, WireMessage, WireReader, WireWriter, DEFAULT_FILE_CAPACITY,
    DEFAULT_NETWORK_CAPACITY, HEADER_SIZE,
};

/// Configuration for a frame channel.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    /// Maximum payload size in bytes, for both directions.
    pub capacity: usize,
}

impl ChannelConfig {
    /// Sizing for socket peers. Default: 1 MiB.
    pub fn network() -> Self {
        Self {
            capacity: DEFAULT_NETWORK_CAPACITY,
        }
    }

    /// Sizing for files and pipes. Default: 100 KiB.
    pub fn file() -> Self {
        Self {
            capacity: DEFAULT_FILE_CAPACITY,
        }
    }
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self::network()
    }
}

/// What the channel buffer currently holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelState {
    Empty,
    Holding(MessageKind),
    Error,
}

enum Slot {
    Empty,
    Holding { kind: MessageKind, payload: BytesMut },
    Error,
}

/// Sends and receives typed messages over a [`Transport`].
///
/// The channel buffers at most one frame. A receive that asks for the wrong
/// kind leaves the buffered frame in place so the caller can ask again with
/// the right kind.
pub struct FrameChannel<T> {
    transport: T,
    slot: Slot,
    spare: BytesMut,
    config: ChannelConfig,
}

impl<T: Transport> FrameChannel<T> {
    /// Create a channel with network sizing.
    pub fn new(transport: T) -> Self {
        Self::with_config(transport, ChannelConfig::default())
    }

    /// Create a channel with explicit configuration.
    pub fn with_config(transport: T, config: ChannelConfig) -> Self {
        Self {
            transport,
            slot: Slot::Empty,
            spare: BytesMut::new(),
            config,
        }
    }

    pub fn state(&self) -> ChannelState {
        match &self.slot {
            Slot::Empty => ChannelState::Empty,
            Slot::Holding { kind, .. } => ChannelState::Holding(*kind),
            Slot::Error => ChannelState::Error,
        }
    }

    pub fn capacity(&self) -> usize {
        self.config.capacity
    }

    /// Encode `message` into the buffer and write it out.
    ///
    /// Anything held before is discarded.
    pub fn send<M: WireMessage>(&mut self, message: &M) -> Result<()> {
        let mut payload = self.take_buffer();
        let encoded = message.encode(&mut WireWriter::new(&mut payload, self.config.capacity));
        if let Err(source) = encoded {
            self.spare = payload;
            self.slot = Slot::Error;
            return Err(ChannelError::Encode {
                kind: M::KIND,
                source,
            });
        }

        self.slot = Slot::Holding {
            kind: M::KIND,
            payload,
        };
        self.flush()
    }

    /// Write the buffered frame to the transport.
    pub fn flush(&mut self) -> Result<()> {
        let (kind, payload) = match std::mem::replace(&mut self.slot, Slot::Error) {
            Slot::Holding { kind, payload } => (kind, payload),
            other => {
                self.slot = other;
                return Err(ChannelError::NothingBuffered);
            }
        };

        // payload length is bounded by capacity, which fits an i32 in practice
        let len = i32::try_from(payload.len()).map_err(|_| ChannelError::InvalidPayloadLength {
            len: i32::MAX,
            capacity: self.config.capacity,
        })?;
        let header = encode_header(kind, len);
        let written = self
            .transport
            .write_exact(&header)
            .and_then(|()| self.transport.write_exact(&payload));
        self.spare = payload;

        match written {
            Ok(()) => {
                trace!(%kind, len, "frame sent");
                self.slot = Slot::Empty;
                Ok(())
            }
            Err(err) => {
                debug!(%kind, error = %err, "frame send failed");
                Err(err.into())
            }
        }
    }

    /// Kind of the next message, pulling a frame if none is buffered.
    ///
    /// Nothing is consumed.
    pub fn peek_kind(&mut self) -> Result<MessageKind> {
        if !matches!(self.slot, Slot::Holding { .. }) {
            self.pull()?;
        }
        match &self.slot {
            Slot::Holding { kind, .. } => Ok(*kind),
            _ => Err(ChannelError::NothingBuffered),
        }
    }

    /// Receive the next message as `M`.
    ///
    /// If the buffered (or freshly read) frame is of another kind, fails with
    /// [`ChannelError::KindMismatch`] and keeps the frame. A payload that does
    /// not decode also stays buffered. Only a successful decode consumes it.
    pub fn receive_as<M: WireMessage>(&mut self) -> Result<M> {
        let found = self.peek_kind()?;
        if found != M::KIND {
            return Err(ChannelError::KindMismatch {
                expected: M::KIND,
                found,
            });
        }

        let decoded = match &self.slot {
            Slot::Holding { payload, .. } => {
                let mut reader = WireReader::new(payload);
                let decoded = M::decode(&mut reader);
                if decoded.is_ok() && reader.remaining() > 0 {
                    debug!(
                        kind = %found,
                        trailing = reader.remaining(),
                        "ignoring trailing payload bytes"
                    );
                }
                decoded
            }
            _ => return Err(ChannelError::NothingBuffered),
        };

        match decoded {
            Ok(message) => {
                self.purge();
                Ok(message)
            }
            Err(source) => {
                warn!(kind = %found, error = %source, "failed to decode frame");
                Err(ChannelError::Decode {
                    kind: found,
                    source,
                })
            }
        }
    }

    /// Drop whatever is buffered and reset to `Empty`.
    pub fn purge(&mut self) {
        if let Slot::Holding { payload, .. } = std::mem::replace(&mut self.slot, Slot::Empty) {
            self.spare = payload;
        }
    }

    /// Read one frame from the transport into the buffer.
    fn pull(&mut self) -> Result<()> {
        self.purge();
        self.slot = Slot::Error;

        let mut header = [0u8; HEADER_SIZE];
        self.transport.read_exact(&mut header)?;
        let (tag, len) = decode_header(&header);

        let capacity = self.config.capacity;
        let size = match usize::try_from(len) {
            Ok(size) if size >= 1 && size <= capacity => size,
            _ => {
                warn!(tag, len, capacity, "rejecting frame with invalid payload length");
                return Err(ChannelError::InvalidPayloadLength { len, capacity });
            }
        };

        let mut payload = self.take_buffer();
        payload.resize(size, 0);
        if let Err(err) = self.transport.read_exact(&mut payload) {
            self.spare = payload;
            return Err(err.into());
        }

        let Some(kind) = MessageKind::from_tag(tag) else {
            self.spare = payload;
            warn!(tag, len, "unknown message tag");
            return Err(ChannelError::UnknownTag(tag));
        };

        trace!(%kind, len, "frame received");
        self.slot = Slot::Holding { kind, payload };
        Ok(())
    }

    fn take_buffer(&mut self) -> BytesMut {
        let mut buf = std::mem::take(&mut self.spare);
        buf.clear();
        buf
    }

    /// Borrow the underlying transport.
    pub fn get_ref(&self) -> &T {
        &self.transport
    }

    /// Mutably borrow the underlying transport.
    pub fn get_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Consume the channel and return the transport.
    pub fn into_inner(self) -> T {
        self.transport
    }
}

impl<T> std::fmt::Debug for FrameChannel<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = match &self.slot {
            Slot::Empty => "empty".to_string(),
            Slot::Holding { kind, payload } => format!("holding {kind} ({} bytes)", payload.len()),
            Slot::Error => "error".to_string(),
        };
        f.debug_struct("FrameChannel")
            .field("state", &state)
            .field("capacity", &self.config.capacity)
            .finish()
    }
}
