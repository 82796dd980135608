//! Tagged, length-prefixed framing for the reconstruction protocol.
//!
//! Every message travels as one frame:
//! - A 4-byte little-endian signed message tag
//! - A 4-byte little-endian signed payload length
//! - The payload, encoded with the primitives in [`wire`]
//!
//! A [`FrameChannel`] owns one reusable payload buffer and tracks what it
//! currently holds, so a receiver can peek at the next message kind without
//! consuming it.

pub mod channel;
pub mod dims;
pub mod error;
pub mod kind;
pub mod wire;

pub use channel::{ChannelConfig, ChannelState, FrameChannel};
pub use dims::{Axis, Dimensions, AXIS_COUNT};
pub use error::{ChannelError, Result, WireError};
pub use kind::MessageKind;
pub use wire::{
    decode_header, encode_header, WireMessage, WireReader, WireWriter, DEFAULT_FILE_CAPACITY,
    DEFAULT_NETWORK_CAPACITY, HEADER_SIZE, MAX_STRING_LEN,
};
