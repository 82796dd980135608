//! Payload primitives: 32-bit little-endian integers, length-prefixed
//! strings, dimension vectors and sample runs.
//!
//! Wire format of a frame:
//! ```text
//! ┌────────────┬────────────┬───────────────────┐
//! │ Tag        │ Length     │ Payload           │
//! │ (4B LE i32)│ (4B LE i32)│ (Length bytes)    │
//! └────────────┴────────────┴───────────────────┘
//! ```

use bytes::{Buf, BufMut, BytesMut};

use crate::dims::{Axis, Dimensions};
use crate::error::WireError;
use crate::kind::MessageKind;

/// Frame header: tag (4) + length (4) = 8 bytes.
pub const HEADER_SIZE: usize = 8;

/// Strings of this many bytes or more are rejected in both directions.
pub const MAX_STRING_LEN: usize = 1024;

/// Default payload capacity for socket channels: 1 MiB.
pub const DEFAULT_NETWORK_CAPACITY: usize = 1024 * 1024;

/// Default payload capacity for file and pipe channels: 100 KiB.
pub const DEFAULT_FILE_CAPACITY: usize = 100 * 1024;

const INT_SIZE: usize = 4;

type WireResult<T> = std::result::Result<T, WireError>;

/// A message that can travel in a frame.
pub trait WireMessage: Sized {
    /// Tag written in front of the payload.
    const KIND: MessageKind;

    /// Append the payload to `dst`.
    fn encode(&self, dst: &mut WireWriter<'_>) -> WireResult<()>;

    /// Parse the payload from `src`.
    fn decode(src: &mut WireReader<'_>) -> WireResult<Self>;
}

/// Encode a frame header.
pub fn encode_header(kind: MessageKind, payload_len: i32) -> [u8; HEADER_SIZE] {
    let mut header = [0u8; HEADER_SIZE];
    header[..INT_SIZE].copy_from_slice(&kind.tag().to_le_bytes());
    header[INT_SIZE..].copy_from_slice(&payload_len.to_le_bytes());
    header
}

/// Decode a frame header into its raw `(tag, payload_len)` fields.
pub fn decode_header(header: &[u8; HEADER_SIZE]) -> (i32, i32) {
    let mut src = &header[..];
    let tag = src.get_i32_le();
    let len = src.get_i32_le();
    (tag, len)
}

/// Bounded payload writer. Fails instead of growing past `limit` bytes.
pub struct WireWriter<'a> {
    dst: &'a mut BytesMut,
    limit: usize,
}

impl<'a> WireWriter<'a> {
    /// Write into `dst`, which must not exceed `limit` bytes in total.
    pub fn new(dst: &'a mut BytesMut, limit: usize) -> Self {
        Self { dst, limit }
    }

    /// Bytes written so far.
    pub fn written(&self) -> usize {
        self.dst.len()
    }

    /// Bytes that may still be written.
    pub fn remaining(&self) -> usize {
        self.limit.saturating_sub(self.dst.len())
    }

    fn reserve(&mut self, needed: usize) -> WireResult<()> {
        let remaining = self.remaining();
        if needed > remaining {
            return Err(WireError::Capacity { needed, remaining });
        }
        self.dst.reserve(needed);
        Ok(())
    }

    pub fn put_int(&mut self, value: i32) -> WireResult<()> {
        self.reserve(INT_SIZE)?;
        self.dst.put_i32_le(value);
        Ok(())
    }

    /// Booleans travel as 0 or 1.
    pub fn put_flag(&mut self, value: bool) -> WireResult<()> {
        self.put_int(i32::from(value))
    }

    /// Counts and lengths travel as non-negative ints.
    pub fn put_count(&mut self, count: usize) -> WireResult<()> {
        let value = i32::try_from(count).map_err(|_| WireError::Capacity {
            needed: count,
            remaining: i32::MAX as usize,
        })?;
        self.put_int(value)
    }

    pub fn put_string(&mut self, value: &str) -> WireResult<()> {
        let len = value.len();
        if len >= MAX_STRING_LEN {
            return Err(WireError::StringTooLong {
                len,
                max: MAX_STRING_LEN,
            });
        }
        self.reserve(INT_SIZE + len)?;
        self.dst.put_i32_le(len as i32);
        self.dst.put_slice(value.as_bytes());
        Ok(())
    }

    pub fn put_dims(&mut self, dims: &Dimensions) -> WireResult<()> {
        self.reserve(INT_SIZE * Axis::ALL.len())?;
        for value in dims.to_array() {
            let value =
                i32::try_from(value).map_err(|_| WireError::InvalidDimension(i64::from(value)))?;
            self.dst.put_i32_le(value);
        }
        Ok(())
    }

    pub fn put_f32_slice(&mut self, values: &[f32]) -> WireResult<()> {
        self.reserve(values.len().saturating_mul(INT_SIZE))?;
        for value in values {
            self.dst.put_f32_le(*value);
        }
        Ok(())
    }
}

/// Payload reader over a borrowed byte slice.
pub struct WireReader<'a> {
    src: &'a [u8],
}

impl<'a> WireReader<'a> {
    pub fn new(src: &'a [u8]) -> Self {
        Self { src }
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.src.len()
    }

    fn require(&self, needed: usize) -> WireResult<()> {
        if needed > self.src.len() {
            return Err(WireError::Capacity {
                needed,
                remaining: self.src.len(),
            });
        }
        Ok(())
    }

    pub fn get_int(&mut self) -> WireResult<i32> {
        self.require(INT_SIZE)?;
        Ok(self.src.get_i32_le())
    }

    /// Any non-zero value reads as true.
    pub fn get_flag(&mut self) -> WireResult<bool> {
        Ok(self.get_int()? != 0)
    }

    pub fn get_count(&mut self) -> WireResult<usize> {
        let value = self.get_int()?;
        usize::try_from(value).map_err(|_| WireError::NegativeLength(value))
    }

    pub fn get_string(&mut self) -> WireResult<String> {
        let len = self.get_count()?;
        if len >= MAX_STRING_LEN {
            return Err(WireError::StringTooLong {
                len,
                max: MAX_STRING_LEN,
            });
        }
        self.require(len)?;
        let (raw, rest) = self.src.split_at(len);
        self.src = rest;
        String::from_utf8(raw.to_vec()).map_err(|_| WireError::InvalidUtf8)
    }

    pub fn get_dims(&mut self) -> WireResult<Dimensions> {
        self.require(INT_SIZE * Axis::ALL.len())?;
        let mut dims = Dimensions::zero();
        for axis in Axis::ALL {
            let value = self.src.get_i32_le();
            let value =
                u32::try_from(value).map_err(|_| WireError::InvalidDimension(i64::from(value)))?;
            dims.set_axis(axis, value);
        }
        Ok(dims)
    }

    pub fn get_f32_vec(&mut self, count: usize) -> WireResult<Vec<f32>> {
        let needed = count.checked_mul(INT_SIZE).ok_or(WireError::Capacity {
            needed: usize::MAX,
            remaining: self.src.len(),
        })?;
        self.require(needed)?;
        let mut values = Vec::with_capacity(count);
        for _ in 0..count {
            values.push(self.src.get_f32_le());
        }
        Ok(values)
    }
}
