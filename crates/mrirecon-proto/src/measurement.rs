use mrirecon_frame::{Dimensions, MessageKind, WireError, WireMessage, WireReader, WireWriter};

use crate::array::SampleArray;
use crate::error::{ProtoError, Result};

/// One readout line for every channel at a fixed coordinate.
///
/// `data` has shape `(samples, 1, channels, 1, ..)`, so each channel's
/// samples are contiguous. `index.column` and `index.channel` are ignored.
#[derive(Debug, Clone, PartialEq)]
pub struct Measurement {
    pub time: i32,
    pub index: Dimensions,
    data: SampleArray,
}

impl Measurement {
    /// Zero-filled measurement at index zero with no timestamp (`-1`).
    pub fn new(samples: u32, channels: u32, complex: bool) -> Result<Self> {
        Ok(Self {
            time: -1,
            index: Dimensions::zero(),
            data: SampleArray::new(Dimensions::with_extent(samples, 1, channels), complex)?,
        })
    }

    /// Measurement with explicit values laid out channel by channel.
    pub fn from_values(
        index: Dimensions,
        samples: u32,
        channels: u32,
        complex: bool,
        values: Vec<f32>,
    ) -> Result<Self> {
        Ok(Self {
            time: -1,
            index,
            data: SampleArray::from_vec(
                Dimensions::with_extent(samples, 1, channels),
                complex,
                values,
            )?,
        })
    }

    pub fn samples(&self) -> u32 {
        self.data.dims().column
    }

    pub fn channels(&self) -> u32 {
        self.data.dims().channel
    }

    pub fn is_complex(&self) -> bool {
        self.data.is_complex()
    }

    pub fn values(&self) -> &[f32] {
        self.data.data()
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        self.data.data_mut()
    }

    /// Values of channel `ch`.
    pub fn channel_values(&self, ch: u32) -> Option<&[f32]> {
        let mut index = Dimensions::zero();
        index.channel = ch;
        self.data.line(&index)
    }

    /// Why this measurement cannot be scattered into `array`, if it cannot.
    pub fn check_compatible(&self, array: &SampleArray) -> Result<()> {
        let reason = if self.is_complex() != array.is_complex() {
            Some("complex flag differs")
        } else if self.samples() != array.dims().column {
            Some("sample count differs from column extent")
        } else if self.channels() != array.dims().channel {
            Some("channel count differs from channel extent")
        } else if !array.dims().contains(&self.line_origin()) {
            Some("index out of bounds")
        } else {
            None
        };
        match reason {
            Some(reason) => Err(ProtoError::Incompatible {
                index: self.index,
                reason,
            }),
            None => Ok(()),
        }
    }

    pub fn is_compatible(&self, array: &SampleArray) -> bool {
        self.check_compatible(array).is_ok()
    }

    /// Copy every channel's samples into `array` at this measurement's index.
    pub fn scatter_into(&self, array: &mut SampleArray) -> Result<()> {
        self.check_compatible(array)?;
        let mut at = self.line_origin();
        for ch in 0..self.channels() {
            at.channel = ch;
            let src = self.channel_values(ch);
            let dst = array.line_mut(&at);
            if let (Some(src), Some(dst)) = (src, dst) {
                dst.copy_from_slice(src);
            }
        }
        Ok(())
    }

    /// Fill this measurement from `array` at this measurement's index.
    pub fn gather_from(&mut self, array: &SampleArray) -> Result<()> {
        self.check_compatible(array)?;
        let mut at = self.line_origin();
        let mut own = Dimensions::zero();
        for ch in 0..self.channels() {
            at.channel = ch;
            own.channel = ch;
            let src = array.line(&at);
            let dst = self.data.line_mut(&own);
            if let (Some(src), Some(dst)) = (src, dst) {
                dst.copy_from_slice(src);
            }
        }
        Ok(())
    }

    fn line_origin(&self) -> Dimensions {
        let mut origin = self.index;
        origin.column = 0;
        origin.channel = 0;
        origin
    }
}

/// `time`, index dims, shape dims, complex flag, then the samples.
impl WireMessage for Measurement {
    const KIND: MessageKind = MessageKind::Measurement;

    fn encode(&self, dst: &mut WireWriter<'_>) -> std::result::Result<(), WireError> {
        dst.put_int(self.time)?;
        dst.put_dims(&self.index)?;
        dst.put_dims(self.data.dims())?;
        dst.put_flag(self.is_complex())?;
        dst.put_f32_slice(self.values())
    }

    fn decode(src: &mut WireReader<'_>) -> std::result::Result<Self, WireError> {
        let time = src.get_int()?;
        let index = src.get_dims()?;
        let shape = src.get_dims()?;
        let complex = src.get_flag()?;

        let expected = Dimensions::with_extent(shape.column, 1, shape.channel);
        if shape != expected || shape.column == 0 || shape.channel == 0 {
            return Err(WireError::UnexpectedValue {
                field: "measurement shape",
                value: i64::from(shape.line),
            });
        }

        let count = shape
            .element_count()
            .and_then(|n| n.checked_mul(if complex { 2 } else { 1 }))
            .ok_or(WireError::UnexpectedValue {
                field: "measurement size",
                value: i64::from(shape.column),
            })?;
        let values = src.get_f32_vec(count)?;
        let data = SampleArray::from_vec(shape, complex, values).map_err(|_| {
            WireError::UnexpectedValue {
                field: "measurement size",
                value: count as i64,
            }
        })?;

        Ok(Self { time, index, data })
    }
}
