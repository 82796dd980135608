use mrirecon_config::ConfigStore;
use mrirecon_frame::{
    Dimensions, MessageKind, WireError, WireMessage, WireReader, WireWriter, MAX_STRING_LEN,
};
use serde::Serialize;

type WireResult<T> = std::result::Result<T, WireError>;

/// Declared shape of the dataset that follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DataHeader {
    pub dims: Dimensions,
    pub complex: bool,
}

impl WireMessage for DataHeader {
    const KIND: MessageKind = MessageKind::DataHeader;

    fn encode(&self, dst: &mut WireWriter<'_>) -> WireResult<()> {
        dst.put_dims(&self.dims)?;
        dst.put_flag(self.complex)
    }

    fn decode(src: &mut WireReader<'_>) -> WireResult<Self> {
        Ok(Self {
            dims: src.get_dims()?,
            complex: src.get_flag()?,
        })
    }
}

/// Terminates a measurement stream. Carries a single `0`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EndSignal;

impl WireMessage for EndSignal {
    const KIND: MessageKind = MessageKind::EndSignal;

    fn encode(&self, dst: &mut WireWriter<'_>) -> WireResult<()> {
        dst.put_int(0)
    }

    fn decode(src: &mut WireReader<'_>) -> WireResult<Self> {
        match src.get_int()? {
            0 => Ok(Self),
            value => Err(WireError::UnexpectedValue {
                field: "end signal",
                value: i64::from(value),
            }),
        }
    }
}

/// Asks the server to run a named pipeline.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconRequest {
    pub pipeline: String,
    /// Skip the acknowledgement and the result stream.
    pub silent: bool,
    /// Per-request configuration layer.
    pub config: ConfigStore,
}

impl ReconRequest {
    pub fn new(pipeline: impl Into<String>) -> Self {
        Self {
            pipeline: pipeline.into(),
            ..Self::default()
        }
    }
}

impl WireMessage for ReconRequest {
    const KIND: MessageKind = MessageKind::ReconRequest;

    fn encode(&self, dst: &mut WireWriter<'_>) -> WireResult<()> {
        dst.put_string(&self.pipeline)?;
        dst.put_flag(self.silent)?;
        self.config.encode(dst)
    }

    fn decode(src: &mut WireReader<'_>) -> WireResult<Self> {
        Ok(Self {
            pipeline: src.get_string()?,
            silent: src.get_flag()?,
            config: ConfigStore::decode(src)?,
        })
    }
}

/// Outcome of a request, or the client's closing acknowledgement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReconAck {
    pub success: bool,
    pub message: String,
}

impl ReconAck {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: clamp_message(message.into()),
        }
    }

    /// A failure acknowledgement. Messages that would not fit a wire string
    /// are cut on a char boundary so the ack always encodes.
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: clamp_message(message.into()),
        }
    }
}

fn clamp_message(mut message: String) -> String {
    if message.len() < MAX_STRING_LEN {
        return message;
    }
    let mut end = MAX_STRING_LEN - 1;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    message.truncate(end);
    message
}

impl WireMessage for ReconAck {
    const KIND: MessageKind = MessageKind::ReconAck;

    fn encode(&self, dst: &mut WireWriter<'_>) -> WireResult<()> {
        dst.put_flag(self.success)?;
        dst.put_string(&self.message)
    }

    fn decode(src: &mut WireReader<'_>) -> WireResult<Self> {
        Ok(Self {
            success: src.get_flag()?,
            message: src.get_string()?,
        })
    }
}
