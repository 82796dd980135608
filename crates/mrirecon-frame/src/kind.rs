use std::fmt;

use serde::Serialize;

/// The message catalog. Discriminants are the on-wire tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    DataHeader = 0,
    Measurement = 1,
    EndSignal = 2,
    ReconRequest = 3,
    ReconAck = 4,
    Config = 5,
}

impl MessageKind {
    pub const ALL: [MessageKind; 6] = [
        MessageKind::DataHeader,
        MessageKind::Measurement,
        MessageKind::EndSignal,
        MessageKind::ReconRequest,
        MessageKind::ReconAck,
        MessageKind::Config,
    ];

    pub fn tag(self) -> i32 {
        self as i32
    }

    pub fn from_tag(tag: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.tag() == tag)
    }

    pub fn name(self) -> &'static str {
        match self {
            MessageKind::DataHeader => "data-header",
            MessageKind::Measurement => "measurement",
            MessageKind::EndSignal => "end-signal",
            MessageKind::ReconRequest => "recon-request",
            MessageKind::ReconAck => "recon-ack",
            MessageKind::Config => "config",
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
