use std::net::ToSocketAddrs;

use mrirecon_frame::{ChannelConfig, FrameChannel};
use mrirecon_proto::{
    receive_data, send_data, send_measurements, DataHeader, Measurement, ReconAck, ReconRequest,
    SampleArray,
};
use mrirecon_transport::{Connection, TcpSocket, Transport};
use tracing::{debug, info};

use crate::error::ClientError;

/// What the server sent back for one job.
#[derive(Debug, Clone, Default)]
pub struct ReconResponse {
    /// `None` for silent requests.
    pub ack: Option<ReconAck>,
    /// The reconstructed dataset, present only on success.
    pub data: Option<SampleArray>,
}

impl ReconResponse {
    pub fn succeeded(&self) -> bool {
        self.ack.as_ref().is_some_and(|ack| ack.success)
    }
}

/// Client side of a reconstruction session.
///
/// A client submits one job per connection.
#[derive(Debug)]
pub struct ReconClient<T = Connection> {
    channel: FrameChannel<T>,
}

impl ReconClient<Connection> {
    /// Connect to a server over TCP.
    pub fn connect(addr: impl ToSocketAddrs + std::fmt::Display) -> Result<Self, ClientError> {
        Self::connect_with_config(addr, ChannelConfig::network())
    }

    pub fn connect_with_config(
        addr: impl ToSocketAddrs + std::fmt::Display,
        config: ChannelConfig,
    ) -> Result<Self, ClientError> {
        let connection = TcpSocket::connect(addr)?;
        info!(peer = %connection.peer_label(), "connected to server");
        Ok(Self::new(FrameChannel::with_config(connection, config)))
    }
}

impl<T: Transport> ReconClient<T> {
    pub fn new(channel: FrameChannel<T>) -> Self {
        Self { channel }
    }

    /// Submit a job from a header and a measurement stream.
    pub fn submit(
        mut self,
        request: &ReconRequest,
        header: &DataHeader,
        measurements: &[Measurement],
    ) -> Result<ReconResponse, ClientError> {
        self.channel.send(request)?;
        self.channel.send(header)?;
        send_measurements(&mut self.channel, measurements)?;
        debug!(count = measurements.len(), "job sent");
        self.finish(request.silent)
    }

    /// Submit a job from a dense array, sent one line per measurement.
    pub fn submit_array(
        mut self,
        request: &ReconRequest,
        array: &SampleArray,
    ) -> Result<ReconResponse, ClientError> {
        self.channel.send(request)?;
        send_data(&mut self.channel, array)?;
        debug!(dims = %array.dims(), "job sent");
        self.finish(request.silent)
    }

    fn finish(&mut self, silent: bool) -> Result<ReconResponse, ClientError> {
        if silent {
            return Ok(ReconResponse::default());
        }

        let ack = self.channel.receive_as::<ReconAck>()?;
        info!(success = ack.success, message = %ack.message, "server acknowledged");
        if !ack.success {
            return Ok(ReconResponse {
                ack: Some(ack),
                data: None,
            });
        }

        let data = receive_data(&mut self.channel)?;
        self.channel.send(&ReconAck::ok("result received"))?;
        Ok(ReconResponse {
            ack: Some(ack),
            data: Some(data),
        })
    }
}
