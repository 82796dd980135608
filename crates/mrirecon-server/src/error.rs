use mrirecon_config::ConfigError;
use mrirecon_frame::ChannelError;
use mrirecon_pipeline::PipelineError;
use mrirecon_proto::{ProtoError, StreamError};

/// Errors that stop the server itself.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] mrirecon_transport::TransportError),

    /// The main configuration could not be read.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The main configuration is readable but unusable.
    #[error("invalid server configuration: {0}")]
    InvalidConfig(String),

    /// Spawning a connection handler failed.
    #[error("failed to fork connection handler: {0}")]
    Fork(std::io::Error),

    /// Installing the child reaper failed.
    #[error("failed to install SIGCHLD handler: {0}")]
    Signal(std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

/// Why a request failed. The message is sent back in the acknowledgement.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("failed to receive reconstruction request: {0}")]
    Request(ChannelError),

    #[error("failed to receive data header: {0}")]
    Header(ChannelError),

    #[error("failed to receive measurements: {0}")]
    Measurements(StreamError),

    #[error("invalid pipeline name {0:?}")]
    PipelineName(String),

    #[error("failed to load pipeline {name:?}: {source}")]
    PipelineLoad {
        name: String,
        source: PipelineError,
    },

    #[error("failed to load configuration of pipeline {name:?}: {source}")]
    PipelineConfig {
        name: String,
        source: PipelineError,
    },

    #[error("main configuration rejected: {0}")]
    MainConfig(PipelineError),

    #[error("pipeline configuration rejected: {0}")]
    PipelineConfigRejected(PipelineError),

    #[error("request configuration rejected: {0}")]
    RequestConfig(PipelineError),

    #[error("failed to allocate data: {0}")]
    Allocate(ProtoError),

    #[error("reconstruction failed: {0}")]
    Reconstruct(PipelineError),
}

/// Errors seen by a submitting client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(#[from] mrirecon_transport::TransportError),

    /// Sending the job or receiving the acknowledgement failed.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// The result stream was cut short or malformed.
    #[error("result stream error: {0}")]
    Stream(#[from] StreamError),
}
