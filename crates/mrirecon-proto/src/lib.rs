//! Data model and message catalog of the reconstruction protocol.
//!
//! A session carries a [`ReconRequest`], a [`DataHeader`], any number of
//! [`Measurement`]s and an [`EndSignal`] from client to server, and a
//! [`ReconAck`] (plus, on success, the result as another header,
//! measurement stream and end signal) back.

pub mod array;
pub mod error;
pub mod measurement;
pub mod messages;
pub mod stream;

pub use array::{ArraySummary, SampleArray, MAX_ARRAY_VALUES};
pub use error::{ProtoError, Result, StreamError};
pub use measurement::Measurement;
pub use messages::{DataHeader, EndSignal, ReconAck, ReconRequest};
pub use stream::{
    receive_data, receive_measurements, scatter_all, send_data, send_measurements, widen_dims,
};
