//! MRI reconstruction job server.
//!
//! A client streams raw k-space measurements to the server, which runs them
//! through a named pipeline of reconstruction plugins and streams the result
//! back.
//!
//! # Crate Structure
//!
//! - [`transport`]: blocking byte transports (TCP, Unix sockets, files)
//! - [`frame`]: tagged frames, wire primitives and the frame channel
//! - [`config`]: three-tier parameter store and JSON parameter documents
//! - [`proto`]: sample arrays, measurements and the message catalog
//! - [`pipeline`]: plugin trait, registry, built-in plugins and pipelines
//! - [`server`]: session controller, listener and submitting client

/// Re-export transport types.
pub mod transport {
    pub use mrirecon_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use mrirecon_frame::*;
}

/// Re-export configuration types.
pub mod config {
    pub use mrirecon_config::*;
}

/// Re-export protocol types.
pub mod proto {
    pub use mrirecon_proto::*;
}

/// Re-export pipeline types.
pub mod pipeline {
    pub use mrirecon_pipeline::*;
}

/// Re-export server and client types.
pub mod server {
    pub use mrirecon_server::*;
}
