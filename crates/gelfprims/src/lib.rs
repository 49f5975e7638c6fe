//! GELF log delivery over UDP or TCP.
//!
//! gelfprims queues structured log records, compresses them with gzip or
//! zlib, and splits anything larger than one datagram into GELF chunks.
//!
//! # Crate Structure
//!
//! - [`transport`]: dial URIs and UDP/TCP connections
//! - [`chunk`]: GELF chunk framing and a reference reassembler
//! - [`client`]: the asynchronous delivery pipeline
//!
//! ```no_run
//! use gelfprims::{Client, Message};
//!
//! let mut client = Client::new()?;
//! client.dial("udp://127.0.0.1:12201")?;
//! client.queue_msg(Message::new("service started").with_field("version", "1.4.2"))?;
//! client.close()?;
//! # Ok::<(), gelfprims::ClientError>(())
//! ```

/// Re-export transport types.
pub mod transport {
    pub use gelfprims_transport::*;
}

/// Re-export chunk framing types.
pub mod chunk {
    pub use gelfprims_chunk::*;
}

/// Re-export client types.
pub mod client {
    pub use gelfprims_client::*;
}

pub use gelfprims_client::{Client, ClientConfig, ClientError, Compression, Level, Message};
