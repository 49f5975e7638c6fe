//! Connection layer for GELF clients.
//!
//! Turns a dial URI such as `udp://graylog.local:12201?compress=gzip` into a
//! connected socket:
//! - [`Endpoint`] parses and validates the URI
//! - [`GelfConn`] wraps the connected UDP or TCP socket behind `Write`
//! - [`local_hostname`] resolves the host name stamped on outgoing messages
//!
//! This is the lowest layer of gelfprims. The chunk writer and client build
//! on top of the [`GelfConn`] type provided here.

pub mod conn;
pub mod endpoint;
pub mod error;
pub mod hostname;

pub use conn::GelfConn;
pub use endpoint::{Endpoint, Scheme, DEFAULT_PORT};
pub use error::{Result, TransportError};
pub use hostname::local_hostname;
