//! Asynchronous GELF delivery.
//!
//! [`Client`] accepts [`Message`]s from any number of threads and hands them
//! to two background workers: an intake worker that moves messages from a
//! bounded channel into an ordered backlog, and a dispatcher that serializes,
//! compresses and chunks them onto the wire. [`Client::close`] drains both
//! before releasing the connection.

pub mod client;
pub mod compress;
pub mod config;
pub mod control;
mod dispatch;
pub mod error;
mod intake;
pub mod message;
pub mod pool;
pub mod sink;

pub use client::{Client, QueueHandle};
pub use compress::{CompressorPools, GzipCompressor, ZlibCompressor};
pub use config::{ClientConfig, Compression, DEFAULT_INTAKE_CAPACITY, DEFAULT_POLL_INTERVAL};
pub use control::ControlSignal;
pub use dispatch::{DeliveryStats, DropEvent};
pub use error::{ClientError, Result};
pub use message::{Level, Message, GELF_VERSION};
pub use pool::Pool;
pub use sink::{MessageSink, SharedChunkWriter};
