use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{self, JoinHandle};
use std::time::SystemTime;

use crossbeam_channel::{bounded, Receiver, Sender};
use gelfprims_chunk::ChunkWriter;
use gelfprims_transport::{local_hostname, Endpoint, GelfConn, Scheme};
use tracing::{debug, info, warn};

use crate::compress::CompressorPools;
use crate::config::{ClientConfig, Compression};
use crate::control::{control_link, ControlHandle};
use crate::dispatch::{self, Backlog, Counters, DeliveryStats, Dispatcher, DropEvent};
use crate::error::{ClientError, Result};
use crate::intake;
use crate::message::Message;
use crate::sink::{MessageSink, SharedChunkWriter};

/// GELF client.
///
/// A client is inert until [`dial`](Client::dial) connects it. While
/// connected, [`queue_msg`](Client::queue_msg) hands messages to background
/// workers and returns immediately unless the intake channel is full.
/// [`close`](Client::close) blocks until every queued message has been
/// handed to the transport, then releases the connection; the client can be
/// dialed again afterwards.
///
/// ```no_run
/// use gelfprims_client::{Client, Level, Message};
///
/// let mut client = Client::new()?;
/// client.dial("udp://graylog.internal:12201?compress=zlib")?;
/// client.queue_msg(Message::new("cache warmed").with_level(Level::Informational))?;
/// client.close()?;
/// # Ok::<(), gelfprims_client::ClientError>(())
/// ```
pub struct Client {
    config: ClientConfig,
    hostname: Arc<str>,
    session: Option<Session>,
    counters: Arc<Counters>,
    drop_tx: Sender<DropEvent>,
    drop_rx: Receiver<DropEvent>,
}

/// Everything owned by one dialed connection.
struct Session {
    endpoint: Endpoint,
    intake: IntakeGate,
    backlog: Arc<Backlog>,
    sink: SharedChunkWriter<GelfConn>,
    intake_control: ControlHandle,
    dispatch_control: ControlHandle,
    intake_worker: JoinHandle<()>,
    dispatcher: JoinHandle<()>,
}

impl Client {
    /// Create a client with the default configuration.
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a client with an explicit configuration.
    ///
    /// Fails with [`ClientError::Config`] for an unusable frame size or when
    /// the local hostname cannot be resolved.
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let hostname: Arc<str> = local_hostname()?.into();
        let (drop_tx, drop_rx) = bounded(dispatch::DROP_CHANNEL_CAPACITY);

        debug!(%hostname, frame_size = config.frame_size, compression = %config.compression, "client created");
        Ok(Self {
            config,
            hostname,
            session: None,
            counters: Arc::new(Counters::default()),
            drop_tx,
            drop_rx,
        })
    }

    /// Connect to `scheme://host[:port][?compress=none|zlib|gzip]` and start
    /// the background workers.
    ///
    /// A recognized `compress` value replaces the configured compression;
    /// an unrecognized one is ignored.
    pub fn dial(&mut self, uri: &str) -> Result<()> {
        if self.session.is_some() {
            return Err(ClientError::AlreadyConnected);
        }

        let endpoint = Endpoint::parse(uri)?;
        if let Some(value) = endpoint.query_value("compress") {
            match value.parse::<Compression>() {
                Ok(compression) => self.config.compression = compression,
                Err(_) => warn!(
                    value,
                    compression = %self.config.compression,
                    "ignoring unknown compress value"
                ),
            }
        }
        if unframed_compression(endpoint.scheme(), self.config.compression) {
            warn!(
                endpoint = %endpoint,
                compression = %self.config.compression,
                "compressed messages over tcp are written back to back without a delimiter; \
                 null-delimited GELF tcp inputs cannot parse them"
            );
        }

        let conn = GelfConn::dial(&endpoint)?;
        conn.set_write_timeout(self.config.write_timeout)?;
        let writer = ChunkWriter::for_conn(conn, self.config.frame_size)?;
        let session = self.start(endpoint, SharedChunkWriter::new(writer))?;

        info!(
            endpoint = %session.endpoint,
            compression = %self.config.compression,
            frame_size = self.config.frame_size,
            "connected"
        );
        self.session = Some(session);
        Ok(())
    }

    fn start(&self, endpoint: Endpoint, sink: SharedChunkWriter<GelfConn>) -> Result<Session> {
        let (intake_tx, intake_rx) = bounded(self.config.intake_capacity);
        let backlog = Arc::new(Backlog::default());
        let (intake_control, intake_port) = control_link("intake");
        let (dispatch_control, dispatch_port) = control_link("dispatch");

        let intake_backlog = Arc::clone(&backlog);
        let intake_worker = thread::Builder::new()
            .name("gelfprims-intake".to_string())
            .spawn(move || intake::run(intake_rx, intake_backlog, intake_port))?;

        let dispatcher = Dispatcher {
            backlog: Arc::clone(&backlog),
            pools: CompressorPools::new(sink.clone()),
            compression: self.config.compression,
            control: dispatch_port,
            poll_interval: self.config.poll_interval,
            counters: Arc::clone(&self.counters),
            drops: self.drop_tx.clone(),
        };
        let dispatcher = match thread::Builder::new()
            .name("gelfprims-dispatch".to_string())
            .spawn(move || dispatcher.run())
        {
            Ok(handle) => handle,
            Err(err) => {
                let _ = intake_control.request_drain(|| {});
                let _ = intake_worker.join();
                return Err(err.into());
            }
        };

        Ok(Session {
            endpoint,
            intake: IntakeGate::new(intake_tx),
            backlog,
            sink,
            intake_control,
            dispatch_control,
            intake_worker,
            dispatcher,
        })
    }

    /// Queue a message for delivery.
    ///
    /// Assigns the current time when the message has no timestamp and the
    /// local hostname when `host` is empty. Blocks only while the intake
    /// channel is full.
    pub fn queue_msg(&self, message: Message) -> Result<()> {
        let session = self.session.as_ref().ok_or(ClientError::NotConnected)?;
        enqueue(&session.intake, &self.hostname, message)
    }

    /// A cloneable handle that queues onto the current connection from
    /// other threads.
    pub fn queue_handle(&self) -> Result<QueueHandle> {
        let session = self.session.as_ref().ok_or(ClientError::NotConnected)?;
        Ok(QueueHandle {
            intake: session.intake.clone(),
            hostname: Arc::clone(&self.hostname),
        })
    }

    /// Drain the pipeline and release the connection.
    ///
    /// Returns once every message queued before the call has been handed
    /// to the transport. Closing an inert client succeeds immediately. The
    /// client is inert afterwards even when an error is returned.
    pub fn close(&mut self) -> Result<()> {
        let Some(session) = self.session.take() else {
            return Ok(());
        };
        let endpoint = session.endpoint.to_string();
        let result = session.shutdown();
        match &result {
            Ok(()) => info!(%endpoint, stats = ?self.counters.snapshot(), "closed"),
            Err(err) => warn!(%endpoint, error = %err, "close failed"),
        }
        result
    }

    /// Receiver of messages the dispatcher dropped.
    ///
    /// Events are buffered up to a small bound; when nobody drains them,
    /// newer events are discarded (the dropped counter still counts them).
    pub fn drops(&self) -> Receiver<DropEvent> {
        self.drop_rx.clone()
    }

    /// Delivery counters accumulated over the client's lifetime.
    pub fn stats(&self) -> DeliveryStats {
        self.counters.snapshot()
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Hostname filled into messages that do not set one.
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Messages accepted but not yet picked up by the dispatcher.
    pub fn pending(&self) -> usize {
        self.session
            .as_ref()
            .map_or(0, |s| s.intake.len() + s.backlog.len())
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err, "failed to close client on drop");
        }
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("config", &self.config)
            .field("hostname", &self.hostname)
            .field(
                "endpoint",
                &self.session.as_ref().map(|s| s.endpoint.to_string()),
            )
            .finish()
    }
}

impl Session {
    /// Stop both workers in pipeline order and close the socket.
    ///
    /// Every step runs even after a failure; the first error is returned.
    fn shutdown(self) -> Result<()> {
        let Session {
            endpoint: _,
            intake,
            backlog,
            mut sink,
            intake_control,
            dispatch_control,
            intake_worker,
            dispatcher,
        } = self;
        let mut first_err: Option<ClientError> = None;
        let mut record = |err: ClientError| {
            first_err.get_or_insert(err);
        };

        // Once sealed no queue handle can add to the channel, so the intake
        // worker's final emptiness check is stable.
        intake.seal();
        if let Err(err) = intake_control.request_drain(|| {}) {
            record(err);
        }
        if intake_worker.join().is_err() {
            record(ClientError::Shutdown("intake worker panicked".to_string()));
        }

        if let Err(err) = dispatch_control.request_drain(|| backlog.nudge()) {
            record(err);
        }
        if dispatcher.join().is_err() {
            record(ClientError::Shutdown("dispatcher panicked".to_string()));
        }

        // Compressors dropped with the dispatcher may have finished their
        // streams into the writer; that output is not a message.
        sink.discard_message();

        match sink.try_into_inner() {
            Ok(writer) => {
                if let Err(err) = writer.into_inner().close() {
                    record(err.into());
                }
            }
            Err(_) => record(ClientError::Shutdown(
                "chunk writer still in use after workers stopped".to_string(),
            )),
        }

        first_err.map_or(Ok(()), Err)
    }
}

/// Sending side of one session's intake channel, shared by the client and
/// its queue handles.
///
/// Senders hold the read lock across `send`, so once [`seal`](Self::seal)
/// returns every accepted message is already in the channel.
#[derive(Debug, Clone)]
struct IntakeGate(Arc<RwLock<Option<Sender<Message>>>>);

impl IntakeGate {
    fn new(sender: Sender<Message>) -> Self {
        Self(Arc::new(RwLock::new(Some(sender))))
    }

    fn send(&self, message: Message) -> Result<()> {
        let sender = self.0.read().unwrap_or_else(PoisonError::into_inner);
        match sender.as_ref() {
            Some(sender) => sender.send(message).map_err(|_| ClientError::NotConnected),
            None => Err(ClientError::NotConnected),
        }
    }

    /// Refuse further messages and drop the sender.
    fn seal(&self) {
        self.0.write().unwrap_or_else(PoisonError::into_inner).take();
    }

    fn len(&self) -> usize {
        self.0
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map_or(0, Sender::len)
    }
}

/// Whether compressed output goes to a transport that has no frame
/// delimiter.
fn unframed_compression(scheme: Scheme, compression: Compression) -> bool {
    scheme == Scheme::Tcp && compression != Compression::None
}

/// Cloneable sender bound to one connection.
///
/// Fails with [`ClientError::NotConnected`] once that connection has been
/// closed, even if the client has since been dialed again.
#[derive(Debug, Clone)]
pub struct QueueHandle {
    intake: IntakeGate,
    hostname: Arc<str>,
}

impl QueueHandle {
    pub fn queue_msg(&self, message: Message) -> Result<()> {
        enqueue(&self.intake, &self.hostname, message)
    }
}

fn enqueue(intake: &IntakeGate, hostname: &str, mut message: Message) -> Result<()> {
    if message.timestamp.is_none() {
        message.timestamp = Some(SystemTime::now());
    }
    if message.host.is_empty() {
        message.host = hostname.to_string();
    }
    intake.send(message)
}
