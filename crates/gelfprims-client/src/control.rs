//! Two-phase stop handshake between `Client::close` and a background worker.
//!
//! The coordinator sends [`ControlSignal::ContinueRequest`] and keeps echoing
//! whatever the worker answers until it sees [`ControlSignal::Acknowledged`].
//! A worker answers `ContinueRequest` ("not yet") while it still has pending
//! work and `Acknowledged` once its queue is empty, after which it exits.

use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};

use crate::error::{ClientError, Result};

/// Signal exchanged over a control link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ControlSignal {
    ContinueRequest = 1,
    Acknowledged = 2,
}

/// Create a connected coordinator/worker pair.
pub(crate) fn control_link(worker: &'static str) -> (ControlHandle, ControlPort) {
    let (request_tx, request_rx) = bounded(1);
    let (reply_tx, reply_rx) = bounded(1);
    (
        ControlHandle {
            worker,
            requests: request_tx,
            replies: reply_rx,
        },
        ControlPort {
            requests: request_rx,
            replies: reply_tx,
        },
    )
}

/// Coordinator end of a control link.
pub(crate) struct ControlHandle {
    worker: &'static str,
    requests: Sender<ControlSignal>,
    replies: Receiver<ControlSignal>,
}

impl ControlHandle {
    /// Ask the worker to drain and stop, blocking until it acknowledges.
    ///
    /// `nudge` runs after every request so a worker parked on some other
    /// wait primitive notices it promptly.
    pub(crate) fn request_drain(&self, mut nudge: impl FnMut()) -> Result<()> {
        let mut signal = ControlSignal::ContinueRequest;
        let mut rounds = 0u64;
        loop {
            self.requests.send(signal).map_err(|_| self.gone())?;
            nudge();
            rounds += 1;

            match self.replies.recv().map_err(|_| self.gone())? {
                ControlSignal::Acknowledged => {
                    tracing::debug!(worker = self.worker, rounds, "worker acknowledged stop");
                    return Ok(());
                }
                reply => signal = reply,
            }
        }
    }

    fn gone(&self) -> ClientError {
        ClientError::Shutdown(format!("{} worker exited without acknowledging", self.worker))
    }
}

/// Worker end of a control link.
pub(crate) struct ControlPort {
    requests: Receiver<ControlSignal>,
    replies: Sender<ControlSignal>,
}

impl ControlPort {
    /// Receiver for use in `select!`.
    pub(crate) fn receiver(&self) -> &Receiver<ControlSignal> {
        &self.requests
    }

    /// Non-blocking check for a stop request.
    ///
    /// A dropped coordinator counts as a request: nobody is left to ask, so
    /// the worker drains and exits.
    pub(crate) fn poll(&self) -> Option<ControlSignal> {
        match self.requests.try_recv() {
            Ok(signal) => Some(signal),
            Err(TryRecvError::Empty) => None,
            Err(TryRecvError::Disconnected) => Some(ControlSignal::ContinueRequest),
        }
    }

    /// Report that the worker's queue is empty and it is stopping.
    pub(crate) fn acknowledge(&self) {
        let _ = self.replies.send(ControlSignal::Acknowledged);
    }

    /// Report that work remains; the coordinator will ask again.
    pub(crate) fn not_yet(&self) {
        let _ = self.replies.send(ControlSignal::ContinueRequest);
    }
}
