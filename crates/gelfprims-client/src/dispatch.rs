use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use crossbeam_channel::{Sender, TrySendError};
use serde::Serialize;
use tracing::{debug, trace, warn};

use crate::compress::CompressorPools;
use crate::config::Compression;
use crate::control::ControlPort;
use crate::error::ClientError;
use crate::message::Message;
use crate::sink::MessageSink;

/// Capacity of the drop observation channel.
pub(crate) const DROP_CHANNEL_CAPACITY: usize = 64;

/// A message the dispatcher gave up on, with the reason.
#[derive(Debug)]
pub struct DropEvent {
    pub message: Message,
    pub error: ClientError,
}

/// Snapshot of delivery counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
    /// Messages handed to the transport.
    pub delivered: u64,
    /// Messages dropped because they could not be serialized or written.
    pub dropped: u64,
}

#[derive(Debug, Default)]
pub(crate) struct Counters {
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl Counters {
    pub(crate) fn snapshot(&self) -> DeliveryStats {
        DeliveryStats {
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
        }
    }
}

/// FIFO of messages waiting for the dispatcher.
///
/// Appends wake the dispatcher through the condition variable; an idle
/// dispatcher still re-checks on a fixed interval.
#[derive(Debug, Default)]
pub(crate) struct Backlog {
    queue: Mutex<VecDeque<Message>>,
    wake: Condvar,
}

impl Backlog {
    fn lock(&self) -> MutexGuard<'_, VecDeque<Message>> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn push(&self, message: Message) {
        self.lock().push_back(message);
        self.wake.notify_one();
    }

    pub(crate) fn pop(&self) -> Option<Message> {
        self.lock().pop_front()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Wake a parked dispatcher.
    ///
    /// Taking the lock orders the wake-up after any control message sent
    /// before the call, so it cannot slip in between the dispatcher's
    /// control check and its wait.
    pub(crate) fn nudge(&self) {
        let _queue = self.lock();
        self.wake.notify_all();
    }

    /// Idle step of the dispatcher.
    ///
    /// Returns `true` when a stop request arrived while the queue was empty.
    /// Otherwise waits up to `timeout` for new work and returns `false`.
    fn idle(&self, control: &ControlPort, timeout: Duration) -> bool {
        let queue = self.lock();
        if !queue.is_empty() {
            return false;
        }
        if control.poll().is_some() {
            return true;
        }
        let _ = self
            .wake
            .wait_timeout(queue, timeout)
            .unwrap_or_else(PoisonError::into_inner);
        false
    }
}

/// Single consumer of the backlog: serialize, compress, chunk, send.
pub(crate) struct Dispatcher<S: MessageSink> {
    pub(crate) backlog: Arc<Backlog>,
    pub(crate) pools: CompressorPools<S>,
    pub(crate) compression: Compression,
    pub(crate) control: ControlPort,
    pub(crate) poll_interval: Duration,
    pub(crate) counters: Arc<Counters>,
    pub(crate) drops: Sender<DropEvent>,
}

impl<S: MessageSink> Dispatcher<S> {
    pub(crate) fn run(self) {
        debug!(compression = %self.compression, "dispatcher started");
        loop {
            match self.backlog.pop() {
                Some(message) => {
                    self.dispatch(message);
                    if self.control.poll().is_some() {
                        if self.backlog.is_empty() {
                            break;
                        }
                        self.control.not_yet();
                    }
                }
                None => {
                    if self.backlog.idle(&self.control, self.poll_interval) {
                        break;
                    }
                }
            }
        }
        self.control.acknowledge();
        debug!(stats = ?self.counters.snapshot(), "dispatcher stopped");
    }

    fn dispatch(&self, message: Message) {
        let result = message
            .to_json()
            .and_then(|json| self.pools.write_msg(json.as_bytes(), self.compression));

        match result {
            Ok(frames) => {
                self.counters.delivered.fetch_add(1, Ordering::Relaxed);
                trace!(frames, "message delivered");
            }
            Err(error) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                warn!(
                    short_message = %message.short_message,
                    error = %error,
                    "dropping message"
                );
                match self.drops.try_send(DropEvent { message, error }) {
                    Ok(()) | Err(TrySendError::Disconnected(_)) => {}
                    Err(TrySendError::Full(_)) => trace!("drop channel full, event discarded"),
                }
            }
        }
    }
}
