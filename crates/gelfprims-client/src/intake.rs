use std::sync::Arc;

use crossbeam_channel::{select, Receiver};
use tracing::debug;

use crate::control::ControlPort;
use crate::dispatch::Backlog;
use crate::message::Message;

/// Moves messages from the bounded intake channel into the backlog until
/// a stop request finds the channel empty.
pub(crate) fn run(intake: Receiver<Message>, backlog: Arc<Backlog>, control: ControlPort) {
    debug!("intake worker started");
    let mut moved = 0u64;

    loop {
        select! {
            recv(intake) -> message => match message {
                Ok(message) => {
                    backlog.push(message);
                    moved += 1;
                }
                // Every sender is gone, so nothing more can arrive; only a
                // stop request is left to wait for.
                Err(_) => {
                    let _ = control.receiver().recv();
                    break;
                }
            },
            recv(control.receiver()) -> request => {
                if request.is_err() || intake.is_empty() {
                    break;
                }
                control.not_yet();
            }
        }
    }

    control.acknowledge();
    debug!(moved, "intake worker stopped");
}
