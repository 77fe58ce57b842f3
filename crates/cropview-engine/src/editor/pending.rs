use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError};

use crate::error::EditorError;

use super::Shared;

/// Reply to a queued command, delivered once the render context has run it.
///
/// Waiting is only allowed off the render thread: the reply cannot arrive
/// while the thread that would produce it is blocked here.
#[must_use = "a pending reply does nothing unless waited on or polled"]
pub struct Pending<T> {
    rx: Receiver<T>,
    shared: Arc<Shared>,
}

impl<T> Pending<T> {
    pub(crate) fn new(rx: Receiver<T>, shared: Arc<Shared>) -> Self {
        Self { rx, shared }
    }

    /// Blocks until the reply arrives or `timeout` elapses.
    pub fn wait(self, timeout: Duration) -> Result<T, EditorError> {
        if self.shared.is_render_thread() {
            return Err(EditorError::InvalidState(
                "cannot wait for the render thread from the render thread",
            ));
        }
        match self.rx.recv_timeout(timeout) {
            Ok(value) => Ok(value),
            Err(RecvTimeoutError::Timeout) => Err(EditorError::Timeout(timeout)),
            Err(RecvTimeoutError::Disconnected) => Err(EditorError::Disconnected),
        }
    }

    /// Returns the reply if it has already arrived.
    pub fn try_get(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }
}
