//! Cooperative cancellation
//!
//! A [`CancellationHandle`] owns the sending side of a watch channel; every
//! [`CancelSignal`] cloned from it observes the same flag. Traversal code
//! polls the signal at branch entry, and the HTTP transport checks it before
//! dispatching a request. Requests already in flight are not interrupted;
//! their results are discarded by the caller.

use tokio::sync::watch;

/// Handle for cancelling an explore request from outside
#[derive(Debug)]
pub struct CancellationHandle {
    cancel_tx: watch::Sender<bool>,
}

impl CancellationHandle {
    /// Create a new handle and the signal it controls
    pub fn new() -> (Self, CancelSignal) {
        let (tx, rx) = watch::channel(false);
        (Self { cancel_tx: tx }, CancelSignal { cancel_rx: rx })
    }

    /// Cancel every holder of the signal; calling again is a no-op
    pub fn cancel(&self) {
        self.cancel_tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_tx.borrow()
    }

    /// Another signal observing this handle
    pub fn signal(&self) -> CancelSignal {
        CancelSignal {
            cancel_rx: self.cancel_tx.subscribe(),
        }
    }
}

/// Read side of a cancellation handle, shared by every traversal branch
#[derive(Debug, Clone)]
pub struct CancelSignal {
    cancel_rx: watch::Receiver<bool>,
}

impl CancelSignal {
    /// A signal that is never cancelled
    pub fn never() -> Self {
        let (_, cancel_rx) = watch::channel(false);
        Self { cancel_rx }
    }

    pub fn is_cancelled(&self) -> bool {
        *self.cancel_rx.borrow()
    }
}

impl Default for CancelSignal {
    fn default() -> Self {
        Self::never()
    }
}
