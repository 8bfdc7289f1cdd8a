//! Cooperative cancellation shared between the driver, the input thread and
//! the game loop.

use std::sync::mpsc::{channel, Receiver, RecvTimeoutError, Sender};
use std::time::Duration;

/// Creates a linked canceller and signal.
pub fn cancellation() -> (Canceller, CancelSignal) {
    let (tx, rx) = channel();
    (Canceller { tx }, CancelSignal { rx, fired: false })
}

/// Fires the signal on `cancel()`, or once every clone has been dropped.
#[derive(Clone, Debug)]
pub struct Canceller {
    tx: Sender<()>,
}

impl Canceller {
    pub fn cancel(&self) {
        // The signal may already be gone if the loop has finished.
        let _ = self.tx.send(());
    }
}

#[derive(Debug)]
pub struct CancelSignal {
    rx: Receiver<()>,
    fired: bool,
}

impl CancelSignal {
    /// Blocks for at most `timeout`; returns `true` if cancellation fired.
    pub fn wait_timeout(&mut self, timeout: Duration) -> bool {
        if !self.fired {
            self.fired = match self.rx.recv_timeout(timeout) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => true,
                Err(RecvTimeoutError::Timeout) => false,
            };
        }
        self.fired
    }
}
