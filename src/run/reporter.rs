use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};
use tracing::error;

use crate::error::EntityError;

/// Background sink for per-entity failures of a run.
///
/// Errors are sent over a channel and logged by a dedicated thread, so
/// dispatch never waits on log output. [`ErrorReporter::finish`] closes the
/// channel and joins the thread; call it before committing so every failure
/// of the run has been logged.
pub struct ErrorReporter {
    tx: Sender<EntityError>,
    handle: JoinHandle<Vec<EntityError>>,
}

impl ErrorReporter {
    /// Start the listener thread.
    pub fn spawn() -> Self {
        let (tx, rx) = mpsc::channel::<EntityError>();
        let handle = thread::spawn(move || {
            let mut failures = Vec::new();
            for e in rx {
                error!(id = e.id(), error = %e, "snapshot failed");
                failures.push(e);
            }
            failures
        });
        Self { tx, handle }
    }

    /// Hand a failure to the listener. Logs inline if the listener is gone.
    pub fn report(&self, e: EntityError) {
        if let Err(mpsc::SendError(e)) = self.tx.send(e) {
            // listener is gone; don't lose the message
            error!(id = e.id(), error = %e, "snapshot failed");
        }
    }

    /// Close the channel, wait for the listener to drain it, and return
    /// everything that was reported.
    pub fn finish(self) -> Vec<EntityError> {
        drop(self.tx);
        self.handle.join().unwrap_or_default()
    }
}
