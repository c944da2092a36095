//! Background autosave pump for a live session.

use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use stint_core::SharedTimer;
use stint_store::SessionRecorder;

/// Periodically flushes the live timer's elapsed seconds through the
/// session recorder. Spawned only when the user opts in; exits on its own
/// within one interval of the timer reaching a terminal phase, or
/// immediately on `shutdown`.
#[derive(Debug)]
pub struct AutosavePump {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl AutosavePump {
    pub fn spawn(timer: SharedTimer, recorder: Arc<SessionRecorder>, interval: Duration) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel();
        let handle = thread::spawn(move || loop {
            match stop_rx.recv_timeout(interval) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
            if timer.phase().is_terminal() {
                break;
            }
            // a failed flush is reported and the session keeps running;
            // the terminal flush recomputes the aggregate anyway
            if let Err(err) = recorder.flush(timer.elapsed_seconds()) {
                eprintln!("[autosave] flush failed: {err}");
            }
        });
        Self { stop_tx, handle }
    }

    /// Signals the pump and joins the thread. Any in-flight flush finishes
    /// before this returns.
    pub fn shutdown(self) {
        let _ = self.stop_tx.send(());
        let _ = self.handle.join();
    }

    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
