//! Real-time pulse playback on a background thread.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use super::pulse::{CancelToken, Pulse, PulseEvent};
use super::words::WordInfo;

/// Receives pulse events as they are due.
pub type PulseSink = Box<dyn FnMut(&PulseEvent) + Send>;

/// Sentinel stored in the position before the first word is shown.
const NO_WORD: usize = usize::MAX;

/// A running pulse session.
///
/// The worker sleeps on a stop channel between words, so [`stop`](Self::stop)
/// takes effect within one word boundary. Dropping the player stops it too.
pub struct PulsePlayer {
    stop_tx: Option<Sender<()>>,
    cancel: CancelToken,
    position: Arc<AtomicUsize>,
    handle: Option<JoinHandle<()>>,
}

impl PulsePlayer {
    pub fn start(words: Arc<[WordInfo]>, start: usize, wpm: u32, mut sink: PulseSink) -> Self {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let cancel = CancelToken::new();
        let position = Arc::new(AtomicUsize::new(NO_WORD));

        let pulse = Pulse::new(words, start, wpm, cancel.clone());
        let shown = Arc::clone(&position);
        let spawned = thread::Builder::new()
            .name("pagewright-pulse".into())
            .spawn(move || {
                for event in pulse {
                    sink(&event);
                    let PulseEvent::Word { word, index } = event else {
                        break;
                    };
                    shown.store(index, Ordering::Release);
                    match stop_rx.recv_timeout(word.delay()) {
                        Err(RecvTimeoutError::Timeout) => {}
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
            });

        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!("Could not start pulse thread: {err}");
                None
            }
        };
        debug!(start, wpm, "Started pulse");

        Self {
            stop_tx: Some(stop_tx),
            cancel,
            position,
            handle,
        }
    }

    /// Global index of the last word shown, if any.
    pub fn current_word(&self) -> Option<usize> {
        match self.position.load(Ordering::Acquire) {
            NO_WORD => None,
            index => Some(index),
        }
    }

    /// Whether the worker is still emitting.
    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Block until the stream finishes on its own.
    pub fn wait(mut self) -> Option<usize> {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.current_word()
    }

    /// Cancel playback and wait for the worker to exit.
    ///
    /// Returns the last word shown.
    pub fn stop(mut self) -> Option<usize> {
        self.shutdown();
        self.current_word()
    }

    fn shutdown(&mut self) {
        self.cancel.cancel();
        if let Some(tx) = self.stop_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                warn!("Pulse thread panicked");
            }
        }
    }
}

impl Drop for PulsePlayer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for PulsePlayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PulsePlayer")
            .field("current_word", &self.current_word())
            .field("running", &self.is_running())
            .finish()
    }
}
