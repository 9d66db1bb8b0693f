//! Debounced background re-pagination.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, trace, warn};

use crate::layout::{LayoutParams, Page, Paginator};
use crate::model::Document;

struct LayoutRequest {
    generation: u64,
    params: LayoutParams,
}

/// Pages computed for one layout request.
#[derive(Debug)]
pub struct LayoutResult {
    pub generation: u64,
    pub params: LayoutParams,
    pub pages: Vec<Page>,
}

/// Owns the worker thread that recomputes pages off the reading thread.
///
/// Requests arriving within the debounce window of each other collapse into
/// the last one. Every request bumps a generation counter; a run whose
/// generation is no longer current is abandoned, and stale results are
/// discarded on receipt.
pub struct Repaginator {
    requests: Option<Sender<LayoutRequest>>,
    results: Receiver<LayoutResult>,
    latest: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl Repaginator {
    pub fn spawn(document: Arc<Document>, paginator: Arc<Paginator>, debounce: Duration) -> Self {
        let (request_tx, request_rx) = mpsc::channel::<LayoutRequest>();
        let (result_tx, result_rx) = mpsc::channel::<LayoutResult>();
        let latest = Arc::new(AtomicU64::new(0));

        let worker_latest = Arc::clone(&latest);
        let spawned = thread::Builder::new()
            .name("pagewright-repaginate".into())
            .spawn(move || {
                run_worker(
                    &document,
                    &paginator,
                    debounce,
                    &request_rx,
                    &result_tx,
                    &worker_latest,
                )
            });

        let handle = match spawned {
            Ok(handle) => Some(handle),
            Err(err) => {
                warn!("Could not start repagination thread: {err}");
                None
            }
        };

        Self {
            requests: Some(request_tx),
            results: result_rx,
            latest,
            handle,
        }
    }

    /// Queue a layout and return its generation.
    pub fn submit(&self, params: LayoutParams) -> u64 {
        let generation = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        if let Some(tx) = &self.requests {
            if tx.send(LayoutRequest { generation, params }).is_err() {
                warn!(generation, "Repagination worker is gone");
            }
        }
        generation
    }

    /// Mark every queued or running request stale.
    pub fn invalidate(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Generation of the most recent request.
    pub fn latest_generation(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// Newest finished result, if it matches the latest request.
    pub fn try_latest(&self) -> Option<LayoutResult> {
        let mut newest = None;
        loop {
            match self.results.try_recv() {
                Ok(result) => newest = Some(result),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        newest.filter(|r| r.generation == self.latest_generation())
    }

    /// Block up to `timeout` for the result of the latest request.
    pub fn wait_latest(&self, timeout: Duration) -> Option<LayoutResult> {
        let deadline = Instant::now() + timeout;
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            match self.results.recv_timeout(remaining) {
                Ok(result) if result.generation == self.latest_generation() => {
                    return Some(result);
                }
                Ok(stale) => trace!(generation = stale.generation, "Dropping stale layout"),
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }
}

impl Drop for Repaginator {
    fn drop(&mut self) {
        // Invalidate any run in flight, then close the queue.
        self.invalidate();
        self.requests.take();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl std::fmt::Debug for Repaginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repaginator")
            .field("latest", &self.latest_generation())
            .finish_non_exhaustive()
    }
}

fn run_worker(
    document: &Document,
    paginator: &Paginator,
    debounce: Duration,
    requests: &Receiver<LayoutRequest>,
    results: &Sender<LayoutResult>,
    latest: &AtomicU64,
) {
    while let Ok(mut request) = requests.recv() {
        loop {
            match requests.recv_timeout(debounce) {
                Ok(newer) => request = newer,
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => return,
            }
        }

        let generation = request.generation;
        if latest.load(Ordering::Acquire) != generation {
            continue;
        }

        let is_stale = || latest.load(Ordering::Acquire) != generation;
        let Some(pages) = paginator.paginate_document_until(document, &request.params, is_stale)
        else {
            debug!(generation, "Abandoned superseded layout");
            continue;
        };

        debug!(generation, pages = pages.len(), "Layout ready");
        let result = LayoutResult {
            generation,
            params: request.params,
            pages,
        };
        if results.send(result).is_err() {
            return;
        }
    }
}
