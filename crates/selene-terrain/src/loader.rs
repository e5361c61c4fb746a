//! Asynchronous tile fetching on a pool of worker threads.
//!
//! Requests travel over a bounded channel to named workers. Completions come
//! back on a second channel that the owning thread drains once per frame, so
//! tile state is only ever touched by the store's thread.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, unbounded};

use crate::source::{FetchError, TileRequest, TileSource};
use crate::tile::TileCoord;

/// A finished fetch, successful or not.
#[derive(Debug)]
pub struct FetchOutcome {
    pub coord: TileCoord,
    pub result: Result<Vec<u8>, FetchError>,
    /// Fetch time in microseconds.
    pub fetch_time_us: u64,
}

enum Dispatch {
    Pool(Sender<TileRequest>),
    Inline {
        source: Arc<dyn TileSource>,
        results: Sender<FetchOutcome>,
    },
}

/// Runs tile fetches off the owning thread.
pub struct TileLoader {
    dispatch: Dispatch,
    result_receiver: Receiver<FetchOutcome>,
    /// Submitted requests whose completion has not been drained yet.
    in_flight: Arc<AtomicU64>,
    max_in_flight: u64,
}

impl TileLoader {
    /// Create a loader with `thread_count` workers and at most `max_in_flight`
    /// undrained requests. Falls back to inline fetching if no worker could be
    /// spawned.
    pub fn new(source: Arc<dyn TileSource>, thread_count: usize, max_in_flight: usize) -> Self {
        let max_in_flight = max_in_flight.max(1);
        let (task_sender, task_receiver) = bounded::<TileRequest>(max_in_flight);
        let (result_sender, result_receiver) = bounded::<FetchOutcome>(max_in_flight);

        let mut spawned = 0;
        for index in 0..thread_count {
            let receiver = task_receiver.clone();
            let sender = result_sender.clone();
            let source = Arc::clone(&source);

            let handle = std::thread::Builder::new()
                .name(format!("tile-fetch-{index}"))
                .spawn(move || {
                    while let Ok(request) = receiver.recv() {
                        let outcome = fetch(source.as_ref(), request);
                        if sender.send(outcome).is_err() {
                            break;
                        }
                    }
                });

            match handle {
                Ok(_) => spawned += 1,
                Err(err) => tracing::warn!(%err, "failed to spawn tile fetch worker"),
            }
        }

        if spawned == 0 {
            tracing::warn!("no tile fetch workers running, fetching inline");
            return Self::inline_with_capacity(source, max_in_flight);
        }

        tracing::debug!(workers = spawned, max_in_flight, "tile loader started");
        Self {
            dispatch: Dispatch::Pool(task_sender),
            result_receiver,
            in_flight: Arc::new(AtomicU64::new(0)),
            max_in_flight: max_in_flight as u64,
        }
    }

    /// Create a loader sized from the number of CPU cores.
    pub fn with_defaults(source: Arc<dyn TileSource>) -> Self {
        Self::new(source, default_thread_count(), 64)
    }

    /// Fetch on the submitting thread. The completion is still delivered by
    /// [`drain_results`](Self::drain_results), so tiles stay `Loading` until
    /// the next poll.
    pub fn inline(source: Arc<dyn TileSource>) -> Self {
        Self::inline_with_capacity(source, usize::MAX)
    }

    fn inline_with_capacity(source: Arc<dyn TileSource>, max_in_flight: usize) -> Self {
        let (results, result_receiver) = unbounded();
        Self {
            dispatch: Dispatch::Inline { source, results },
            result_receiver,
            in_flight: Arc::new(AtomicU64::new(0)),
            max_in_flight: max_in_flight as u64,
        }
    }

    /// Queue a fetch. Returns `Err(request)` when the loader is saturated.
    pub fn submit(&self, request: TileRequest) -> Result<(), TileRequest> {
        // Count before dispatch so a fast worker cannot be drained first.
        if self.in_flight.fetch_add(1, Ordering::Relaxed) >= self.max_in_flight {
            self.in_flight.fetch_sub(1, Ordering::Relaxed);
            return Err(request);
        }

        match &self.dispatch {
            Dispatch::Pool(sender) => sender.try_send(request).map_err(|e| {
                self.in_flight.fetch_sub(1, Ordering::Relaxed);
                e.into_inner()
            }),
            Dispatch::Inline { source, results } => {
                let outcome = fetch(source.as_ref(), request);
                // The receiver lives in `self`, so this cannot fail.
                let _ = results.send(outcome);
                Ok(())
            }
        }
    }

    /// Collect every completion available right now.
    pub fn drain_results(&self) -> Vec<FetchOutcome> {
        let results: Vec<_> = self.result_receiver.try_iter().collect();
        self.in_flight
            .fetch_sub(results.len() as u64, Ordering::Relaxed);
        results
    }

    /// Block until at least one completion arrives or `timeout` elapses, then
    /// drain everything available.
    pub fn wait_for_results(&self, timeout: Duration) -> Vec<FetchOutcome> {
        let first = match self.result_receiver.recv_timeout(timeout) {
            Ok(outcome) => outcome,
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return Vec::new(),
        };
        self.in_flight.fetch_sub(1, Ordering::Relaxed);

        let mut results = vec![first];
        results.extend(self.drain_results());
        results
    }

    /// Requests submitted whose completion has not been drained.
    pub fn in_flight_count(&self) -> u64 {
        self.in_flight.load(Ordering::Relaxed)
    }

    /// `true` for loaders created with [`inline`](Self::inline).
    pub fn is_inline(&self) -> bool {
        matches!(self.dispatch, Dispatch::Inline { .. })
    }
}

impl std::fmt::Debug for TileLoader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileLoader")
            .field("inline", &self.is_inline())
            .field("in_flight", &self.in_flight_count())
            .finish()
    }
}

/// Worker count leaving two cores for the host's main and render threads.
pub(crate) fn default_thread_count() -> usize {
    let cpus = num_cpus::get().max(2);
    (cpus - 2).max(1)
}

fn fetch(source: &dyn TileSource, request: TileRequest) -> FetchOutcome {
    let start = Instant::now();
    let result = source.fetch(&request);
    FetchOutcome {
        coord: request.coord,
        result,
        fetch_time_us: start.elapsed().as_micros() as u64,
    }
}
