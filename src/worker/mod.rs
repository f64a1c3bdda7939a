//! Background search worker.
//!
//! The engine lives on its own thread so the caller stays responsive. Jobs go
//! in over one channel and [`EngineEvent`]s come back over another. A search in
//! flight is stopped by raising the shared cancel flag, which the engine polls.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, Sender};
use thiserror::Error;
use tracing::{debug, info};

use crate::egdb::EgdbConfig;
use crate::game::board::{Board, Color};
use crate::game::evaluation::Evaluator;
use crate::game::rules::{Move, Rules};
use crate::game::search::{Engine, SearchProgress, SearchResult};

/// Represents a unit of work for the worker thread.
#[derive(Debug)]
pub enum Job {
    /// Drop the loaded databases and load the ones in `path`.
    InitializeEgdb { path: PathBuf, config: EgdbConfig },
    Search { board: Board, side: Color, budget: Duration },
    Shutdown,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SearchReport {
    pub best_move: Option<Move>,
    pub aborted: bool,
    pub score: i32,
    pub depth: u8,
    pub status: String,
    pub elapsed: Duration,
}

impl From<SearchResult> for SearchReport {
    fn from(result: SearchResult) -> Self {
        let status = match (&result.best_move, result.aborted) {
            (None, _) => "No legal moves".to_string(),
            (Some(m), true) => format!("Search aborted, playing {m} from depth {}", result.depth),
            (Some(m), false) => format!("Best move {m} at depth {}", result.depth),
        };
        Self {
            best_move: result.best_move,
            aborted: result.aborted,
            score: result.score,
            depth: result.depth,
            status,
            elapsed: result.elapsed,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum EngineEvent {
    EgdbReady { max_pieces: usize },
    Progress(SearchProgress),
    Finished(SearchReport),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WorkerError {
    #[error("a search is already running")]
    Busy,
    #[error("the search worker has stopped")]
    Disconnected,
}

pub struct SearchWorker {
    jobs: Sender<Job>,
    events: Receiver<EngineEvent>,
    stop: Arc<AtomicBool>,
    busy: Arc<AtomicBool>,
    handle: Option<thread::JoinHandle<()>>,
}

impl SearchWorker {
    /// Moves `engine` onto a new worker thread.
    pub fn spawn<R, E>(mut engine: Engine<R, E>) -> Self
    where
        R: Rules + 'static,
        E: Evaluator + 'static,
    {
        let (job_tx, job_rx) = crossbeam_channel::unbounded::<Job>();
        let (event_tx, event_rx) = crossbeam_channel::unbounded();
        let stop = engine.stop_handle();
        let busy = Arc::new(AtomicBool::new(false));
        let worker_busy = Arc::clone(&busy);

        let handle = thread::spawn(move || {
            while let Ok(job) = job_rx.recv() {
                match job {
                    Job::InitializeEgdb { path, config } => {
                        let max_pieces = engine.initialize_egdb(&path, &config);
                        let _ = event_tx.send(EngineEvent::EgdbReady { max_pieces });
                    }
                    Job::Search { board, side, budget } => {
                        let result = engine.search_with_progress(&board, side, budget, |progress| {
                            let _ = event_tx.send(EngineEvent::Progress(progress.clone()));
                        });
                        worker_busy.store(false, Ordering::Release);
                        let _ = event_tx.send(EngineEvent::Finished(result.into()));
                    }
                    Job::Shutdown => break,
                }
            }
            debug!("Search worker stopped");
        });

        Self {
            jobs: job_tx,
            events: event_rx,
            stop,
            busy,
            handle: Some(handle),
        }
    }

    /// Queues a tablebase reload; the worker answers with `EgdbReady`.
    pub fn initialize_egdb(&self, path: impl Into<PathBuf>, config: EgdbConfig) -> Result<(), WorkerError> {
        self.jobs
            .send(Job::InitializeEgdb {
                path: path.into(),
                config,
            })
            .map_err(|_| WorkerError::Disconnected)
    }

    /// Starts a search; the result arrives as `Finished`. Only one search may
    /// be in flight.
    pub fn request_search(&self, board: Board, side: Color, budget: Duration) -> Result<(), WorkerError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WorkerError::Busy);
        }
        self.stop.store(false, Ordering::Release);
        info!("Searching {} for {} with {:?}", board, side, budget);
        self.jobs
            .send(Job::Search { board, side, budget })
            .map_err(|_| {
                self.busy.store(false, Ordering::Release);
                WorkerError::Disconnected
            })
    }

    /// Asks the running search to stop. It still reports `Finished`.
    pub fn request_cancel(&self) {
        self.stop.store(true, Ordering::Release);
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn events(&self) -> &Receiver<EngineEvent> {
        &self.events
    }
}

impl Drop for SearchWorker {
    fn drop(&mut self) {
        self.request_cancel();
        let _ = self.jobs.send(Job::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
