//! The ingestion queue and its single background worker.
//!
//! Payloads go into an unbounded FIFO. Exactly one task drains it, one
//! payload at a time, so graph writes happen in enqueue order. A failed
//! payload is logged, counted and dropped; the worker moves on.

use std::future::Future;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use factgraph_core::{AssertionPayload, GraphStore, LogStore};

use crate::error::{IngestError, Result};
use crate::extract::TripletExtractor;
use crate::pipeline::Pipeline;

/// What the worker is doing right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkerState {
    Idle,
    Processing,
}

/// Counters returned by [`WorkerHandle::shutdown`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    /// Payloads applied successfully.
    pub processed: u64,
    /// Payloads abandoned after a pipeline error.
    pub failed: u64,
    /// Payloads still queued when a non-draining shutdown stopped the worker.
    pub discarded: u64,
}

/// Producer side of the queue. Cheap to clone; usable from any thread.
///
/// Every clone shares one sender. Closing drops it, so the worker sees the
/// end of the queue once the payloads sent before the close are consumed.
#[derive(Debug, Clone)]
pub struct Enqueuer {
    tx: Arc<RwLock<Option<mpsc::UnboundedSender<AssertionPayload>>>>,
}

impl Enqueuer {
    /// Queue a payload without blocking. Fails only after shutdown.
    pub fn enqueue(&self, payload: AssertionPayload) -> Result<()> {
        let id = payload.id;
        let guard = self.tx.read().map_err(|_| IngestError::QueueClosed)?;
        let tx = guard.as_ref().ok_or(IngestError::QueueClosed)?;
        tx.send(payload).map_err(|_| IngestError::QueueClosed)?;
        tracing::debug!(payload_id = %id, "Payload enqueued");
        Ok(())
    }

    fn close(&self) {
        let mut guard = match self.tx.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.take();
    }
}

/// Owner of the running worker.
pub struct WorkerHandle {
    enqueuer: Enqueuer,
    state: watch::Receiver<WorkerState>,
    abort: CancellationToken,
    task: JoinHandle<WorkerStats>,
}

impl WorkerHandle {
    pub fn enqueue(&self, payload: AssertionPayload) -> Result<()> {
        self.enqueuer.enqueue(payload)
    }

    pub fn enqueuer(&self) -> Enqueuer {
        self.enqueuer.clone()
    }

    pub fn state(&self) -> WorkerState {
        *self.state.borrow()
    }

    /// Watch state transitions.
    pub fn subscribe(&self) -> watch::Receiver<WorkerState> {
        self.state.clone()
    }

    /// Stop the worker. With `drain`, everything already queued is processed
    /// first; without it the worker stops after the in-flight payload and
    /// discards the rest. The queue refuses new payloads from the moment
    /// this is called.
    pub fn shutdown(self, drain: bool) -> impl Future<Output = WorkerStats> {
        self.enqueuer.close();
        if !drain {
            self.abort.cancel();
        }
        let task = self.task;
        async move {
            match task.await {
                Ok(stats) => stats,
                Err(e) => {
                    tracing::error!(error = %e, "Ingestion worker task failed");
                    WorkerStats::default()
                }
            }
        }
    }
}

/// Spawns the ingestion worker.
pub struct IngestWorker;

impl IngestWorker {
    /// Spawn the worker on the current tokio runtime. It owns `pipeline`
    /// until shutdown.
    pub fn start<G, L, E>(pipeline: Pipeline<G, L, E>) -> WorkerHandle
    where
        G: GraphStore + 'static,
        L: LogStore + 'static,
        E: TripletExtractor + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(WorkerState::Idle);
        let abort = CancellationToken::new();

        let task = tokio::spawn(run(pipeline, rx, state_tx, abort.clone()));

        tracing::info!("Ingestion worker started");
        WorkerHandle {
            enqueuer: Enqueuer {
                tx: Arc::new(RwLock::new(Some(tx))),
            },
            state: state_rx,
            abort,
            task,
        }
    }
}

async fn run<G, L, E>(
    pipeline: Pipeline<G, L, E>,
    mut rx: mpsc::UnboundedReceiver<AssertionPayload>,
    state: watch::Sender<WorkerState>,
    abort: CancellationToken,
) -> WorkerStats
where
    G: GraphStore,
    L: LogStore,
    E: TripletExtractor,
{
    let mut stats = WorkerStats::default();

    loop {
        let payload = tokio::select! {
            biased;
            _ = abort.cancelled() => break,
            msg = rx.recv() => match msg {
                Some(payload) => payload,
                None => break,
            },
        };

        state.send_replace(WorkerState::Processing);
        match pipeline.process(&payload).await {
            Ok(_) => stats.processed += 1,
            Err(e) => {
                tracing::error!(payload_id = %payload.id, error = %e, "Payload failed");
                stats.failed += 1;
            }
        }
        state.send_replace(WorkerState::Idle);
    }

    rx.close();
    while rx.try_recv().is_ok() {
        stats.discarded += 1;
    }

    tracing::info!(
        processed = stats.processed,
        failed = stats.failed,
        discarded = stats.discarded,
        "Ingestion worker stopped"
    );
    stats
}
