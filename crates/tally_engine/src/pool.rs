use std::panic::AssertUnwindSafe;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

use futures_util::FutureExt;
use tally_logging::{tally_error, tally_trace};
use tokio::sync::{mpsc, Mutex};
use tokio_util::task::TaskTracker;

use crate::worker::execute_admitted;
use crate::{Admitted, Aggregator, Worker};

/// How admitted units are executed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PoolStrategy {
    /// One task per unit, spawned after its gate slot is acquired.
    #[default]
    GatedSpawn,
    /// Up to `k` long-lived tasks pulling from a shared queue, started lazily.
    Fixed,
}

#[async_trait::async_trait]
pub trait WorkerPool: Send {
    /// Hands an admitted unit to an executor.
    ///
    /// Gives the unit back if the pool no longer accepts work.
    async fn execute(&mut self, admitted: Admitted) -> Result<(), Admitted>;

    /// Stops accepting work and waits until every executor has finished.
    async fn drain(&mut self);

    fn executors_spawned(&self) -> usize;
}

pub struct GatedSpawnPool {
    worker: Arc<Worker>,
    aggregator: Arc<dyn Aggregator>,
    tracker: TaskTracker,
    spawned: usize,
}

impl GatedSpawnPool {
    pub fn new(worker: Arc<Worker>, aggregator: Arc<dyn Aggregator>) -> Self {
        Self {
            worker,
            aggregator,
            tracker: TaskTracker::new(),
            spawned: 0,
        }
    }
}

#[async_trait::async_trait]
impl WorkerPool for GatedSpawnPool {
    async fn execute(&mut self, admitted: Admitted) -> Result<(), Admitted> {
        if self.tracker.is_closed() {
            return Err(admitted);
        }
        self.spawned += 1;
        tally_trace!("spawning executor for seq={}", admitted.unit.seq());
        let worker = self.worker.clone();
        let aggregator = self.aggregator.clone();
        self.tracker.spawn(async move {
            execute_admitted(&worker, &aggregator, admitted).await;
        });
        Ok(())
    }

    async fn drain(&mut self) {
        self.tracker.close();
        self.tracker.wait().await;
    }

    fn executors_spawned(&self) -> usize {
        self.spawned
    }
}

pub struct FixedPool {
    size: usize,
    worker: Arc<Worker>,
    aggregator: Arc<dyn Aggregator>,
    queue_tx: Option<mpsc::Sender<Admitted>>,
    queue_rx: Arc<Mutex<mpsc::Receiver<Admitted>>>,
    idle: Arc<AtomicUsize>,
    tracker: TaskTracker,
    spawned: usize,
}

impl FixedPool {
    pub fn new(size: usize, worker: Arc<Worker>, aggregator: Arc<dyn Aggregator>) -> Self {
        let size = size.max(1);
        let (queue_tx, queue_rx) = mpsc::channel(size);
        Self {
            size,
            worker,
            aggregator,
            queue_tx: Some(queue_tx),
            queue_rx: Arc::new(Mutex::new(queue_rx)),
            idle: Arc::new(AtomicUsize::new(0)),
            tracker: TaskTracker::new(),
            spawned: 0,
        }
    }

    fn spawn_worker(&mut self) {
        self.spawned += 1;
        let id = self.spawned;
        tally_trace!("starting pool worker {}", id);
        let worker = self.worker.clone();
        let aggregator = self.aggregator.clone();
        let queue = self.queue_rx.clone();
        let idle = self.idle.clone();
        idle.fetch_add(1, Ordering::AcqRel);
        self.tracker.spawn(async move {
            loop {
                let next = queue.lock().await.recv().await;
                let Some(admitted) = next else {
                    break;
                };
                idle.fetch_sub(1, Ordering::AcqRel);
                // A panicking unit must not take the worker down with it.
                let run = AssertUnwindSafe(execute_admitted(&worker, &aggregator, admitted));
                if run.catch_unwind().await.is_err() {
                    tally_error!("pool worker {} recovered from a panicking unit", id);
                }
                idle.fetch_add(1, Ordering::AcqRel);
            }
            idle.fetch_sub(1, Ordering::AcqRel);
            tally_trace!("pool worker {} stopped", id);
        });
    }
}

#[async_trait::async_trait]
impl WorkerPool for FixedPool {
    async fn execute(&mut self, admitted: Admitted) -> Result<(), Admitted> {
        if self.queue_tx.is_none() {
            return Err(admitted);
        }
        if self.spawned < self.size && self.idle.load(Ordering::Acquire) == 0 {
            self.spawn_worker();
        }
        match &self.queue_tx {
            Some(tx) => tx.send(admitted).await.map_err(|err| err.0),
            None => Err(admitted),
        }
    }

    async fn drain(&mut self) {
        // Dropping the sender ends every worker's receive loop once the queue is empty.
        self.queue_tx.take();
        self.tracker.close();
        self.tracker.wait().await;
    }

    fn executors_spawned(&self) -> usize {
        self.spawned
    }
}
