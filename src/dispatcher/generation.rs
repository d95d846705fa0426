//! Pool generations.
//!
//! A generation is one queue plus the workers consuming it, all built from
//! a single settings snapshot. Configuration changes never mutate a running
//! generation; the dispatcher stops the current one and spawns a fresh one.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::domain::{ConnectionSettings, WorkerId};
use crate::error::DeliveryError;
use crate::port::Transport;

use super::unit::SendUnit;
use super::worker::{ConnectionWorker, SharedQueue};

/// How long a stopping generation waits for workers finishing an in-flight
/// send before aborting them.
pub(crate) const STOP_GRACE_PERIOD: Duration = Duration::from_secs(5);

struct WorkerHandle {
    id: WorkerId,
    stop: CancellationToken,
    task: JoinHandle<()>,
}

pub(crate) struct PoolGeneration {
    number: u64,
    settings: ConnectionSettings,
    sender: mpsc::Sender<SendUnit>,
    queue: SharedQueue,
    workers: Vec<WorkerHandle>,
}

impl PoolGeneration {
    /// Build the queue and spawn `worker_count` workers on it.
    pub(crate) fn spawn(
        number: u64,
        settings: ConnectionSettings,
        transport: Arc<dyn Transport>,
        pool: &PoolConfig,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(pool.queue_capacity.max(1));
        let queue: SharedQueue = Arc::new(Mutex::new(receiver));

        let workers = (1..=pool.worker_count)
            .map(|ordinal| {
                let id = WorkerId::new(ordinal);
                let stop = CancellationToken::new();
                let worker = ConnectionWorker::new(
                    id,
                    settings.clone(),
                    Arc::clone(&transport),
                    Arc::clone(&queue),
                    stop.clone(),
                );
                WorkerHandle {
                    id,
                    stop,
                    task: tokio::spawn(worker.run()),
                }
            })
            .collect::<Vec<_>>();

        info!(
            generation = number,
            workers = workers.len(),
            queue_capacity = pool.queue_capacity,
            address = %settings.address(),
            encryption = %settings.encryption,
            transport = transport.name(),
            "Sender pool started"
        );

        Self {
            number,
            settings,
            sender,
            queue,
            workers,
        }
    }

    pub(crate) fn number(&self) -> u64 {
        self.number
    }

    pub(crate) fn settings(&self) -> &ConnectionSettings {
        &self.settings
    }

    /// A handle for enqueueing units.
    pub(crate) fn sender(&self) -> mpsc::Sender<SendUnit> {
        self.sender.clone()
    }

    /// Units waiting in the queue.
    pub(crate) fn queued(&self) -> usize {
        self.sender.max_capacity() - self.sender.capacity()
    }

    /// Workers whose task is still running.
    pub(crate) fn live_workers(&self) -> usize {
        self.workers.iter().filter(|w| !w.task.is_finished()).count()
    }

    /// Stop every worker, then fail whatever is still queued.
    ///
    /// Workers in the middle of a send finish it and report before exiting;
    /// those still busy after [`STOP_GRACE_PERIOD`] are aborted, which their
    /// callers observe as [`DeliveryError::Dropped`]. Returns the number of
    /// queued units failed with [`DeliveryError::Restarted`].
    pub(crate) async fn stop(self) -> usize {
        for worker in &self.workers {
            worker.stop.cancel();
        }

        // Idle workers release the queue lock as soon as they see the stop.
        let drained = {
            let mut receiver = self.queue.lock().await;
            receiver.close();
            let mut drained = 0;
            while let Ok(unit) = receiver.try_recv() {
                debug!(generation = self.number, message = %unit.id(), "Failing queued unit");
                unit.report(Err(DeliveryError::Restarted));
                drained += 1;
            }
            drained
        };

        let ids: Vec<WorkerId> = self.workers.iter().map(|w| w.id).collect();
        let tasks: Vec<JoinHandle<()>> = self.workers.into_iter().map(|w| w.task).collect();
        let aborts: Vec<_> = tasks.iter().map(JoinHandle::abort_handle).collect();

        if tokio::time::timeout(STOP_GRACE_PERIOD, join_all(tasks))
            .await
            .is_err()
        {
            warn!(
                generation = self.number,
                workers = ?ids,
                "Workers still busy after grace period, aborting"
            );
            for abort in aborts {
                abort.abort();
            }
        }

        info!(generation = self.number, drained, "Sender pool stopped");
        drained
    }
}
