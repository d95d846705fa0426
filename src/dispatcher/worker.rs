//! Connection worker: one pool slot owning one reusable connection.
//!
//! Each worker is a tokio task competing with its siblings for units on the
//! generation's shared queue. The connection is dialed lazily when a unit
//! arrives while closed, reused while traffic keeps coming, and closed after
//! [`IDLE_TIMEOUT`] without any.
//!
//! ```text
//!            unit / dial ok
//!   Closed ─────────────────▶ Open ──┐ unit / send ok
//!     ▲  ▲                      │ ▲──┘
//!     │  └──── send failed ─────┤
//!     └── idle close ok, ───────┘
//!         or breaker tripped
//! ```

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::domain::{ConnectionSettings, WorkerId};
use crate::error::DeliveryError;
use crate::port::{Connection, Transport};

use super::breaker::{CloseBreaker, CloseVerdict};
use super::unit::SendUnit;

/// An open connection unused for this long is closed.
pub const IDLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Receiving half of a generation's queue, shared by its workers.
pub(crate) type SharedQueue = Arc<Mutex<mpsc::Receiver<SendUnit>>>;

/// Connection state of a worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
    Closed,
    Open,
}

pub(crate) struct ConnectionWorker {
    id: WorkerId,
    settings: ConnectionSettings,
    transport: Arc<dyn Transport>,
    queue: SharedQueue,
    stop: CancellationToken,
    connection: Option<Box<dyn Connection>>,
    breaker: CloseBreaker,
}

impl ConnectionWorker {
    pub(crate) fn new(
        id: WorkerId,
        settings: ConnectionSettings,
        transport: Arc<dyn Transport>,
        queue: SharedQueue,
        stop: CancellationToken,
    ) -> Self {
        Self {
            id,
            settings,
            transport,
            queue,
            stop,
            connection: None,
            breaker: CloseBreaker::default(),
        }
    }

    pub(crate) fn state(&self) -> WorkerState {
        if self.connection.is_some() {
            WorkerState::Open
        } else {
            WorkerState::Closed
        }
    }

    /// Event loop. Returns when stopped or when the queue is closed.
    ///
    /// A stop does not close the live connection; the handle is dropped.
    pub(crate) async fn run(mut self) {
        debug!(worker = %self.id, "Worker started");

        loop {
            let open = self.state() == WorkerState::Open;
            let idle = async move {
                if open {
                    tokio::time::sleep(IDLE_TIMEOUT).await;
                } else {
                    std::future::pending::<()>().await;
                }
            };

            tokio::select! {
                biased;

                _ = self.stop.cancelled() => {
                    debug!(worker = %self.id, "Stop signal received");
                    break;
                }
                unit = next_unit(&self.queue) => match unit {
                    Some(unit) => self.handle(unit).await,
                    None => {
                        debug!(worker = %self.id, "Queue closed");
                        break;
                    }
                },
                _ = idle => self.close_idle().await,
            }
        }

        debug!(worker = %self.id, state = ?self.state(), "Worker terminated");
    }

    /// Deliver one unit, dialing first when closed. Never retries.
    async fn handle(&mut self, unit: SendUnit) {
        if unit.is_cancelled() {
            debug!(worker = %self.id, message = %unit.id(), "Caller gave up, skipping");
            unit.report(Err(DeliveryError::Cancelled));
            return;
        }

        if self.connection.is_none() {
            match self.transport.dial(&self.settings).await {
                Ok(conn) => {
                    debug!(worker = %self.id, address = %self.settings.address(), "Connected");
                    self.breaker.reset();
                    self.connection = Some(conn);
                }
                Err(e) => {
                    error!(
                        worker = %self.id,
                        error = %e,
                        "Sender connect to mail server failed"
                    );
                    unit.report(Err(DeliveryError::Dial(e.to_string())));
                    return;
                }
            }
        }

        let Some(conn) = self.connection.as_mut() else {
            unit.report(Err(DeliveryError::Dropped));
            return;
        };

        match conn.send(&unit.message).await {
            Ok(()) => {
                debug!(worker = %self.id, message = %unit.id(), "Sent successfully");
                unit.report(Ok(()));
            }
            Err(e) => {
                error!(
                    worker = %self.id,
                    message = %unit.id(),
                    error = %e,
                    "Send failed, discarding connection"
                );
                self.connection = None;
                unit.report(Err(DeliveryError::Send(e.to_string())));
            }
        }
    }

    /// Idle window elapsed while open.
    async fn close_idle(&mut self) {
        let Some(conn) = self.connection.as_mut() else {
            return;
        };

        match conn.close().await {
            Ok(()) => {
                self.connection = None;
                self.breaker.reset();
                info!(
                    worker = %self.id,
                    idle_secs = IDLE_TIMEOUT.as_secs(),
                    "Idle connection closed temporarily"
                );
            }
            Err(e) => {
                error!(worker = %self.id, error = %e, "Idle close failed");
                if self.breaker.record_failure() == CloseVerdict::ForceClosed {
                    warn!(
                        worker = %self.id,
                        "Close failed repeatedly, forgetting connection"
                    );
                    self.connection = None;
                }
            }
        }
    }
}

/// Take the next unit from the shared queue.
///
/// The lock is held only while this worker is the one waiting on `recv`;
/// dropping the future (stop, idle) releases it for a sibling.
async fn next_unit(queue: &SharedQueue) -> Option<SendUnit> {
    queue.lock().await.recv().await
}
