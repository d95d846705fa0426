//! Connection-pool dispatcher.
//!
//! The dispatcher accepts messages from callers and hands each one to a
//! pool of connection workers, each owning one reusable
//! transport connection.
//!
//! # Architecture
//!
//! ```text
//!  send() ──▶ bounded queue ──▶ worker 1 ─┐
//!    ▲                     ├──▶ worker 2 ─┼─▶ Transport
//!    │                     └──▶ worker N ─┘
//!    └───────── oneshot result ◀──────────┘
//! ```
//!
//! All workers compete for units on one bounded `mpsc` queue; whichever is
//! free first takes the next unit. A full queue makes `send` wait, which is
//! the only backpressure. Callers wait at most [`SEND_TIMEOUT`] in total.
//!
//! The queue and its workers form a *generation* built from one settings
//! snapshot. [`Dispatcher::update_config`] stops the current generation,
//! failing anything still queued with [`DeliveryError::Restarted`], and
//! spawns a new one from the updated store.

mod breaker;
mod generation;
mod unit;
mod validate;
mod worker;

pub use breaker::CLOSE_FAILURE_THRESHOLD;
pub use validate::{validate_config, Validation, VALIDATION_TIMEOUT};
pub use worker::{WorkerState, IDLE_TIMEOUT};

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, StreamExt};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::config::PoolConfig;
use crate::domain::{keys, ConnectionSettings, FailedRecord, Message, SendParam};
use crate::error::{DeliveryError, Result};
use crate::port::{ConfigStore, Transport};

use generation::PoolGeneration;
use unit::SendUnit;

/// Longest a caller waits in [`Dispatcher::send`], enqueue included.
pub const SEND_TIMEOUT: Duration = Duration::from_secs(60);

/// Snapshot of the dispatcher for status output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolStatus {
    pub generation: u64,
    pub address: String,
    pub workers: usize,
    pub queued: usize,
}

/// Owns the current pool generation and exposes the send API.
pub struct Dispatcher {
    store: Arc<dyn ConfigStore>,
    transport: Arc<dyn Transport>,
    pool: PoolConfig,
    current: RwLock<Option<PoolGeneration>>,
    /// Serializes `update_config` and `shutdown`.
    restart_lock: tokio::sync::Mutex<()>,
    generations: AtomicU64,
}

impl Dispatcher {
    /// Create a dispatcher with no running pool.
    ///
    /// Nothing is sent until [`update_config`](Self::update_config) (or
    /// [`start`](Self::start) with a pre-filled store) succeeds.
    pub fn new(store: Arc<dyn ConfigStore>, transport: Arc<dyn Transport>, pool: PoolConfig) -> Self {
        Self {
            store,
            transport,
            pool,
            current: RwLock::new(None),
            restart_lock: tokio::sync::Mutex::new(()),
            generations: AtomicU64::new(0),
        }
    }

    /// True once a pool generation is running.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.current.read().is_some()
    }

    /// Start (or restart) the pool from whatever the store holds.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a required key is missing or the
    /// port is invalid; the dispatcher is then left not ready.
    pub async fn start(&self) -> Result<()> {
        let _guard = self.restart_lock.lock().await;
        self.restart().await
    }

    /// Replace the stored configuration and restart the pool with it.
    ///
    /// # Errors
    ///
    /// See [`start`](Self::start). The previous pool is stopped even when
    /// the new configuration is rejected.
    pub async fn update_config(&self, configs: HashMap<String, String>) -> Result<()> {
        let _guard = self.restart_lock.lock().await;
        self.store.clean();
        self.store.batch_set(configs);
        self.restart().await
    }

    /// Trial-connect with candidate settings without touching the pool.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the candidate lacks a required key
    /// or has an invalid port.
    pub async fn validate_config(&self, configs: &HashMap<String, String>) -> Result<Validation> {
        validate_config(Arc::clone(&self.transport), configs).await
    }

    /// Stop the current generation, if any.
    pub async fn shutdown(&self) {
        let _guard = self.restart_lock.lock().await;
        let old = self.current.write().take();
        if let Some(old) = old {
            old.stop().await;
        }
    }

    async fn restart(&self) -> Result<()> {
        let old = self.current.write().take();
        if let Some(old) = old {
            let drained = old.stop().await;
            if drained > 0 {
                warn!(drained, "Queued messages failed by restart");
            }
        }

        let settings = self.load_settings()?;
        let number = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let generation =
            PoolGeneration::spawn(number, settings, Arc::clone(&self.transport), &self.pool);
        *self.current.write() = Some(generation);
        Ok(())
    }

    fn load_settings(&self) -> Result<ConnectionSettings> {
        let values = self.store.batch_get(&keys::REQUIRED)?;
        let settings = ConnectionSettings::from_required(values, &|key: &str| self.store.get(key))?;
        Ok(settings)
    }

    /// `From` address: the sender-address override, else the username.
    #[must_use]
    pub fn sender_address(&self) -> String {
        self.store
            .get(keys::SENDER_ADDRESS)
            .filter(|a| !a.is_empty())
            .or_else(|| self.store.get(keys::USERNAME))
            .unwrap_or_default()
    }

    /// Deliver one message through the pool.
    ///
    /// Waits for queue space, then for the worker's report, at most
    /// [`SEND_TIMEOUT`] altogether. The message is never retried here.
    ///
    /// # Errors
    ///
    /// - [`DeliveryError::NotReady`] when no pool is running
    /// - [`DeliveryError::Dial`] / [`DeliveryError::Send`] on transport failure
    /// - [`DeliveryError::Timeout`] when no report arrives in time
    /// - [`DeliveryError::Restarted`] when the pool restarted first
    pub async fn send(&self, message: Message) -> std::result::Result<(), DeliveryError> {
        let queue = self
            .current
            .read()
            .as_ref()
            .map(PoolGeneration::sender)
            .ok_or(DeliveryError::NotReady)?;

        let id = message.id;
        let (unit, result, cancel) = SendUnit::new(message);
        debug!(message = %id, "Queueing message");

        let delivery = async {
            queue
                .send(unit)
                .await
                .map_err(|_| DeliveryError::Restarted)?;
            result.await.unwrap_or(Err(DeliveryError::Dropped))
        };

        match tokio::time::timeout(SEND_TIMEOUT, delivery).await {
            Ok(outcome) => outcome,
            Err(_) => {
                cancel.cancel();
                warn!(message = %id, timeout_secs = SEND_TIMEOUT.as_secs(), "Send timed out");
                Err(DeliveryError::Timeout)
            }
        }
    }

    /// Compose a message for one contact and deliver it.
    ///
    /// # Errors
    ///
    /// See [`send`](Self::send).
    pub async fn notify(&self, param: &SendParam) -> std::result::Result<(), DeliveryError> {
        debug!(contact = %param.contact, title = %param.title, "Received message");
        let message = Message::compose(self.sender_address(), param);
        self.send(message).await
    }

    /// Deliver every message, collecting failures instead of stopping.
    ///
    /// At most one message per worker is in flight, so every message gets
    /// its full [`SEND_TIMEOUT`] for delivery rather than for queueing
    /// behind the rest of the batch.
    ///
    /// # Errors
    ///
    /// Returns [`DeliveryError::NotReady`] up front when no pool is running.
    pub async fn batch_send(&self, params: &[SendParam]) -> Result<Vec<FailedRecord>> {
        if !self.is_ready() {
            return Err(DeliveryError::NotReady.into());
        }

        let outcomes: Vec<_> = stream::iter(params)
            .map(|p| self.notify(p))
            .buffered(self.pool.worker_count.max(1))
            .collect()
            .await;
        let failed: Vec<FailedRecord> = params
            .iter()
            .zip(outcomes)
            .filter_map(|(param, outcome)| {
                outcome.err().map(|e| FailedRecord {
                    contact: param.contact.clone(),
                    reason: e.to_string(),
                })
            })
            .collect();

        info!(
            total = params.len(),
            failed = failed.len(),
            "Batch send finished"
        );
        Ok(failed)
    }

    /// Current pool status, `None` when not ready.
    #[must_use]
    pub fn status(&self) -> Option<PoolStatus> {
        self.current.read().as_ref().map(|g| PoolStatus {
            generation: g.number(),
            address: g.settings().address(),
            workers: g.live_workers(),
            queued: g.queued(),
        })
    }
}

#[cfg(test)]
mod tests;
