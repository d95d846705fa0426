//! Mock [`Transport`] implementation for testing.
//!
//! [`ScriptedTransport`] hands out connections whose dial/send/close results
//! are popped from pre-loaded queues (defaulting to `Ok(())` when exhausted).
//! The queues and counters are shared by every connection the transport
//! dials, so tests can script a whole sequence across reconnects.
//!
//! Timing knobs:
//! - [`with_dial_delay`](ScriptedTransport::with_dial_delay) - slow dials
//!   (validation timeout, caller timeout).
//! - [`with_send_delay`](ScriptedTransport::with_send_delay) - slow but
//!   healthy sends (batch pacing).
//! - [`with_send_gate`](ScriptedTransport::with_send_gate) - each send waits
//!   for a semaphore permit (backpressure, in-flight restarts).

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::Semaphore;

use crate::domain::{ConnectionSettings, Message};
use crate::error::TransportError;
use crate::port::{Connection, Transport};

type Script = Arc<Mutex<VecDeque<Result<(), TransportError>>>>;

/// Call counters shared by a transport and all of its connections.
#[derive(Debug, Default)]
pub struct TransportCounters {
    pub dials: AtomicU32,
    pub sends: AtomicU32,
    pub closes: AtomicU32,
}

impl TransportCounters {
    pub fn dials(&self) -> u32 {
        self.dials.load(Ordering::SeqCst)
    }

    pub fn sends(&self) -> u32 {
        self.sends.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> u32 {
        self.closes.load(Ordering::SeqCst)
    }
}

pub struct ScriptedTransport {
    dial_results: Script,
    send_results: Script,
    close_results: Script,
    dial_error: Option<TransportError>,
    dial_delay: Option<Duration>,
    send_delay: Option<Duration>,
    send_gate: Option<Arc<Semaphore>>,
    counters: Arc<TransportCounters>,
    sent: Arc<Mutex<Vec<Message>>>,
    dialed_with: Arc<Mutex<Vec<ConnectionSettings>>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self {
            dial_results: Arc::default(),
            send_results: Arc::default(),
            close_results: Arc::default(),
            dial_error: None,
            dial_delay: None,
            send_delay: None,
            send_gate: None,
            counters: Arc::default(),
            sent: Arc::default(),
            dialed_with: Arc::default(),
        }
    }

    pub fn with_dial_results(self, results: Vec<Result<(), TransportError>>) -> Self {
        *self.dial_results.lock() = results.into();
        self
    }

    pub fn with_send_results(self, results: Vec<Result<(), TransportError>>) -> Self {
        *self.send_results.lock() = results.into();
        self
    }

    pub fn with_close_results(self, results: Vec<Result<(), TransportError>>) -> Self {
        *self.close_results.lock() = results.into();
        self
    }

    /// Every dial fails with `message`.
    pub fn failing_dial(mut self, message: &str) -> Self {
        self.dial_error = Some(TransportError::new(message));
        self
    }

    pub fn with_dial_delay(mut self, delay: Duration) -> Self {
        self.dial_delay = Some(delay);
        self
    }

    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }

    /// Each send waits for (and consumes) one permit from `gate`.
    pub fn with_send_gate(mut self, gate: Arc<Semaphore>) -> Self {
        self.send_gate = Some(gate);
        self
    }

    pub fn counters(&self) -> Arc<TransportCounters> {
        Arc::clone(&self.counters)
    }

    /// Messages accepted so far, in send order.
    pub fn sent(&self) -> Vec<Message> {
        self.sent.lock().clone()
    }

    /// Settings passed to each dial, in order.
    pub fn dialed_with(&self) -> Vec<ConnectionSettings> {
        self.dialed_with.lock().clone()
    }
}

impl Default for ScriptedTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn dial(
        &self,
        settings: &ConnectionSettings,
    ) -> Result<Box<dyn Connection>, TransportError> {
        self.counters.dials.fetch_add(1, Ordering::SeqCst);
        self.dialed_with.lock().push(settings.clone());

        if let Some(delay) = self.dial_delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(err) = &self.dial_error {
            return Err(err.clone());
        }
        let scripted = self.dial_results.lock().pop_front();
        scripted.unwrap_or(Ok(()))?;

        Ok(Box::new(ScriptedConnection {
            send_results: Arc::clone(&self.send_results),
            close_results: Arc::clone(&self.close_results),
            send_delay: self.send_delay,
            send_gate: self.send_gate.clone(),
            counters: Arc::clone(&self.counters),
            sent: Arc::clone(&self.sent),
        }))
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

struct ScriptedConnection {
    send_results: Script,
    close_results: Script,
    send_delay: Option<Duration>,
    send_gate: Option<Arc<Semaphore>>,
    counters: Arc<TransportCounters>,
    sent: Arc<Mutex<Vec<Message>>>,
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn send(&mut self, message: &Message) -> Result<(), TransportError> {
        self.counters.sends.fetch_add(1, Ordering::SeqCst);
        if let Some(gate) = &self.send_gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|_| TransportError::new("send gate closed"))?;
            permit.forget();
        }
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        let scripted = self.send_results.lock().pop_front();
        scripted.unwrap_or(Ok(()))?;
        self.sent.lock().push(message.clone());
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.counters.closes.fetch_add(1, Ordering::SeqCst);
        let scripted = self.close_results.lock().pop_front();
        scripted.unwrap_or(Ok(()))
    }
}
