//! Sender pool configuration.

use serde::Deserialize;

/// Sizing of the shared queue and the worker pool.
#[derive(Debug, Clone, Deserialize)]
pub struct PoolConfig {
    /// Capacity of the shared send queue. `send` waits when it is full.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
    /// Number of connection workers, each owning one reusable connection.
    #[serde(default = "default_worker_count")]
    pub worker_count: usize,
}

const fn default_queue_capacity() -> usize {
    100
}

const fn default_worker_count() -> usize {
    5
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            queue_capacity: default_queue_capacity(),
            worker_count: default_worker_count(),
        }
    }
}
