//! Canonical test configurations.
//!
//! Single source of truth for config values used across tests.

use std::collections::HashMap;

use crate::config::PoolConfig;
use crate::domain::{keys, ConnectionSettings};

/// Pool config with the given sizing.
pub fn pool(queue_capacity: usize, worker_count: usize) -> PoolConfig {
    PoolConfig {
        queue_capacity,
        worker_count,
    }
}

/// A complete set of SMTP keys.
pub fn smtp() -> HashMap<String, String> {
    [
        (keys::HOSTNAME, "smtp.example.com"),
        (keys::HOSTPORT, "587"),
        (keys::USERNAME, "u"),
        (keys::PASSWORD, "p"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// [`smtp`] with `key` removed.
pub fn smtp_without(key: &str) -> HashMap<String, String> {
    let mut values = smtp();
    values.remove(key);
    values
}

/// Settings matching [`smtp`].
pub fn settings() -> ConnectionSettings {
    ConnectionSettings::from_map(&smtp()).expect("canonical smtp keys are valid")
}
