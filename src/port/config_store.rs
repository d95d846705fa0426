//! Configuration store port.

use std::collections::HashMap;

use crate::error::ConfigError;

/// Key/value configuration cache shared by the dispatcher.
///
/// Mutation goes through [`Dispatcher::update_config`](crate::dispatcher::Dispatcher::update_config)
/// only; readers may run concurrently.
pub trait ConfigStore: Send + Sync {
    /// Get a single value.
    fn get(&self, key: &str) -> Option<String>;

    /// Get several values in key order.
    ///
    /// Fails with the first key that is absent or empty.
    fn batch_get(&self, keys: &[&str]) -> Result<Vec<String>, ConfigError> {
        keys.iter()
            .map(|key| match self.get(key) {
                Some(value) if !value.is_empty() => Ok(value),
                _ => Err(ConfigError::Missing {
                    key: (*key).to_string(),
                }),
            })
            .collect()
    }

    /// Insert or overwrite every entry of `values`.
    fn batch_set(&self, values: HashMap<String, String>);

    /// Remove every entry.
    fn clean(&self);
}
