//! In-memory configuration store.

use std::collections::HashMap;

use parking_lot::RwLock;

use crate::port::ConfigStore;

/// [`ConfigStore`] backed by a `HashMap` behind a read/write lock.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryConfigStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `values`.
    #[must_use]
    pub fn with_values(values: HashMap<String, String>) -> Self {
        Self {
            values: RwLock::new(values),
        }
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.read().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.read().is_empty()
    }
}

impl ConfigStore for MemoryConfigStore {
    fn get(&self, key: &str) -> Option<String> {
        self.values.read().get(key).cloned()
    }

    fn batch_set(&self, values: HashMap<String, String>) {
        self.values.write().extend(values);
    }

    fn clean(&self) {
        self.values.write().clear();
    }
}
