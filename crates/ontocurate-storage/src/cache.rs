//! Fast per-repository counters.

use std::collections::HashMap;

use parking_lot::RwLock;

#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache backend unavailable: {0}")]
    Unavailable(String),
}

/// Integer get/set keyed by a repository-qualified name. No eviction.
pub trait FastCache: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<u64>, CacheError>;
    fn set(&self, key: &str, value: u64) -> Result<(), CacheError>;
}

#[derive(Debug, Default)]
pub struct MemoryCache {
    values: RwLock<HashMap<String, u64>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl FastCache for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<u64>, CacheError> {
        Ok(self.values.read().get(key).copied())
    }

    fn set(&self, key: &str, value: u64) -> Result<(), CacheError> {
        self.values.write().insert(key.to_string(), value);
        Ok(())
    }
}
