//! Monotonic per-repository identifier issuance.
//!
//! ```text
//!   lock ─▶ index.prefix_query("ABC:") ─▶ top + 1 (or 1)
//!        ─▶ cache["abc_latest_id"]       ─▶ candidate <= cache ? cache + 1 : candidate
//!        ─▶ cache := winner ─▶ unlock
//! ```
//!
//! The cache wins ties: it reflects identifiers issued by this process that
//! the index may not show yet.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::cache::{CacheError, FastCache};
use crate::index::{IndexError, TextIndex};

pub const DEFAULT_DIGIT_COUNT: usize = 7;

#[derive(Debug, thiserror::Error)]
pub enum AllocError {
    #[error("identifier index unavailable: {0}")]
    Index(#[from] IndexError),

    #[error("identifier cache unavailable: {0}")]
    Cache(#[from] CacheError),

    #[error("indexed identifier `{id}` has no numeric suffix")]
    MalformedIdentifier { id: String },
}

/// Serializes identifier allocation and index maintenance.
///
/// One process-wide lock: every read-compute-write against the index and the
/// cache happens while holding it.
#[derive(Debug, Clone, Default)]
pub struct StoreLock(Arc<Mutex<()>>);

impl StoreLock {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn acquire(&self) -> MutexGuard<'_, ()> {
        self.0.lock()
    }
}

/// Identifier prefix and zero-padding width of one repository.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdScheme {
    pub prefix: String,
    pub digits: usize,
}

pub fn cache_key(repo: &str) -> String {
    format!("{repo}_latest_id")
}

fn numeric_suffix(id: &str) -> Option<u64> {
    let (_, number) = id.trim().rsplit_once(':')?;
    number.trim().parse().ok()
}

pub struct IdentifierAllocator {
    index: Arc<dyn TextIndex>,
    cache: Arc<dyn FastCache>,
    lock: StoreLock,
    default_digits: usize,
    schemes: HashMap<String, IdScheme>,
}

impl IdentifierAllocator {
    pub fn new(index: Arc<dyn TextIndex>, cache: Arc<dyn FastCache>, lock: StoreLock) -> Self {
        Self {
            index,
            cache,
            lock,
            default_digits: DEFAULT_DIGIT_COUNT,
            schemes: HashMap::new(),
        }
    }

    pub fn with_default_digits(mut self, digits: usize) -> Self {
        self.default_digits = digits;
        self
    }

    pub fn with_repo(mut self, repo: &str, prefix: &str, digits: Option<usize>) -> Self {
        let digits = digits.unwrap_or(self.default_digits);
        self.schemes.insert(
            repo.to_string(),
            IdScheme {
                prefix: prefix.trim().to_uppercase(),
                digits,
            },
        );
        self
    }

    pub fn lock(&self) -> &StoreLock {
        &self.lock
    }

    /// Repositories without a registered scheme use their upper-cased key.
    pub fn scheme(&self, repo: &str) -> IdScheme {
        self.schemes.get(repo).cloned().unwrap_or_else(|| IdScheme {
            prefix: repo.trim().to_uppercase(),
            digits: self.default_digits,
        })
    }

    pub fn format(&self, repo: &str, number: u64) -> String {
        let scheme = self.scheme(repo);
        format!("{}:{:0width$}", scheme.prefix, number, width = scheme.digits)
    }

    /// Next unused number for `repo`.
    pub fn next_id(&self, repo: &str) -> Result<u64, AllocError> {
        let _guard = self.lock.acquire();
        self.next_id_locked(repo)
    }

    pub fn next_identifier(&self, repo: &str) -> Result<String, AllocError> {
        let number = self.next_id(repo)?;
        Ok(self.format(repo, number))
    }

    /// `count` consecutive identifiers, issued under one lock acquisition.
    pub fn next_identifiers(&self, repo: &str, count: usize) -> Result<Vec<String>, AllocError> {
        let _guard = self.lock.acquire();
        (0..count)
            .map(|_| self.next_id_locked(repo).map(|n| self.format(repo, n)))
            .collect()
    }

    fn next_id_locked(&self, repo: &str) -> Result<u64, AllocError> {
        let scheme = self.scheme(repo);
        // The trailing separator keeps `ABC` from matching `ABCD:` documents.
        let hits = self.index.prefix_query(&format!("{}:", scheme.prefix))?;

        let mut top: Option<u64> = None;
        for hit in &hits {
            let Some(id) = hit.class_id.as_deref() else {
                continue;
            };
            match numeric_suffix(id) {
                Some(n) => top = top.max(Some(n)),
                None => tracing::warn!(repo = %repo, id = %id, "indexed identifier has no numeric suffix"),
            }
        }
        if top.is_none() {
            if let Some(id) = hits.first().and_then(|h| h.class_id.clone()) {
                return Err(AllocError::MalformedIdentifier { id });
            }
        }
        let candidate = top.map_or(1, |n| n + 1);

        let key = cache_key(repo);
        let next = match self.cache.get(&key)? {
            Some(cached) if candidate <= cached => {
                tracing::debug!(repo = %repo, candidate, cached, "index behind cache, cache wins");
                cached + 1
            }
            _ => candidate,
        };
        self.cache.set(&key, next)?;

        tracing::info!(repo = %repo, id = next, "allocated identifier");
        Ok(next)
    }
}
