//! Bounded memo of compiled expressions.

use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use lru::LruCache;
use tracing::{debug, trace};

use crate::compiler::compile_uncached;
use crate::compiler::ir::CompiledXPath;
use crate::error::Result;

/// Capacity of the process-wide cache behind [`compile`].
pub const DEFAULT_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(256) {
    Some(n) => n,
    None => unreachable!(),
};

type Slot = Arc<OnceLock<Result<Arc<CompiledXPath>>>>;

/// LRU map from expression text to its compiled form.
///
/// Each key owns a compute-once slot. The map lock is only held to find or
/// insert the slot, so compiling never blocks lookups of other expressions,
/// and concurrent requests for the same new expression all observe the one
/// result that settles the slot. Failed compilations are dropped from the map.
#[derive(Debug)]
pub struct XPathCache {
    entries: Mutex<LruCache<String, Slot>>,
}

impl Default for XPathCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_CAPACITY)
    }
}

impl XPathCache {
    pub fn new(capacity: NonZeroUsize) -> Self {
        Self { entries: Mutex::new(LruCache::new(capacity)) }
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<String, Slot>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn get_or_compile(&self, expr: &str) -> Result<Arc<CompiledXPath>> {
        let slot = {
            let mut entries = self.lock();
            if let Some(slot) = entries.get(expr) {
                Arc::clone(slot)
            } else {
                let slot = Slot::default();
                if let Some((evicted, _)) = entries.push(expr.to_owned(), Arc::clone(&slot)) {
                    trace!(evicted = evicted.as_str(), "evicted compiled expression");
                }
                slot
            }
        };

        let result = slot.get_or_init(|| {
            debug!(expr, "compiling XPath expression");
            compile_uncached(expr).map(Arc::new)
        });
        if let Err(err) = result {
            debug!(expr, error = %err, "compilation failed, not caching");
            self.forget(expr, &slot);
        }
        result.clone()
    }

    /// Drop `expr` if it still maps to `slot`; a newer slot is left alone.
    fn forget(&self, expr: &str, slot: &Slot) {
        let mut entries = self.lock();
        if entries.peek(expr).is_some_and(|current| Arc::ptr_eq(current, slot)) {
            entries.pop(expr);
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.lock().cap()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }
}

static GLOBAL_CACHE: OnceLock<XPathCache> = OnceLock::new();

/// The process-wide cache used by [`compile`].
pub fn global_cache() -> &'static XPathCache {
    GLOBAL_CACHE.get_or_init(XPathCache::default)
}

/// Compile `expr`, reusing the cached result while it is cached.
///
/// Two calls with the same text return the same `Arc` until the entry is
/// evicted; after that a structurally equal value is compiled again.
pub fn compile(expr: &str) -> Result<Arc<CompiledXPath>> {
    global_cache().get_or_compile(expr)
}
