//! Read-through, single-flight metadata cache.
//!
//! [`StoreCache`] keeps a bounded LRU window in memory over a persistent
//! [`TextStore`]. A miss calls the caller's population future exactly once,
//! even when several callers ask for the same key concurrently: the first
//! caller installs a shared in-flight future and later callers join it.
//! Absent results and failures are never cached, so a later call retries.
//!
//! ```rust
//! use futures::FutureExt;
//! use metafetch_core::cache::{Cache, MemoryStore, StoreCache};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> metafetch_core::Result<()> {
//! let cache = StoreCache::new(MemoryStore::new(), 200);
//! let value = cache
//!     .try_get("av1.json", async { Ok(Some("{}".to_string())) }.boxed())
//!     .await?;
//! assert_eq!(value.as_deref(), Some("{}"));
//! # Ok(())
//! # }
//! ```

mod store;

pub use store::{FsStore, MemoryStore, TextStore};

use crate::{Error, Result};
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::future::Future;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Population callback passed to [`Cache::try_get`].
///
/// Resolves to `Ok(None)` when there is nothing to cache.
pub type Populate = BoxFuture<'static, Result<Option<String>>>;

type Population = Shared<BoxFuture<'static, Result<Option<String>, Arc<Error>>>>;

/// Escape path separators so a name maps to one flat store entry.
pub fn normalize_name(name: &str) -> String {
    name.replace(['/', '\\'], "!")
}

/// Text cache shared by every resolution.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Cached value for `name`, from memory or the persistent store.
    async fn get(&self, name: &str) -> Result<Option<String>>;

    /// Cached value for `name`, populating it on a miss.
    ///
    /// Concurrent calls for the same name share one population.
    async fn try_get(&self, name: &str, populate: Populate) -> Result<Option<String>>;

    /// Store a value in memory and persist it.
    async fn set(&self, name: &str, value: &str) -> Result<()>;

    /// Resource ids currently held in memory.
    fn keys(&self) -> Vec<String>;

    /// Drop the in-memory window. Persisted entries are kept.
    fn clear(&self);
}

/// Typed helpers over any [`Cache`].
pub trait CacheExt: Cache {
    /// Read-through a JSON payload stored under `<id>.json`.
    fn json<T, F>(&self, id: &str, populate: F) -> impl Future<Output = Result<Option<T>>> + Send
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Future<Output = Result<Option<T>>> + Send + 'static;
}

impl<C: Cache + ?Sized> CacheExt for C {
    fn json<T, F>(&self, id: &str, populate: F) -> impl Future<Output = Result<Option<T>>> + Send
    where
        T: Serialize + DeserializeOwned + Send + 'static,
        F: Future<Output = Result<Option<T>>> + Send + 'static,
    {
        let name = format!("{id}.json");
        async move {
            let populate = async move {
                match populate.await? {
                    Some(value) => Ok(Some(serde_json::to_string(&value)?)),
                    None => Ok(None),
                }
            }
            .boxed();
            match self.try_get(&name, populate).await? {
                Some(text) => Ok(Some(serde_json::from_str(&text)?)),
                None => Ok(None),
            }
        }
    }
}

/// Cache that stores nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoCache;

#[async_trait]
impl Cache for NoCache {
    async fn get(&self, _name: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn try_get(&self, _name: &str, populate: Populate) -> Result<Option<String>> {
        populate.await
    }

    async fn set(&self, _name: &str, _value: &str) -> Result<()> {
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        Vec::new()
    }

    fn clear(&self) {}
}

struct Inner<S> {
    store: S,
    lru: Mutex<LruCache<String, String>>,
    inflight: Mutex<HashMap<String, Population>>,
}

/// LRU window over a persistent [`TextStore`].
pub struct StoreCache<S> {
    inner: Arc<Inner<S>>,
}

impl<S: TextStore> StoreCache<S> {
    /// Wrap `store` with an in-memory window of `capacity` entries (at least one).
    pub fn new(store: S, capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(Inner {
                store,
                lru: Mutex::new(LruCache::new(capacity)),
                inflight: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// The backing store.
    pub fn store(&self) -> &S {
        &self.inner.store
    }

    /// Number of entries in the memory window.
    pub fn len(&self) -> usize {
        self.inner.lru.lock().len()
    }

    /// True when the memory window is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.lru.lock().is_empty()
    }

    fn memory_hit(&self, name: &str) -> Option<String> {
        self.inner.lru.lock().get(name).cloned()
    }

    async fn settle(inner: Arc<Inner<S>>, name: String, populate: Populate) -> Result<Option<String>, Arc<Error>> {
        let result = Self::load_or_populate(&inner, &name, populate).await;
        let mut inflight = inner.inflight.lock();
        if let Ok(Some(value)) = &result {
            inner.lru.lock().put(name.clone(), value.clone());
        }
        inflight.remove(&name);
        result.map_err(Arc::new)
    }

    async fn load_or_populate(inner: &Inner<S>, name: &str, populate: Populate) -> Result<Option<String>> {
        match inner.store.read(name).await {
            Ok(Some(text)) => {
                debug!(%name, "Cache hit (persisted)");
                return Ok(Some(text));
            },
            Ok(None) => {},
            Err(e) => warn!(%name, error = %e, "Persisted cache entry unreadable, repopulating"),
        }
        debug!(%name, "Cache miss");
        let value = populate.await?;
        match &value {
            Some(text) => inner.store.write(name, text).await?,
            None => debug!(%name, "Population produced nothing, not caching"),
        }
        Ok(value)
    }
}

#[async_trait]
impl<S: TextStore> Cache for StoreCache<S> {
    async fn get(&self, name: &str) -> Result<Option<String>> {
        let name = normalize_name(name);
        if let Some(value) = self.memory_hit(&name) {
            return Ok(Some(value));
        }
        let pending = self.inner.inflight.lock().get(&name).cloned();
        if let Some(pending) = pending {
            return pending.await.map_err(Error::Shared);
        }
        let value = self.inner.store.read(&name).await?;
        if let Some(text) = &value {
            self.inner.lru.lock().put(name, text.clone());
        }
        Ok(value)
    }

    async fn try_get(&self, name: &str, populate: Populate) -> Result<Option<String>> {
        let name = normalize_name(name);
        if let Some(value) = self.memory_hit(&name) {
            debug!(%name, "Cache hit");
            return Ok(Some(value));
        }
        let population = {
            let mut inflight = self.inner.inflight.lock();
            if let Some(value) = self.memory_hit(&name) {
                return Ok(Some(value));
            }
            if let Some(pending) = inflight.get(&name) {
                debug!(%name, "Joining in-flight population");
                pending.clone()
            } else {
                let population = Self::settle(Arc::clone(&self.inner), name.clone(), populate)
                    .boxed()
                    .shared();
                inflight.insert(name, population.clone());
                population
            }
        };
        population.await.map_err(Error::Shared)
    }

    async fn set(&self, name: &str, value: &str) -> Result<()> {
        let name = normalize_name(name);
        self.inner.store.write(&name, value).await?;
        self.inner.lru.lock().put(name, value.to_string());
        Ok(())
    }

    fn keys(&self) -> Vec<String> {
        self.inner
            .lru
            .lock()
            .iter()
            .filter(|(key, _)| !key.starts_with('_'))
            .map(|(key, _)| match key.find('.') {
                Some(i) if i > 0 => key[..i].to_string(),
                _ => key.clone(),
            })
            .collect()
    }

    fn clear(&self) {
        self.inner.lru.lock().clear();
    }
}
