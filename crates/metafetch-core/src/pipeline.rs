//! Resolution and fetch pipeline.
//!
//! [`Pipeline`] ties a [`Registry`] to its injected collaborators (cache and
//! HTTP client) and exposes the public operations:
//!
//! - [`Pipeline::resolve`] / [`Pipeline::xresolve`]: input to records, no I/O
//! - [`Pipeline::parse`]: record to merged [`Metadata`]
//! - [`Pipeline::xparse`]: input to a [`Staged`] set of lazily computed values
//!
//! Stages are shared futures that start only when awaited. A caller that
//! reads just the plugin and resolved record never touches the network.
//!
//! ```rust,no_run
//! use metafetch_core::{Config, Pipeline};
//!
//! # async fn run() -> metafetch_core::Result<()> {
//! let pipeline = Pipeline::from_config(&Config::load()?).await?;
//! if let Some(staged) = pipeline.xparse("BV17x411w7KC") {
//!     println!("{}", staged.resolved().url());
//!     if let Some(meta) = staged.parsed().get().await? {
//!         println!("{}", meta.parsed.title);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

use crate::cache::{Cache, FsStore, NoCache, StoreCache};
use crate::http::{self, HttpFetch, ReqwestFetcher};
use crate::plugin::{Plugin, RawData, Registry, Resolutions};
use crate::types::{Metadata, ResolvedInfo};
use crate::{Config, Error, Result};
use futures::FutureExt;
use futures::future::{BoxFuture, Shared};
use std::collections::HashSet;
use std::fmt;
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use tracing::{debug, info};

const DEFAULT_MAX_REDIRECTS: usize = 5;

/// Orchestrates discovery, routing, redirects, fetching and parsing.
#[derive(Clone)]
pub struct Pipeline {
    registry: Arc<Registry>,
    cache: Arc<dyn Cache>,
    http: Arc<dyn HttpFetch>,
    max_redirects: usize,
}

impl fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Pipeline")
            .field("registry", &self.registry)
            .field("max_redirects", &self.max_redirects)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Pipeline over explicit collaborators.
    pub fn new(registry: Arc<Registry>, cache: Arc<dyn Cache>, http: Arc<dyn HttpFetch>) -> Self {
        Self {
            registry,
            cache,
            http,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }

    /// Override the redirect hop bound.
    #[must_use]
    pub const fn with_max_redirects(mut self, max_redirects: usize) -> Self {
        self.max_redirects = max_redirects;
        self
    }

    /// Built-in platforms, filesystem cache (unless disabled) and a
    /// `reqwest` client, all configured from `config`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let registry = Arc::new(Registry::builtin(config)?);
        let cache: Arc<dyn Cache> = if config.cache.enabled {
            let store = FsStore::create(&config.cache.dir).await?;
            Arc::new(StoreCache::new(store, config.cache.capacity))
        } else {
            info!("Cache disabled");
            Arc::new(NoCache)
        };
        let http = Arc::new(ReqwestFetcher::new(config)?);
        Ok(Self::new(registry, cache, http).with_max_redirects(config.max_redirects))
    }

    /// Registry used for resolution.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Cache shared by every plugin fetch.
    pub fn cache(&self) -> &dyn Cache {
        self.cache.as_ref()
    }

    /// Network collaborator used by plugin fetches and redirect chasing.
    pub fn http(&self) -> &dyn HttpFetch {
        self.http.as_ref()
    }

    /// First record `input` resolves to. Performs no I/O.
    pub fn resolve(&self, input: &str) -> Option<Arc<ResolvedInfo>> {
        self.registry.resolve(input)
    }

    /// Every record `input` resolves to, produced lazily.
    pub fn xresolve(&self, input: &str) -> Resolutions<'_> {
        self.registry.xresolve(input)
    }

    /// The plugin that produced `info`.
    pub fn plugin_for(&self, info: &ResolvedInfo) -> Result<&Arc<dyn Plugin>> {
        self.registry.plugin_for(info)
    }

    /// Run the owning plugin's fetch for `info`.
    pub async fn fetch(&self, info: &ResolvedInfo) -> Result<Option<RawData>> {
        self.plugin_for(info)?.fetch(self, info).await
    }

    /// Fetch and parse `info` to completion.
    ///
    /// `Ok(None)` when the plugin fetched nothing or parsed no title.
    pub async fn parse(&self, info: &ResolvedInfo) -> Result<Option<Metadata>> {
        let plugin = self.plugin_for(info)?;
        let Some(data) = plugin.fetch(self, info).await? else {
            debug!(id = info.id(), "Fetch produced nothing");
            return Ok(None);
        };
        Ok(merge_parsed(plugin.as_ref(), &data, info))
    }

    /// Chase a meta record's redirects to the content it stands for.
    ///
    /// Each hop performs one non-following request against the current URL
    /// and resolves its `Location`. The chase ends at the first non-meta
    /// record. `Ok(None)` when a response has no `Location` or the target is
    /// not recognised.
    ///
    /// # Errors
    ///
    /// [`Error::RedirectLoop`] when a meta id repeats,
    /// [`Error::TooManyRedirects`] when the hop bound is exhausted, and any
    /// network failure.
    pub async fn follow_redirect(&self, info: &ResolvedInfo) -> Result<Option<Arc<ResolvedInfo>>> {
        let mut seen = HashSet::from([info.id().to_string()]);
        let mut url = info.url().to_string();
        for hop in 1..=self.max_redirects {
            let Some(target) = http::redirect_target(self.http(), &url).await? else {
                return Ok(None);
            };
            let Some(next) = self.resolve(&target) else {
                debug!(%target, hop, "Redirect target not recognised");
                return Ok(None);
            };
            debug!(from = info.id(), to = next.id(), hop, "Followed redirect");
            if !next.is_meta() {
                return Ok(Some(next));
            }
            if !seen.insert(next.id().to_string()) {
                return Err(Error::RedirectLoop(next.id().to_string()));
            }
            url = next.url().to_string();
        }
        Err(Error::TooManyRedirects {
            id: info.id().to_string(),
            hops: self.max_redirects,
        })
    }

    /// Resolve `input` and stage the rest of the work without starting it.
    ///
    /// Returns `None` for input shorter than three characters (after
    /// trimming) or input no platform recognises.
    pub fn xparse(&self, input: &str) -> Option<Staged> {
        let input = input.trim();
        if input.chars().count() <= 2 {
            return None;
        }
        let resolved = self.resolve(input)?;
        let plugin = Arc::clone(self.plugin_for(&resolved).ok()?);
        if resolved.is_meta() {
            Some(self.stage_redirected(plugin, resolved))
        } else {
            Some(self.stage_direct(plugin, resolved))
        }
    }

    fn stage_direct(&self, plugin: Arc<dyn Plugin>, resolved: Arc<ResolvedInfo>) -> Staged {
        let raw = {
            let (pipeline, plugin, info) = (self.clone(), Arc::clone(&plugin), Arc::clone(&resolved));
            Stage::new(async move { plugin.fetch(&pipeline, &info).await })
        };
        let parsed = {
            let (raw, plugin, info) = (raw.clone(), Arc::clone(&plugin), Arc::clone(&resolved));
            Stage::chained(async move {
                let Some(data) = raw.shared_result().await? else {
                    return Ok(None);
                };
                Ok(merge_parsed(plugin.as_ref(), &data, &info).map(Arc::new))
            })
        };
        Staged {
            plugin,
            resolved,
            redirect: None,
            raw,
            parsed,
        }
    }

    fn stage_redirected(&self, plugin: Arc<dyn Plugin>, resolved: Arc<ResolvedInfo>) -> Staged {
        let redirect = {
            let (pipeline, info) = (self.clone(), Arc::clone(&resolved));
            Stage::new(async move { pipeline.follow_redirect(&info).await })
        };
        let raw = {
            let (pipeline, redirect) = (self.clone(), redirect.clone());
            Stage::chained(async move {
                let Some(target) = redirect.shared_result().await? else {
                    return Ok(None);
                };
                pipeline.fetch(&target).await.map_err(Arc::new)
            })
        };
        let parsed = {
            let (pipeline, redirect, raw) = (self.clone(), redirect.clone(), raw.clone());
            Stage::chained(async move {
                let Some(target) = redirect.shared_result().await? else {
                    return Ok(None);
                };
                let Some(data) = raw.shared_result().await? else {
                    return Ok(None);
                };
                let plugin = pipeline.plugin_for(&target).map_err(Arc::new)?;
                Ok(merge_parsed(plugin.as_ref(), &data, &target).map(Arc::new))
            })
        };
        Staged {
            plugin,
            resolved,
            redirect: Some(redirect),
            raw,
            parsed,
        }
    }
}

fn merge_parsed(plugin: &dyn Plugin, data: &RawData, info: &ResolvedInfo) -> Option<Metadata> {
    let parsed = plugin.parse(data, info)?;
    if !parsed.has_title() {
        debug!(id = info.id(), "Parse produced no title");
        return None;
    }
    Some(Metadata::merge(info, parsed))
}

type StageFuture<T> = Shared<BoxFuture<'static, Result<T, Arc<Error>>>>;

/// One lazily computed pipeline value.
///
/// Cloning shares the computation. Nothing runs until the stage is awaited
/// (or detached); afterwards every handle observes the same outcome,
/// including the same failure.
pub struct Stage<T> {
    inner: StageFuture<T>,
}

impl<T> Clone for Stage<T> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
        }
    }
}

impl<T: Clone> fmt::Debug for Stage<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.inner.peek() {
            None => "pending",
            Some(Ok(_)) => "ready",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("Stage").field("state", &state).finish()
    }
}

impl<T: Clone + Send + Sync + 'static> Stage<T> {
    /// Stage whose value is produced by `work` on first await.
    pub fn new<F>(work: F) -> Self
    where
        F: Future<Output = Result<T>> + Send + 'static,
    {
        Self::chained(work.map(|result| result.map_err(Arc::new)))
    }

    /// Stage with a value already available.
    pub fn ready(value: T) -> Self {
        Self::chained(futures::future::ready(Ok(value)))
    }

    /// Stage built from other stages; their failures pass through unwrapped.
    fn chained<F>(work: F) -> Self
    where
        F: Future<Output = Result<T, Arc<Error>>> + Send + 'static,
    {
        Self {
            inner: work.boxed().shared(),
        }
    }

    async fn shared_result(&self) -> Result<T, Arc<Error>> {
        self.inner.clone().await
    }

    /// Await the value, starting the work if needed.
    pub async fn get(&self) -> Result<T> {
        self.shared_result().await.map_err(Error::Shared)
    }

    /// The outcome if the work has already completed.
    pub fn peek(&self) -> Option<Result<T>> {
        self.inner
            .peek()
            .map(|result| result.clone().map_err(Error::Shared))
    }

    /// Drive the stage in a background task.
    ///
    /// A failure there is logged at debug level and otherwise discarded; a
    /// later [`Stage::get`] still observes it. Without a tokio runtime the
    /// stage is left untouched.
    pub fn detach(&self) {
        let inner = self.inner.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                handle.spawn(async move {
                    if let Err(e) = inner.await {
                        debug!(error = %e, "Discarded failure of detached stage");
                    }
                });
            },
            Err(_) => debug!("No runtime, detached stage not started"),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> IntoFuture for Stage<T> {
    type Output = Result<T>;
    type IntoFuture = BoxFuture<'static, Result<T>>;

    fn into_future(self) -> Self::IntoFuture {
        async move { self.inner.await.map_err(Error::Shared) }.boxed()
    }
}

/// Result of [`Pipeline::xparse`].
///
/// Values become available in order: plugin, resolved record, redirect
/// target (meta records only), raw payload, parsed metadata. For a meta
/// record the payload and metadata are those of the redirect target.
#[derive(Debug, Clone)]
pub struct Staged {
    plugin: Arc<dyn Plugin>,
    resolved: Arc<ResolvedInfo>,
    redirect: Option<Stage<Option<Arc<ResolvedInfo>>>>,
    raw: Stage<Option<RawData>>,
    parsed: Stage<Option<Arc<Metadata>>>,
}

impl Staged {
    /// Plugin owning the resolved record.
    pub fn plugin(&self) -> &Arc<dyn Plugin> {
        &self.plugin
    }

    /// The resolved record.
    pub fn resolved(&self) -> &Arc<ResolvedInfo> {
        &self.resolved
    }

    /// Redirect target; present only when the resolved id is a meta id.
    pub fn redirect(&self) -> Option<&Stage<Option<Arc<ResolvedInfo>>>> {
        self.redirect.as_ref()
    }

    /// Raw payload; for a meta record, the redirect target's payload.
    pub fn raw(&self) -> &Stage<Option<RawData>> {
        &self.raw
    }

    /// Merged metadata; `None` when fetch or parse yields nothing.
    pub fn parsed(&self) -> &Stage<Option<Arc<Metadata>>> {
        &self.parsed
    }

    /// Start the whole chain in the background without awaiting it.
    pub fn prefetch(&self) {
        self.parsed.detach();
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    #[tokio::test]
    async fn test_stage_is_lazy_and_shared() -> Result<()> {
        // Given: A stage counting its runs
        let runs = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&runs);
        let stage = Stage::new(async move {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(7_u32)
        });

        // Then: Nothing ran yet
        tokio::task::yield_now().await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(stage.peek().is_none());

        // When: Awaiting two handles
        let other = stage.clone();
        assert_eq!(stage.get().await?, 7);
        assert_eq!(other.await?, 7);

        // Then: The work ran once
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(matches!(stage.peek(), Some(Ok(7))));
        Ok(())
    }

    #[tokio::test]
    async fn test_detached_failure_is_still_observed() {
        // Given: A failing stage driven in the background
        let stage: Stage<u32> = Stage::new(async { Err(Error::Upstream("gone".into())) });
        stage.detach();
        for _ in 0..50 {
            if stage.peek().is_some() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        // When: A caller awaits it later
        let result = stage.get().await;

        // Then: The original failure surfaces
        match result {
            Err(Error::Shared(inner)) => assert!(matches!(*inner, Error::Upstream(_))),
            other => panic!("Expected shared failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_chained_failure_is_not_rewrapped() {
        let first: Stage<u32> = Stage::new(async { Err(Error::Parse("bad".into())) });
        let second = {
            let first = first.clone();
            Stage::chained(async move { first.shared_result().await.map(|n| n + 1) })
        };

        let (a, b) = (first.get().await, second.get().await);

        for result in [a, b] {
            match result {
                Err(Error::Shared(inner)) => assert!(matches!(*inner, Error::Parse(_))),
                other => panic!("Expected shared parse failure, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_ready_stage_and_detach_without_runtime() {
        let stage = Stage::ready("x".to_string());
        stage.detach();
        assert!(stage.peek().is_none());
        assert_eq!(format!("{stage:?}"), "Stage { state: \"pending\" }");
    }
}
