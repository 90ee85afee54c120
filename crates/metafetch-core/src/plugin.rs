//! Platform plugins and the registry that dispatches to them.
//!
//! A platform implements [`Platform`] with its own payload type. The
//! registry stores it as an object-safe [`Plugin`] (payload erased to
//! [`RawData`]), installs its resolver in the route trie under its path, and
//! tags every [`ResolvedInfo`] the resolver returns with the plugin's
//! position. [`Registry::plugin_for`] reads that tag back, so callers holding
//! only a record can fetch and parse it.
//!
//! ```rust
//! use metafetch_core::{Config, Registry};
//!
//! let registry = Registry::builtin(&Config::default())?;
//! let info = registry.resolve("av170001").expect("known id");
//! assert_eq!(info.id(), "av170001");
//! assert_eq!(registry.plugin_for(&info)?.name(), "Bilibili Video");
//! # Ok::<(), metafetch_core::Error>(())
//! ```

use crate::discovery::{Discover, Discovery, Routes};
use crate::router::Router;
use crate::types::{Origin, ParsedInfo, ResolvedInfo};
use crate::{Config, Error, Pipeline, Result};
use async_trait::async_trait;
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, warn};

/// Type-erased platform payload.
pub type RawData = Arc<dyn Any + Send + Sync>;

/// A platform's `resolve`/`fetch`/`parse` triad with a typed payload.
#[async_trait]
pub trait Platform: Send + Sync + 'static {
    /// Raw payload produced by `fetch` and consumed by `parse`.
    type Data: Send + Sync + 'static;

    /// Human-facing platform name.
    fn name(&self) -> &'static str;

    /// Route prefix the resolver is installed under.
    fn path(&self) -> &'static str;

    /// Build a record from the route segments following [`Platform::path`].
    fn resolve(&self, path: &[String]) -> Option<ResolvedInfo>;

    /// Retrieve the payload, normally through `pipeline.cache()`.
    async fn fetch(&self, pipeline: &Pipeline, info: &ResolvedInfo) -> Result<Option<Self::Data>>;

    /// Reduce the payload to metadata.
    fn parse(&self, data: &Self::Data, info: &ResolvedInfo) -> Option<ParsedInfo>;
}

/// Object-safe view of a [`Platform`].
#[async_trait]
pub trait Plugin: Send + Sync {
    /// Human-readable platform name.
    fn name(&self) -> &'static str;
    /// Route prefix the plugin is installed at.
    fn path(&self) -> &'static str;
    /// Build a record from the route segments below [`Plugin::path`].
    fn resolve(&self, path: &[String]) -> Option<ResolvedInfo>;
    /// Fetch the raw payload; `None` when the content does not exist.
    async fn fetch(&self, pipeline: &Pipeline, info: &ResolvedInfo) -> Result<Option<RawData>>;

    /// Returns `None` for a payload not produced by this plugin's `fetch`.
    fn parse(&self, data: &RawData, info: &ResolvedInfo) -> Option<ParsedInfo>;
}

#[async_trait]
impl<P: Platform> Plugin for P {
    fn name(&self) -> &'static str {
        Platform::name(self)
    }

    fn path(&self) -> &'static str {
        Platform::path(self)
    }

    fn resolve(&self, path: &[String]) -> Option<ResolvedInfo> {
        Platform::resolve(self, path)
    }

    async fn fetch(&self, pipeline: &Pipeline, info: &ResolvedInfo) -> Result<Option<RawData>> {
        let data = Platform::fetch(self, pipeline, info).await?;
        Ok(data.map(|data| Arc::new(data) as RawData))
    }

    fn parse(&self, data: &RawData, info: &ResolvedInfo) -> Option<ParsedInfo> {
        let Some(data) = (**data).downcast_ref::<P::Data>() else {
            warn!(plugin = Platform::name(self), id = info.id(), "Payload of unexpected type");
            return None;
        };
        Platform::parse(self, data, info)
    }
}

impl fmt::Debug for dyn Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name())
            .field("path", &self.path())
            .finish()
    }
}

/// Payload of a meta plugin: the redirect target with its own payload.
///
/// Meta plugins fetch by following the redirect and delegating to the
/// target's plugin, then parse by delegating again.
#[derive(Clone)]
pub struct Redirected {
    /// Plugin owning the target.
    pub plugin: Arc<dyn Plugin>,
    /// Resolved record of the target.
    pub info: Arc<ResolvedInfo>,
    /// Target payload as fetched by [`Redirected::plugin`].
    pub data: RawData,
}

impl Redirected {
    /// Follow `info`'s redirect and fetch the target.
    pub async fn fetch(pipeline: &Pipeline, info: &ResolvedInfo) -> Result<Option<Self>> {
        let Some(target) = pipeline.follow_redirect(info).await? else {
            return Ok(None);
        };
        let plugin = Arc::clone(pipeline.plugin_for(&target)?);
        let Some(data) = plugin.fetch(pipeline, &target).await? else {
            return Ok(None);
        };
        Ok(Some(Self {
            plugin,
            info: target,
            data,
        }))
    }

    /// Parse the target payload with the target's plugin.
    pub fn parse(&self) -> Option<ParsedInfo> {
        self.plugin.parse(&self.data, &self.info)
    }
}

impl fmt::Debug for Redirected {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Redirected")
            .field("plugin", &self.plugin)
            .field("info", &self.info)
            .finish_non_exhaustive()
    }
}

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Collects discovery entries and plugins before freezing them.
pub struct RegistryBuilder {
    id: u64,
    discovery: Discovery,
    router: Router<ResolvedInfo>,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl Default for RegistryBuilder {
    fn default() -> Self {
        Self {
            id: NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed),
            discovery: Discovery::new(),
            router: Router::new(),
            plugins: Vec::new(),
        }
    }
}

impl RegistryBuilder {
    /// Empty builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append discovery patterns (tried after earlier ones).
    pub fn define_discover(&mut self, discover: Discover) -> &mut Self {
        self.discovery.define(discover);
        self
    }

    /// Install a plugin's resolver at its path.
    ///
    /// # Errors
    ///
    /// [`Error::RouteConflict`] when the path collides with an installed one.
    pub fn define_plugin<P: Plugin + 'static>(&mut self, plugin: P) -> Result<Arc<dyn Plugin>> {
        let plugin: Arc<dyn Plugin> = Arc::new(plugin);
        let origin = Origin {
            registry: self.id,
            index: self.plugins.len(),
        };
        let resolver = Arc::clone(&plugin);
        self.router.define(plugin.path(), move |segments: &[String]| {
            resolver
                .resolve(segments)
                .map(|info| info.with_origin(origin))
        })?;
        debug!(name = plugin.name(), path = plugin.path(), "Defined plugin");
        self.plugins.push(Arc::clone(&plugin));
        Ok(plugin)
    }

    /// Freeze the collected discovers and plugins.
    pub fn build(self) -> Registry {
        Registry {
            id: self.id,
            discovery: self.discovery,
            router: self.router,
            plugins: self.plugins,
        }
    }
}

/// Immutable set of discovery entries and plugins.
pub struct Registry {
    id: u64,
    discovery: Discovery,
    router: Router<ResolvedInfo>,
    plugins: Vec<Arc<dyn Plugin>>,
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registry")
            .field("id", &self.id)
            .field("plugins", &self.plugins)
            .field("routes", &self.router)
            .finish_non_exhaustive()
    }
}

impl Registry {
    /// Start building a registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Registry with every built-in platform.
    pub fn builtin(config: &Config) -> Result<Self> {
        let mut builder = RegistryBuilder::new();
        crate::platforms::install(&mut builder, config)?;
        Ok(builder.build())
    }

    /// Every record `input` resolves to, produced lazily.
    pub fn xresolve(&self, input: &str) -> Resolutions<'_> {
        Resolutions {
            registry: self,
            routes: self.discovery.xresolve(input),
        }
    }

    /// First record `input` resolves to.
    pub fn resolve(&self, input: &str) -> Option<Arc<ResolvedInfo>> {
        self.xresolve(input).next()
    }

    /// Resolve a route path directly, skipping discovery.
    pub fn resolve_route(&self, route: &str) -> Option<Arc<ResolvedInfo>> {
        let info = self.router.resolve(route);
        if info.is_none() {
            debug!(%route, "Route did not resolve");
        }
        info.map(Arc::new)
    }

    /// The plugin that produced `info`.
    ///
    /// # Errors
    ///
    /// [`Error::UnknownOrigin`] if `info` was not produced by this registry.
    pub fn plugin_for(&self, info: &ResolvedInfo) -> Result<&Arc<dyn Plugin>> {
        info.origin()
            .filter(|origin| origin.registry == self.id)
            .and_then(|origin| self.plugins.get(origin.index))
            .ok_or_else(|| Error::UnknownOrigin(info.id().to_string()))
    }

    /// Installed plugins in registration order.
    pub fn plugins(&self) -> &[Arc<dyn Plugin>] {
        &self.plugins
    }

    /// Discover entries in registration order.
    pub const fn discovery(&self) -> &Discovery {
        &self.discovery
    }
}

/// Iterator returned by [`Registry::xresolve`].
pub struct Resolutions<'a> {
    registry: &'a Registry,
    routes: Routes<'a>,
}

impl Iterator for Resolutions<'_> {
    type Item = Arc<ResolvedInfo>;

    fn next(&mut self) -> Option<Self::Item> {
        self.routes
            .by_ref()
            .find_map(|route| self.registry.resolve_route(&route))
    }
}
