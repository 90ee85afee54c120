//! # metafetch-core
//!
//! Core functionality for metafetch - turn loosely formatted content
//! identifiers and URLs into normalized, cached metadata records.
//!
//! Input such as `BV17x411w7KC`, `https://b23.tv/abc`, `pixiv:12345-2` or
//! `sm9` is discovered, routed to a platform plugin, and resolved into a
//! canonical [`ResolvedInfo`]. The plugin can then fetch the platform's raw
//! payload (read through a single-flight cache) and reduce it to
//! [`Metadata`].
//!
//! ## Architecture
//!
//! - **Discovery**: ordered regex patterns mapping input to route paths
//! - **Routing**: a segment trie mapping route paths to plugin resolvers
//! - **Plugins**: per-platform `resolve`/`fetch`/`parse`, see [`Platform`]
//! - **Cache**: in-memory LRU over a persistent text store, with population
//!   shared between concurrent callers
//! - **Pipeline**: redirect chasing for meta ids and lazily staged fetches
//! - **Codec**: the numeric-id/`BV` identifier bijection
//!
//! ## Quick Start
//!
//! ```rust
//! use metafetch_core::{Config, Registry, codec};
//!
//! let registry = Registry::builtin(&Config::default())?;
//!
//! let info = registry.resolve("BV17x411w7KC").expect("known id");
//! assert_eq!(info.id(), "av170001");
//! assert_eq!(info.url(), "https://www.bilibili.com/video/av170001/");
//!
//! assert_eq!(codec::encode(170_001).as_deref(), Some("BV17x411w7KC"));
//! assert!(registry.resolve("not an id").is_none());
//! # Ok::<(), metafetch_core::Error>(())
//! ```
//!
//! ## Error Handling
//!
//! Unrecognized input is `None`, never an error. Fetch failures carry an
//! [`Error`] with a category and a recoverability hint:
//!
//! ```rust,no_run
//! use metafetch_core::{Config, Pipeline};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> metafetch_core::Result<()> {
//! let pipeline = Pipeline::from_config(&Config::load()?).await?;
//! let info = pipeline.resolve("sm9").expect("known id");
//! match pipeline.parse(&info).await {
//!     Ok(Some(meta)) => println!("{}", meta.parsed.title),
//!     Ok(None) => eprintln!("no metadata"),
//!     Err(e) if e.is_recoverable() => eprintln!("try again later: {e}"),
//!     Err(e) => eprintln!("failed ({}): {e}", e.category()),
//! }
//! # Ok(())
//! # }
//! ```

/// Read-through metadata cache with single-flight population
pub mod cache;
/// `av`/`BV` identifier codec
pub mod codec;
/// Configuration management
pub mod config;
/// Input pattern matching
pub mod discovery;
/// Error types and result aliases
pub mod error;
/// Embedded-data extraction from HTML pages
pub mod html;
/// HTTP fetch abstraction and the reqwest-backed client
pub mod http;
/// Redirect chasing and staged fetch/parse orchestration
pub mod pipeline;
/// Built-in platform plugins
pub mod platforms;
/// Plugin traits and the registry
pub mod plugin;
/// Route path trie
pub mod router;
/// Identifier and metadata records
pub mod types;

// Re-export commonly used types
pub use cache::{Cache, CacheExt, FsStore, MemoryStore, NoCache, StoreCache, TextStore};
pub use config::{CacheConfig, Config, NicoUrlType};
pub use discovery::{Discover, Discovery};
pub use error::{Error, Result};
pub use http::{HttpFetch, HttpRequest, HttpResponse, ReqwestFetcher};
pub use pipeline::{Pipeline, Stage, Staged};
pub use plugin::{Platform, Plugin, RawData, Redirected, Registry, RegistryBuilder};
pub use router::Router;
pub use types::*;
