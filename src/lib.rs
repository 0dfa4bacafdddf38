//! `reelsource` - playable-source aggregation for movies and episodes
//!
//! # Features
//!
//! - **Resilient fetch**: relay-proxy failover, per-attempt timeouts, HTML error-page sniffing
//! - **Providers**: installable third-party addons, a torrent aggregator, a DMM hash cache
//! - **Classification**: resolution, codec, HDR, audio, source type, languages, size, seeders
//! - **Debrid**: batch cache verification and direct-URL resolution via `TorBox`
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use reelsource::{AggregationRequest, Orchestrator, ProviderRegistry, Settings};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let registry = Arc::new(ProviderRegistry::in_memory());
//!     let orchestrator = Orchestrator::from_settings(settings, registry)?;
//!
//!     let result = orchestrator
//!         .search(&AggregationRequest::movie("tt0111161"))
//!         .await?;
//!     println!("{} streams", result.len());
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod cache;
pub mod classify;
pub mod config;
pub mod debrid;
pub mod error;
pub mod fetch;
pub mod merge;
pub mod registry;
pub mod resolve;
pub mod sources;
pub mod stream;

pub use aggregate::{
    AggregationRequest, AggregationResult, AggregationState, Orchestrator, SizeOrder, SourceMode,
};
pub use cache::{CachePolicy, CacheVerifier};
pub use classify::{classify, classify_stream, Classification};
pub use config::{ActiveSource, Settings};
pub use debrid::{DebridError, DebridService, TorboxClient};
pub use error::{ConfigurationError, Error, Result};
pub use fetch::{FetchError, FetchOptions, FetchResponse, ProxyRoute, ResilientFetcher};
pub use registry::{ManifestError, Provider, ProviderRegistry, RegistryError};
pub use resolve::Resolver;
pub use sources::{ContentQuery, RawPayload, SourceAdapter};
pub use stream::{ClassifiedStream, InfoHash, MediaKind, QualityTier, SourceKind, Stream};

/// Version of reelsource
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
