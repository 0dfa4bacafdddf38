//! Aggregation orchestrator.
//!
//! A search walks `Init → SourceSelect → Fetch → Classify → Dedup →
//! CacheVerify → Done`. `Failed` is reachable only from `SourceSelect`, when
//! the selected mode's precondition (the debrid credential) is missing.
//! Everything after source selection degrades to fewer results instead of
//! failing.
//!
//! When a request asks for library streams, files the user already holds in
//! the debrid library are listed ahead of the source results after
//! verification.
//!
//! Mode selection happens once per request with strict priority and no
//! fallback between modes:
//!
//! 1. third-party providers, when enabled (empty result if none apply)
//! 2. the DMM cache, when it is the active built-in source
//! 3. the torrent aggregator otherwise

pub mod rank;

use std::collections::BTreeSet;
use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use crate::cache::{CachePolicy, CacheVerifier};
use crate::classify::classify_stream;
use crate::config::{ActiveSource, Settings};
use crate::debrid::{DebridService, TorboxClient};
use crate::error::{ConfigurationError, Result};
use crate::fetch::ResilientFetcher;
use crate::merge::merge;
use crate::registry::{Provider, ProviderRegistry};
use crate::resolve::Resolver;
use crate::sources::{AggregatorSource, ContentQuery, DmmSource, SourceAdapter, ThirdPartySource};
use crate::stream::{ClassifiedStream, InfoHash, MediaKind, Stream};

pub use rank::{AggregationResult, RankOptions, SizeOrder, StreamGroup, TierCounts};

/// Where the results of a search came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMode {
    ThirdParty,
    DmmCache,
    Aggregator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregationState {
    Init,
    SourceSelect,
    Fetch,
    Classify,
    Dedup,
    CacheVerify,
    Done,
    Failed,
}

/// One search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationRequest {
    /// IMDb id of the movie or series.
    pub content_id: String,
    pub media_kind: MediaKind,
    pub season: Option<u32>,
    pub episode: Option<u32>,
    pub sort: SizeOrder,
    pub cache_policy: CachePolicy,
    /// Add direct-URL streams for matching torrents in the debrid library.
    pub include_library: bool,
}

impl AggregationRequest {
    pub fn movie(imdb_id: impl Into<String>) -> Self {
        Self {
            content_id: imdb_id.into(),
            media_kind: MediaKind::Movie,
            season: None,
            episode: None,
            sort: SizeOrder::default(),
            cache_policy: CachePolicy::default(),
            include_library: false,
        }
    }

    pub fn episode(imdb_id: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            content_id: imdb_id.into(),
            media_kind: MediaKind::Episode,
            season: Some(season),
            episode: Some(episode),
            sort: SizeOrder::default(),
            cache_policy: CachePolicy::default(),
            include_library: false,
        }
    }

    #[must_use]
    pub fn with_sort(mut self, sort: SizeOrder) -> Self {
        self.sort = sort;
        self
    }

    #[must_use]
    pub fn with_cache_policy(mut self, policy: CachePolicy) -> Self {
        self.cache_policy = policy;
        self
    }

    #[must_use]
    pub fn with_library(mut self) -> Self {
        self.include_library = true;
        self
    }

    pub fn query(&self) -> ContentQuery {
        ContentQuery {
            imdb_id: self.content_id.clone(),
            kind: self.media_kind,
            season: self.season,
            episode: self.episode,
        }
    }
}

/// Sources chosen for a request.
enum Plan {
    ThirdParty(Vec<Provider>),
    Dmm,
    Aggregator { credential: String },
}

impl Plan {
    fn mode(&self) -> SourceMode {
        match self {
            Plan::ThirdParty(_) => SourceMode::ThirdParty,
            Plan::Dmm => SourceMode::DmmCache,
            Plan::Aggregator { .. } => SourceMode::Aggregator,
        }
    }
}

/// How cache verification should treat the fetched streams.
enum Verification {
    /// Upstream already filtered to cached streams.
    Skip,
    Apply(CachePolicy),
}

/// Runs searches against the configured sources.
pub struct Orchestrator {
    settings: Settings,
    registry: Arc<ProviderRegistry>,
    fetcher: Arc<ResilientFetcher>,
    debrid: Option<Arc<dyn DebridService>>,
}

impl Orchestrator {
    /// Orchestrator using `fetcher`, with a debrid client when the settings
    /// carry a credential.
    pub fn new(
        settings: Settings,
        registry: Arc<ProviderRegistry>,
        fetcher: Arc<ResilientFetcher>,
    ) -> Self {
        let debrid = settings.credential().map(|token| {
            let client = TorboxClient::with_base_url(fetcher.clone(), &settings.debrid_url, token)
                .with_timeout(settings.debrid_timeout());
            Arc::new(client) as Arc<dyn DebridService>
        });
        Self {
            settings,
            registry,
            fetcher,
            debrid,
        }
    }

    /// Build the fetcher (with configured proxies) from `settings`.
    pub fn from_settings(settings: Settings, registry: Arc<ProviderRegistry>) -> Result<Self> {
        let fetcher = ResilientFetcher::with_proxies(
            settings.proxy_routes(),
            settings.selected_proxy.clone(),
        )?;
        Ok(Self::new(settings, registry, Arc::new(fetcher)))
    }

    /// Replace the debrid service.
    #[must_use]
    pub fn with_debrid(mut self, debrid: Arc<dyn DebridService>) -> Self {
        self.debrid = Some(debrid);
        self
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn debrid(&self) -> Option<&Arc<dyn DebridService>> {
        self.debrid.as_ref()
    }

    pub async fn search(&self, request: &AggregationRequest) -> Result<AggregationResult> {
        self.search_cancellable(request, &CancellationToken::new()).await
    }

    /// Search, aborting outstanding calls when `cancel` fires.
    ///
    /// A superseding request cancels the stale one's token; the stale call
    /// then returns whatever finished before cancellation.
    #[instrument(skip(self, request, cancel), fields(content = %request.content_id))]
    pub async fn search_cancellable(
        &self,
        request: &AggregationRequest,
        cancel: &CancellationToken,
    ) -> Result<AggregationResult> {
        let mut state = AggregationState::Init;
        let query = request.query();

        transition(&mut state, AggregationState::SourceSelect);
        let plan = match self.select(&query).await {
            Ok(plan) => plan,
            Err(e) => {
                transition(&mut state, AggregationState::Failed);
                return Err(e.into());
            }
        };
        let mode = plan.mode();
        info!(?mode, "Source selected");

        transition(&mut state, AggregationState::Fetch);
        let (per_source, verification) = match plan {
            Plan::ThirdParty(providers) if providers.is_empty() => {
                info!("No installed provider supports this content");
                transition(&mut state, AggregationState::Done);
                return Ok(AggregationResult::empty(mode));
            }
            Plan::ThirdParty(providers) => {
                let per_source = self.fetch_providers(providers, &query, cancel).await;
                (per_source, Verification::Apply(request.cache_policy))
            }
            Plan::Dmm => self.fetch_dmm(&query, request.cache_policy, cancel).await,
            Plan::Aggregator { credential } => {
                self.fetch_aggregator(&credential, &query, request.cache_policy, cancel)
                    .await
            }
        };

        transition(&mut state, AggregationState::Classify);
        let classified: Vec<Vec<ClassifiedStream>> = per_source
            .into_iter()
            .map(|streams| streams.into_iter().map(classify_stream).collect())
            .collect();

        transition(&mut state, AggregationState::Dedup);
        let raw_count: usize = classified.iter().map(Vec::len).sum();
        let merged = merge(classified);
        debug!(raw_count, merged = merged.len(), "Merged source results");

        transition(&mut state, AggregationState::CacheVerify);
        let verified = self.verify(merged, verification, cancel).await;

        let streams = if request.include_library {
            let mut streams = self.library(&verified, cancel).await;
            streams.extend(verified);
            streams
        } else {
            verified
        };

        let ranked = rank::rank(streams, RankOptions::for_mode(mode, request.sort));
        transition(&mut state, AggregationState::Done);
        info!(count = ranked.len(), ?mode, "Search complete");
        Ok(AggregationResult::from_ranked(mode, ranked))
    }

    async fn select(&self, query: &ContentQuery) -> std::result::Result<Plan, ConfigurationError> {
        if self.settings.third_party_mode {
            let providers = self
                .registry
                .eligible(query.kind, &query.content_id())
                .await;
            return Ok(Plan::ThirdParty(providers));
        }

        match self.settings.active_source {
            ActiveSource::Dmm => {
                self.require_credential("DMM source")?;
                Ok(Plan::Dmm)
            }
            ActiveSource::Aggregator => {
                let credential = self.require_credential("aggregator source")?;
                Ok(Plan::Aggregator {
                    credential: credential.to_string(),
                })
            }
        }
    }

    fn require_credential(
        &self,
        source_name: &'static str,
    ) -> std::result::Result<&str, ConfigurationError> {
        self.settings
            .credential()
            .ok_or(ConfigurationError::MissingCredential { source_name })
    }

    async fn fetch_providers(
        &self,
        providers: Vec<Provider>,
        query: &ContentQuery,
        cancel: &CancellationToken,
    ) -> Vec<Vec<Stream>> {
        let adapters: Vec<ThirdPartySource> = providers
            .into_iter()
            .map(|p| {
                ThirdPartySource::new(
                    self.fetcher.clone(),
                    p,
                    self.settings.fetch_options(),
                    self.settings.provider_timeout(),
                )
            })
            .collect();
        debug!(providers = adapters.len(), "Fanning out to providers");

        // join_all keeps adapter order regardless of completion order
        join_all(adapters.iter().map(|a| a.streams(query, cancel))).await
    }

    async fn fetch_dmm(
        &self,
        query: &ContentQuery,
        policy: CachePolicy,
        cancel: &CancellationToken,
    ) -> (Vec<Vec<Stream>>, Verification) {
        let prefilter = self.settings.dmm_prefilter;
        let source = DmmSource::new(
            self.fetcher.clone(),
            &self.settings.dmm_url,
            prefilter,
            self.settings.fetch_options(),
            self.settings.dmm_timeout(),
        );
        let streams = source.streams(query, cancel).await;
        let verification = if prefilter {
            Verification::Skip
        } else {
            Verification::Apply(policy)
        };
        (vec![streams], verification)
    }

    async fn fetch_aggregator(
        &self,
        credential: &str,
        query: &ContentQuery,
        policy: CachePolicy,
        cancel: &CancellationToken,
    ) -> (Vec<Vec<Stream>>, Verification) {
        let prefiltered = AggregatorSource::prefiltered(
            self.fetcher.clone(),
            &self.settings.aggregator_url,
            &self.settings.aggregator_token_key,
            credential,
            self.settings.fetch_options(),
            self.settings.aggregator_timeout(),
        );
        let streams = prefiltered.streams(query, cancel).await;
        if !streams.is_empty() {
            return (vec![streams], Verification::Skip);
        }

        info!("Prefiltered aggregator returned nothing, falling back to unfiltered");
        let unfiltered = AggregatorSource::unfiltered(
            self.fetcher.clone(),
            &self.settings.aggregator_url,
            self.settings.fetch_options(),
            self.settings.aggregator_timeout(),
        );
        let streams = unfiltered.streams(query, cancel).await;
        debug!(requested = ?policy, "Fallback results are verified as cached-only");
        (vec![streams], Verification::Apply(CachePolicy::CachedOnly))
    }

    async fn verify(
        &self,
        streams: Vec<ClassifiedStream>,
        verification: Verification,
        cancel: &CancellationToken,
    ) -> Vec<ClassifiedStream> {
        let policy = match verification {
            Verification::Skip => return streams,
            Verification::Apply(policy) => policy,
        };

        let Some(debrid) = &self.debrid else {
            if policy == CachePolicy::CachedOnly {
                warn!("No debrid service configured, cached-only filter not applied");
            }
            return streams;
        };

        CacheVerifier::new(debrid.clone())
            .verify(streams, policy, cancel)
            .await
    }

    /// Library files for the torrents in `streams`. Lookup failures leave
    /// the search result unchanged.
    async fn library(
        &self,
        streams: &[ClassifiedStream],
        cancel: &CancellationToken,
    ) -> Vec<ClassifiedStream> {
        let Some(debrid) = &self.debrid else {
            return Vec::new();
        };
        let hashes: BTreeSet<InfoHash> = streams
            .iter()
            .filter_map(ClassifiedStream::info_hash)
            .cloned()
            .collect();
        if hashes.is_empty() {
            return Vec::new();
        }

        match Resolver::new(debrid.clone()).library_streams(&hashes, cancel).await {
            Ok(found) => {
                debug!(count = found.len(), "Library streams added");
                found.into_iter().map(classify_stream).collect()
            }
            Err(e) => {
                warn!(error = %e, "Library lookup failed");
                Vec::new()
            }
        }
    }
}

fn transition(state: &mut AggregationState, next: AggregationState) {
    debug!(from = ?*state, to = ?next, "Aggregation state");
    *state = next;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProviderRegistry;

    fn orchestrator(settings: Settings) -> Orchestrator {
        Orchestrator::new(
            settings,
            Arc::new(ProviderRegistry::in_memory()),
            Arc::new(ResilientFetcher::new().unwrap()),
        )
    }

    #[test]
    fn request_builds_content_query() {
        let request = AggregationRequest::episode("tt0903747", 1, 2);
        assert_eq!(request.query().content_id(), "tt0903747:1:2");
        assert_eq!(request.sort, SizeOrder::Descending);
        assert_eq!(request.cache_policy, CachePolicy::Exploratory);
    }

    #[tokio::test]
    async fn missing_credential_fails_builtin_modes() {
        for source in [ActiveSource::Aggregator, ActiveSource::Dmm] {
            let settings = Settings {
                active_source: source,
                debrid_token: None,
                ..Settings::default()
            };
            let err = orchestrator(settings)
                .search(&AggregationRequest::movie("tt1"))
                .await
                .unwrap_err();
            assert!(matches!(
                err,
                crate::Error::Configuration(ConfigurationError::MissingCredential { .. })
            ));
        }
    }

    #[tokio::test]
    async fn third_party_without_providers_is_empty_not_error() {
        let settings = Settings {
            third_party_mode: true,
            ..Settings::default()
        };
        let result = orchestrator(settings)
            .search(&AggregationRequest::movie("tt1"))
            .await
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(result.mode, SourceMode::ThirdParty);
    }

    #[test]
    fn credential_enables_debrid() {
        let settings = Settings {
            debrid_token: Some("tok".into()),
            ..Settings::default()
        };
        assert!(orchestrator(settings).debrid().is_some());
        assert!(orchestrator(Settings::default()).debrid().is_none());
    }
}
