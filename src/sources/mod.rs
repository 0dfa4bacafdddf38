//! Source adapters.
//!
//! Each adapter fetches one upstream's payload and hands it back as a
//! [`RawPayload`]; normalization into canonical [`Stream`] records happens
//! per payload variant. Adapters never fail a request: fetch errors and
//! outer timeouts are logged and become empty results.

pub mod addon;
pub mod aggregator;
pub mod dmm;
pub mod library;
pub mod provider;

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::debrid::{DebridFile, DebridTorrent};
use crate::fetch::FetchError;
use crate::stream::{MediaKind, Stream};

pub use addon::AddonStream;
pub use aggregator::{AggregatorSource, AggregatorVariant};
pub use dmm::{DmmRecord, DmmSource};
pub use library::debrid_library;
pub use provider::ThirdPartySource;

/// What is being looked up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentQuery {
    /// IMDb id, e.g. `tt0903747`.
    pub imdb_id: String,
    pub kind: MediaKind,
    pub season: Option<u32>,
    pub episode: Option<u32>,
}

impl ContentQuery {
    pub fn movie(imdb_id: impl Into<String>) -> Self {
        Self {
            imdb_id: imdb_id.into(),
            kind: MediaKind::Movie,
            season: None,
            episode: None,
        }
    }

    pub fn episode(imdb_id: impl Into<String>, season: u32, episode: u32) -> Self {
        Self {
            imdb_id: imdb_id.into(),
            kind: MediaKind::Episode,
            season: Some(season),
            episode: Some(episode),
        }
    }

    /// `imdbId` for movies, `imdbId:season:episode` for episodes.
    pub fn content_id(&self) -> String {
        match (self.kind, self.season, self.episode) {
            (MediaKind::Episode, Some(s), Some(e)) => format!("{}:{s}:{e}", self.imdb_id),
            _ => self.imdb_id.clone(),
        }
    }

    /// `stream/{type}/{contentId}.json`, colons left unencoded.
    pub fn stream_path(&self) -> String {
        format!("stream/{}/{}.json", self.kind.wire_type(), self.content_id())
    }
}

/// Upstream payloads, one variant per response shape.
#[derive(Debug, Clone)]
pub enum RawPayload {
    TorrentAggregator {
        provider_id: String,
        provider_name: String,
        streams: Vec<AddonStream>,
        /// Results came from the credential-prefiltered endpoint.
        prefiltered: bool,
    },
    DmmCache {
        records: Vec<DmmRecord>,
        /// Server was asked for cached results only.
        only_cached: bool,
    },
    ThirdParty {
        provider_id: String,
        provider_name: String,
        streams: Vec<AddonStream>,
    },
    DirectDebridUrl {
        torrent: DebridTorrent,
        files: Vec<DebridFile>,
    },
}

impl RawPayload {
    pub fn normalize(self) -> Vec<Stream> {
        match self {
            RawPayload::TorrentAggregator {
                provider_id,
                provider_name,
                streams,
                prefiltered,
            } => {
                let cached = prefiltered.then_some(true);
                addon::normalize(streams, &provider_id, &provider_name, cached)
            }
            RawPayload::DmmCache {
                records,
                only_cached,
            } => dmm::normalize(records, only_cached),
            RawPayload::ThirdParty {
                provider_id,
                provider_name,
                streams,
            } => addon::normalize(streams, &provider_id, &provider_name, None),
            RawPayload::DirectDebridUrl { torrent, files } => library::normalize(&torrent, files),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            RawPayload::TorrentAggregator { streams, .. } | RawPayload::ThirdParty { streams, .. } => {
                streams.len()
            }
            RawPayload::DmmCache { records, .. } => records.len(),
            RawPayload::DirectDebridUrl { files, .. } => files.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// One upstream source of streams.
#[async_trait]
pub trait SourceAdapter: Send + Sync {
    /// Stable identifier used for attribution.
    fn id(&self) -> &str;

    /// Display name used for grouping.
    fn name(&self) -> &str;

    /// Outer bound on the whole fetch, retries included.
    fn timeout(&self) -> Duration;

    async fn fetch_raw(
        &self,
        query: &ContentQuery,
        cancel: &CancellationToken,
    ) -> Result<RawPayload, FetchError>;

    /// Fetch and normalize, absorbing every failure into an empty list.
    async fn streams(&self, query: &ContentQuery, cancel: &CancellationToken) -> Vec<Stream> {
        let result = tokio::time::timeout(self.timeout(), self.fetch_raw(query, cancel)).await;
        match result {
            Ok(Ok(payload)) => {
                let streams = payload.normalize();
                debug!(source = self.id(), count = streams.len(), "Source returned streams");
                streams
            }
            Ok(Err(FetchError::Cancelled)) => {
                debug!(source = self.id(), "Source fetch cancelled");
                Vec::new()
            }
            Ok(Err(e)) => {
                warn!(source = self.id(), error = %e, "Source fetch failed");
                Vec::new()
            }
            Err(_) => {
                warn!(source = self.id(), timeout = ?self.timeout(), "Source timed out");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn content_ids() {
        assert_eq!(ContentQuery::movie("tt0111161").content_id(), "tt0111161");
        assert_eq!(
            ContentQuery::episode("tt0903747", 1, 2).stream_path(),
            "stream/series/tt0903747:1:2.json"
        );
        assert_eq!(
            ContentQuery::movie("tt0111161").stream_path(),
            "stream/movie/tt0111161.json"
        );
    }

    struct Failing;

    #[async_trait]
    impl SourceAdapter for Failing {
        fn id(&self) -> &str {
            "failing"
        }
        fn name(&self) -> &str {
            "Failing"
        }
        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
        async fn fetch_raw(
            &self,
            _query: &ContentQuery,
            _cancel: &CancellationToken,
        ) -> Result<RawPayload, FetchError> {
            Err(FetchError::NoAttempts("x".into()))
        }
    }

    struct Stalling;

    #[async_trait]
    impl SourceAdapter for Stalling {
        fn id(&self) -> &str {
            "stalling"
        }
        fn name(&self) -> &str {
            "Stalling"
        }
        fn timeout(&self) -> Duration {
            Duration::from_millis(20)
        }
        async fn fetch_raw(
            &self,
            _query: &ContentQuery,
            _cancel: &CancellationToken,
        ) -> Result<RawPayload, FetchError> {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Err(FetchError::NoAttempts("late".into()))
        }
    }

    #[tokio::test]
    async fn failures_become_empty() {
        let q = ContentQuery::movie("tt1");
        assert!(Failing.streams(&q, &CancellationToken::new()).await.is_empty());
    }

    #[tokio::test]
    async fn outer_timeout_becomes_empty() {
        let q = ContentQuery::movie("tt1");
        assert!(Stalling.streams(&q, &CancellationToken::new()).await.is_empty());
    }
}
