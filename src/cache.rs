//! Batch cache verification against the debrid service.
//!
//! All hashes of a request are checked together, never one call per stream,
//! so the outbound call count stays bounded regardless of result size.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::debrid::{DebridError, DebridService};
use crate::stream::{ClassifiedStream, InfoHash, SourceKind};

/// What to do with streams the debrid service has not cached.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CachePolicy {
    /// Drop torrent streams that are not confirmed cached.
    CachedOnly,
    /// Keep everything, tagging confirmed streams as cached.
    #[default]
    Exploratory,
}

/// Checks stream hashes against a [`DebridService`].
#[derive(Clone)]
pub struct CacheVerifier {
    debrid: Arc<dyn DebridService>,
}

impl CacheVerifier {
    pub fn new(debrid: Arc<dyn DebridService>) -> Self {
        Self { debrid }
    }

    /// Cached status for every hash. One call per request, split only when
    /// the service's batch limit would be exceeded.
    pub async fn batch_check(
        &self,
        hashes: &BTreeSet<InfoHash>,
        cancel: &CancellationToken,
    ) -> Result<HashMap<InfoHash, bool>, DebridError> {
        let hashes: Vec<InfoHash> = hashes.iter().cloned().collect();
        let mut status = HashMap::with_capacity(hashes.len());
        for chunk in hashes.chunks(self.debrid.max_batch().max(1)) {
            status.extend(self.debrid.batch_check_cached(chunk, cancel).await?);
        }
        Ok(status)
    }

    /// Filter or tag `streams` according to `policy` and a status map.
    ///
    /// Hashes missing from `cached` count as not cached. Direct-URL
    /// streams are already playable and always kept.
    pub fn apply(
        streams: Vec<ClassifiedStream>,
        cached: &HashMap<InfoHash, bool>,
        policy: CachePolicy,
    ) -> Vec<ClassifiedStream> {
        let is_cached = |s: &ClassifiedStream| {
            s.info_hash()
                .and_then(|h| cached.get(h).copied())
                .unwrap_or(false)
        };

        match policy {
            CachePolicy::CachedOnly => streams
                .into_iter()
                .filter(|s| s.stream.source_kind == SourceKind::DirectUrl || is_cached(s))
                .map(|mut s| {
                    if s.stream.source_kind == SourceKind::Torrent {
                        s.cached_hint = true;
                    }
                    s
                })
                .collect(),
            CachePolicy::Exploratory => streams
                .into_iter()
                .map(|mut s| {
                    s.cached_hint = s.cached_hint || is_cached(&s);
                    s
                })
                .collect(),
        }
    }

    /// Check and apply in one step.
    ///
    /// A failed check drops every torrent stream under
    /// [`CachePolicy::CachedOnly`] and passes streams through untouched
    /// under [`CachePolicy::Exploratory`].
    pub async fn verify(
        &self,
        streams: Vec<ClassifiedStream>,
        policy: CachePolicy,
        cancel: &CancellationToken,
    ) -> Vec<ClassifiedStream> {
        let hashes: BTreeSet<InfoHash> = streams
            .iter()
            .filter(|s| s.stream.source_kind == SourceKind::Torrent)
            .filter_map(|s| s.info_hash().cloned())
            .collect();
        if hashes.is_empty() {
            return streams;
        }

        match self.batch_check(&hashes, cancel).await {
            Ok(cached) => {
                debug!(
                    service = self.debrid.name(),
                    checked = hashes.len(),
                    cached = cached.values().filter(|c| **c).count(),
                    "Cache status resolved"
                );
                Self::apply(streams, &cached, policy)
            }
            Err(e) => {
                warn!(service = self.debrid.name(), error = %e, "Cache check failed");
                match policy {
                    CachePolicy::CachedOnly => Self::apply(streams, &HashMap::new(), policy),
                    CachePolicy::Exploratory => streams,
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify_stream;
    use crate::stream::Stream;

    fn hash(c: char) -> InfoHash {
        InfoHash::parse(&c.to_string().repeat(40)).unwrap()
    }

    fn torrent(c: char) -> ClassifiedStream {
        classify_stream(Stream::torrent(hash(c), "p", "P", "t", "Movie.1080p"))
    }

    #[test]
    fn cached_only_keeps_confirmed() {
        let streams = vec![torrent('a'), torrent('b'), torrent('c')];
        let map = HashMap::from([(hash('a'), true), (hash('b'), false)]);
        let kept = CacheVerifier::apply(streams, &map, CachePolicy::CachedOnly);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].info_hash(), Some(&hash('a')));
        assert!(kept[0].cached_hint);
    }

    #[test]
    fn exploratory_tags_without_dropping() {
        let streams = vec![torrent('a'), torrent('b'), torrent('c')];
        let map = HashMap::from([(hash('a'), true), (hash('b'), false)]);
        let kept = CacheVerifier::apply(streams, &map, CachePolicy::Exploratory);
        let hints: Vec<bool> = kept.iter().map(|s| s.cached_hint).collect();
        assert_eq!(hints, [true, false, false]);
    }

    #[test]
    fn exploratory_keeps_existing_hint() {
        let mut stream = torrent('a');
        stream.cached_hint = true;
        let kept = CacheVerifier::apply(vec![stream], &HashMap::new(), CachePolicy::Exploratory);
        assert!(kept[0].cached_hint);
    }

    #[test]
    fn direct_urls_survive_cached_only() {
        let direct = classify_stream(Stream::direct("https://cdn/x.mkv", "p", "P", "t", "t"));
        let kept = CacheVerifier::apply(vec![direct], &HashMap::new(), CachePolicy::CachedOnly);
        assert_eq!(kept.len(), 1);
    }
}
