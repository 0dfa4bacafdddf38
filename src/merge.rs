//! Hash-keyed merge of per-source results.
//!
//! Sources are merged in the order given (fan-out order, not completion
//! order). The first stream seen for an info hash is kept as-is, including
//! its attribution; later duplicates are dropped without reconciling
//! fields. Direct-URL streams and streams without a hash have no stable
//! identity and are never collapsed.

use std::collections::HashSet;

use crate::stream::{InfoHash, SourceKind, Stream};

/// Identity used for deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DedupKey {
    Hash(InfoHash),
    /// Position of a hashless stream within its provider's result.
    Synthetic { provider_id: String, index: usize },
}

impl DedupKey {
    pub fn for_stream(stream: &Stream, index: usize) -> Self {
        match (&stream.source_kind, &stream.info_hash) {
            (SourceKind::Torrent, Some(hash)) => DedupKey::Hash(hash.clone()),
            _ => DedupKey::Synthetic {
                provider_id: stream.provider_id.clone(),
                index,
            },
        }
    }
}

/// Merge per-source stream lists into one list with unique info hashes.
///
/// Works on plain or classified streams alike.
pub fn merge<T: AsRef<Stream>>(per_source: Vec<Vec<T>>) -> Vec<T> {
    let total = per_source.iter().map(Vec::len).sum();
    let mut seen = HashSet::with_capacity(total);
    let mut merged = Vec::with_capacity(total);

    for streams in per_source {
        for (index, item) in streams.into_iter().enumerate() {
            let stream = item.as_ref();
            if seen.insert(DedupKey::for_stream(stream, index)) {
                merged.push(item);
            } else {
                tracing::trace!(
                    provider = %stream.provider_id,
                    hash = ?stream.info_hash,
                    "Dropping duplicate stream"
                );
            }
        }
    }

    merged
}
