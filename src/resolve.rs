//! Turning torrent streams into playable direct URLs through the debrid
//! service.

use std::collections::BTreeSet;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument};

use crate::debrid::{DebridError, DebridService};
use crate::sources::{debrid_library, RawPayload};
use crate::stream::{InfoHash, SourceKind, Stream};

pub struct Resolver {
    debrid: Arc<dyn DebridService>,
}

impl Resolver {
    pub fn new(debrid: Arc<dyn DebridService>) -> Self {
        Self { debrid }
    }

    /// Direct-URL streams for `stream`.
    ///
    /// Direct-URL streams are returned as they are. Torrents already in the
    /// library resolve to one URL; otherwise the torrent is added and its
    /// files are listed, narrowed to `file_index` when the stream has one.
    pub async fn resolve(
        &self,
        stream: &Stream,
        cancel: &CancellationToken,
    ) -> Result<Vec<Stream>, DebridError> {
        match (stream.source_kind, &stream.info_hash) {
            (SourceKind::Torrent, Some(hash)) => {
                let mut resolved = self.resolve_hash(hash, stream.file_index, cancel).await?;
                for s in &mut resolved {
                    if s.filename.is_none() {
                        s.filename.clone_from(&stream.filename);
                    }
                }
                Ok(resolved)
            }
            _ => Ok(vec![stream.clone()]),
        }
    }

    #[instrument(skip(self, cancel), fields(hash = %hash))]
    pub async fn resolve_hash(
        &self,
        hash: &InfoHash,
        file_index: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Stream>, DebridError> {
        if let Some(url) = self.debrid.resolve_stream_url(hash, file_index, cancel).await? {
            debug!("Resolved from library");
            return Ok(vec![Stream::direct(
                url,
                self.debrid.name(),
                self.debrid.name(),
                hash.as_str(),
                hash.as_str(),
            )
            .with_info_hash(Some(hash.clone()))
            .with_file_index(file_index)
            .with_upstream_cached(Some(true))]);
        }

        let torrent = self.debrid.add_torrent(hash, cancel).await?;
        info!(id = %torrent.id, "Torrent added to debrid library");
        let files = self.debrid.get_torrent_files(&torrent.id, cancel).await?;

        let streams = RawPayload::DirectDebridUrl { torrent, files }.normalize();
        Ok(match file_index {
            Some(index) => streams
                .into_iter()
                .filter(|s| s.file_index == Some(index))
                .collect(),
            None => streams,
        })
    }

    /// Files of library torrents whose hashes are in `hashes`.
    pub async fn library_streams(
        &self,
        hashes: &BTreeSet<InfoHash>,
        cancel: &CancellationToken,
    ) -> Result<Vec<Stream>, DebridError> {
        debrid_library(self.debrid.as_ref(), hashes, cancel).await
    }
}
