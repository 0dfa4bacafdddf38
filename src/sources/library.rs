//! Files already in the user's debrid library, as direct-URL streams.

use std::collections::BTreeSet;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::RawPayload;
use crate::classify::join_text;
use crate::debrid::{DebridError, DebridFile, DebridService, DebridTorrent};
use crate::stream::{InfoHash, Stream};

pub const LIBRARY_ID: &str = "debrid-library";
pub const LIBRARY_NAME: &str = "Debrid library";

/// Library torrents matching `hashes`, expanded to one stream per file.
pub async fn debrid_library(
    debrid: &dyn DebridService,
    hashes: &BTreeSet<InfoHash>,
    cancel: &CancellationToken,
) -> Result<Vec<Stream>, DebridError> {
    let torrents = debrid.list_user_torrents(cancel).await?;

    let mut streams = Vec::new();
    for torrent in torrents {
        let wanted = torrent.hash.as_ref().is_some_and(|h| hashes.contains(h));
        if !wanted {
            continue;
        }
        let files = debrid.get_torrent_files(&torrent.id, cancel).await?;
        streams.extend(RawPayload::DirectDebridUrl { torrent, files }.normalize());
    }

    debug!(count = streams.len(), "Library streams resolved");
    Ok(streams)
}

pub(crate) fn normalize(torrent: &DebridTorrent, files: Vec<DebridFile>) -> Vec<Stream> {
    files
        .into_iter()
        .map(|file| {
            let raw_text = join_text([Some(torrent.name.as_str()), Some(file.name.as_str())]);
            Stream::direct(file.stream_url, LIBRARY_ID, LIBRARY_NAME, file.name.clone(), raw_text)
                .with_info_hash(torrent.hash.clone())
                .with_file_index(Some(file.index))
                .with_filename(Some(file.name))
                .with_size_hint(Some(file.size))
                .with_upstream_cached(Some(true))
        })
        .collect()
}
