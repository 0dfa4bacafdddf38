//! Debrid cache service contract.
//!
//! Only the query/lookup side of the service is consumed: cache checks,
//! adding a torrent by hash, listing the user's torrents and files, and
//! resolving a file to a direct URL. Download lifecycle management stays
//! with the service.

pub mod torbox;

use std::collections::HashMap;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::fetch::FetchError;
use crate::stream::InfoHash;

pub use torbox::TorboxClient;

/// Debrid service failures.
#[derive(Debug, Error)]
pub enum DebridError {
    #[error("debrid credential rejected")]
    Unauthorized,

    #[error("debrid API error: {0}")]
    Api(String),

    #[error(transparent)]
    Fetch(FetchError),
}

impl From<FetchError> for DebridError {
    fn from(e: FetchError) -> Self {
        match e.status() {
            Some(StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => DebridError::Unauthorized,
            _ => DebridError::Fetch(e),
        }
    }
}

/// A torrent known to the debrid service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebridTorrent {
    pub id: String,
    pub name: String,
    pub size: u64,
    pub hash: Option<InfoHash>,
}

/// A file inside a debrid torrent with its playable URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebridFile {
    pub index: u32,
    pub name: String,
    pub size: u64,
    pub stream_url: String,
}

/// Query contract of a debrid cache service.
#[async_trait]
pub trait DebridService: Send + Sync {
    /// Short lowercase service name (e.g. `"torbox"`).
    fn name(&self) -> &'static str;

    /// Largest number of hashes accepted by one cache check.
    fn max_batch(&self) -> usize {
        100
    }

    /// Cached status for every hash in one call. Every requested hash is
    /// present in the returned map.
    async fn batch_check_cached(
        &self,
        hashes: &[InfoHash],
        cancel: &CancellationToken,
    ) -> Result<HashMap<InfoHash, bool>, DebridError>;

    async fn add_torrent(
        &self,
        hash: &InfoHash,
        cancel: &CancellationToken,
    ) -> Result<DebridTorrent, DebridError>;

    /// Direct URL for a file of a torrent already in the user's library,
    /// `None` if the torrent is not there.
    async fn resolve_stream_url(
        &self,
        hash: &InfoHash,
        file_index: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, DebridError>;

    async fn list_user_torrents(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<DebridTorrent>, DebridError>;

    async fn get_torrent_files(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DebridFile>, DebridError>;
}
