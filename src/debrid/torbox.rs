//! `TorBox` debrid API client.

use std::collections::{HashMap, HashSet};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

use super::{DebridError, DebridFile, DebridService, DebridTorrent};
use crate::fetch::{FetchError, FetchOptions, ResilientFetcher};
use crate::stream::InfoHash;

pub const TORBOX_API_BASE: &str = "https://api.torbox.app";

/// Client for the `TorBox` v1 API, authenticated with a bearer token.
pub struct TorboxClient {
    fetcher: Arc<ResilientFetcher>,
    base_url: String,
    token: String,
    timeout: Duration,
}

impl TorboxClient {
    pub fn new(fetcher: Arc<ResilientFetcher>, token: impl Into<String>) -> Self {
        Self::with_base_url(fetcher, TORBOX_API_BASE, token)
    }

    pub fn with_base_url(
        fetcher: Arc<ResilientFetcher>,
        base_url: impl Into<String>,
        token: impl Into<String>,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
            timeout: Duration::from_secs(60),
        }
    }

    /// Bound on one whole API call, retries and backoff included.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Credentialed calls never go through relay proxies.
    fn options(&self) -> FetchOptions {
        FetchOptions::default()
            .without_proxies()
            .with_attempt_timeout(self.timeout)
            .with_header("Authorization", format!("Bearer {}", self.token))
    }

    async fn bounded<T>(
        &self,
        url: &str,
        call: impl Future<Output = Result<T, DebridError>>,
    ) -> Result<T, DebridError> {
        match tokio::time::timeout(self.timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DebridError::Fetch(FetchError::Timeout {
                url: url.to_string(),
                timeout: self.timeout,
            })),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/v1/api/torrents/{path}", self.base_url)
    }

    /// Redirecting download link, directly playable by a media player.
    fn download_link(&self, torrent_id: u64, file_id: u32) -> String {
        format!(
            "{}?token={}&torrent_id={torrent_id}&file_id={file_id}&redirect=true",
            self.endpoint("requestdl"),
            urlencoding::encode(&self.token)
        )
    }

    async fn get<T: DeserializeOwned>(
        &self,
        url: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<T>, DebridError> {
        self.bounded(url, async {
            let response = self.fetcher.fetch(url, &self.options(), cancel).await?;
            let envelope: Envelope<T> = response.json()?;
            envelope.into_data()
        })
        .await
    }

    async fn torrent(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Option<TorboxTorrent>, DebridError> {
        let url = format!(
            "{}?id={}&bypass_cache=true",
            self.endpoint("mylist"),
            urlencoding::encode(id)
        );
        self.get(&url, cancel).await
    }
}

#[async_trait]
impl DebridService for TorboxClient {
    fn name(&self) -> &'static str {
        "torbox"
    }

    #[instrument(skip(self, hashes, cancel), fields(count = hashes.len()))]
    async fn batch_check_cached(
        &self,
        hashes: &[InfoHash],
        cancel: &CancellationToken,
    ) -> Result<HashMap<InfoHash, bool>, DebridError> {
        if hashes.is_empty() {
            return Ok(HashMap::new());
        }

        let joined = hashes
            .iter()
            .map(InfoHash::as_str)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!(
            "{}?hash={joined}&format=object&list_files=false",
            self.endpoint("checkcached")
        );

        // Uncached hashes are simply absent from the object.
        let data: Option<serde_json::Value> = self.get(&url, cancel).await?;
        let cached: HashSet<InfoHash> = data
            .as_ref()
            .and_then(serde_json::Value::as_object)
            .map(|object| object.keys().filter_map(|k| InfoHash::parse(k).ok()).collect())
            .unwrap_or_default();

        debug!(cached = cached.len(), "Cache check complete");
        Ok(hashes
            .iter()
            .map(|hash| (hash.clone(), cached.contains(hash)))
            .collect())
    }

    async fn add_torrent(
        &self,
        hash: &InfoHash,
        cancel: &CancellationToken,
    ) -> Result<DebridTorrent, DebridError> {
        let url = self.endpoint("createtorrent");
        let form = reqwest::multipart::Form::new().text("magnet", hash.magnet());
        let request = self
            .fetcher
            .client()
            .post(&url)
            .bearer_auth(&self.token)
            .multipart(form);

        let created = self
            .bounded(&url, async {
                let response = self.fetcher.execute(request, &self.options(), cancel).await?;
                let envelope: Envelope<CreatedTorrent> = response.json()?;
                envelope.into_data()
            })
            .await?
            .ok_or_else(|| DebridError::Api("createtorrent returned no data".to_string()))?;

        Ok(DebridTorrent {
            id: created.torrent_id.to_string(),
            name: created.name.unwrap_or_default(),
            size: 0,
            hash: InfoHash::parse_opt(created.hash.as_deref()).or_else(|| Some(hash.clone())),
        })
    }

    async fn resolve_stream_url(
        &self,
        hash: &InfoHash,
        file_index: Option<u32>,
        cancel: &CancellationToken,
    ) -> Result<Option<String>, DebridError> {
        let list: Vec<TorboxTorrent> = self
            .get(&format!("{}?bypass_cache=true", self.endpoint("mylist")), cancel)
            .await?
            .unwrap_or_default();

        let Some(torrent) = list
            .into_iter()
            .find(|t| InfoHash::parse(&t.hash).is_ok_and(|h| &h == hash))
        else {
            return Ok(None);
        };

        let Some(file) = torrent.pick_file(file_index) else {
            return Ok(None);
        };

        let url = format!(
            "{}?token={}&torrent_id={}&file_id={}",
            self.endpoint("requestdl"),
            urlencoding::encode(&self.token),
            torrent.id,
            file.id
        );
        self.get::<String>(&url, cancel).await
    }

    async fn list_user_torrents(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Vec<DebridTorrent>, DebridError> {
        let list: Vec<TorboxTorrent> = self
            .get(&format!("{}?bypass_cache=true", self.endpoint("mylist")), cancel)
            .await?
            .unwrap_or_default();

        Ok(list
            .into_iter()
            .map(|t| DebridTorrent {
                id: t.id.to_string(),
                hash: InfoHash::parse(&t.hash).ok(),
                name: t.name,
                size: t.size,
            })
            .collect())
    }

    async fn get_torrent_files(
        &self,
        id: &str,
        cancel: &CancellationToken,
    ) -> Result<Vec<DebridFile>, DebridError> {
        let Some(torrent) = self.torrent(id, cancel).await? else {
            return Ok(Vec::new());
        };

        Ok(torrent
            .files
            .iter()
            .map(|f| DebridFile {
                index: f.id,
                name: f.short_name.clone().unwrap_or_else(|| f.name.clone()),
                size: f.size,
                stream_url: self.download_link(torrent.id, f.id),
            })
            .collect())
    }
}

// Serde structures for TorBox API responses

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
    data: Option<T>,
}

impl<T> Envelope<T> {
    fn into_data(self) -> Result<Option<T>, DebridError> {
        if self.success {
            return Ok(self.data);
        }
        let message = self
            .error
            .or(self.detail)
            .unwrap_or_else(|| "request unsuccessful".to_string());
        if message.contains("AUTH") {
            Err(DebridError::Unauthorized)
        } else {
            Err(DebridError::Api(message))
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreatedTorrent {
    torrent_id: u64,
    name: Option<String>,
    hash: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TorboxTorrent {
    id: u64,
    hash: String,
    #[serde(default)]
    name: String,
    #[serde(default)]
    size: u64,
    #[serde(default)]
    files: Vec<TorboxFile>,
}

impl TorboxTorrent {
    /// Requested file, or the largest one.
    fn pick_file(&self, file_index: Option<u32>) -> Option<&TorboxFile> {
        match file_index {
            Some(index) => self.files.iter().find(|f| f.id == index),
            None => self.files.iter().max_by_key(|f| f.size),
        }
    }
}

#[derive(Debug, Deserialize)]
struct TorboxFile {
    id: u32,
    #[serde(default)]
    name: String,
    short_name: Option<String>,
    #[serde(default)]
    size: u64,
}
