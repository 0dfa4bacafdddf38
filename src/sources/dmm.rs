//! DMM hash-cache source.
//!
//! `GET {base}/dmm/filtered?ImdbId=..&Season=..&Episode=..[&onlyCached=true]`
//! returns structured records, either as a bare array or wrapped in
//! `{ "results": [...] }`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use super::addon::join_url;
use super::{ContentQuery, RawPayload, SourceAdapter};
use crate::fetch::{FetchError, FetchOptions, ResilientFetcher};
use crate::stream::{InfoHash, Stream};

pub const DMM_ID: &str = "dmm";
pub const DMM_NAME: &str = "DMM";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DmmRecord {
    #[serde(default, alias = "title", alias = "rawTitle")]
    pub raw_title: String,
    #[serde(default, alias = "hash", alias = "infoHash")]
    pub info_hash: String,
    #[serde(default)]
    pub resolution: Option<String>,
    /// Bytes.
    #[serde(default, alias = "bytes")]
    pub size: Option<u64>,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub audio: Vec<String>,
    #[serde(default)]
    pub hdr: Vec<String>,
    #[serde(default)]
    pub languages: Vec<String>,
    #[serde(default)]
    pub group: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DmmResponse {
    Bare(Vec<DmmRecord>),
    Wrapped {
        #[serde(default)]
        results: Vec<DmmRecord>,
    },
}

impl DmmResponse {
    fn into_records(self) -> Vec<DmmRecord> {
        match self {
            DmmResponse::Bare(records) | DmmResponse::Wrapped { results: records } => records,
        }
    }
}

pub fn parse_records(body: &[u8]) -> Result<Vec<DmmRecord>, serde_json::Error> {
    Ok(serde_json::from_slice::<DmmResponse>(body)?.into_records())
}

pub struct DmmSource {
    fetcher: Arc<ResilientFetcher>,
    base_url: String,
    only_cached: bool,
    options: FetchOptions,
    timeout: Duration,
}

impl DmmSource {
    pub fn new(
        fetcher: Arc<ResilientFetcher>,
        base_url: impl Into<String>,
        only_cached: bool,
        options: FetchOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            only_cached,
            options,
            timeout,
        }
    }

    pub fn url_for(&self, query: &ContentQuery) -> String {
        let mut url = format!(
            "{}?ImdbId={}",
            join_url(&self.base_url, "dmm/filtered"),
            urlencoding::encode(&query.imdb_id)
        );
        if let (Some(season), Some(episode)) = (query.season, query.episode) {
            url.push_str(&format!("&Season={season}&Episode={episode}"));
        }
        if self.only_cached {
            url.push_str("&onlyCached=true");
        }
        url
    }
}

#[async_trait]
impl SourceAdapter for DmmSource {
    fn id(&self) -> &str {
        DMM_ID
    }

    fn name(&self) -> &str {
        DMM_NAME
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn fetch_raw(
        &self,
        query: &ContentQuery,
        cancel: &CancellationToken,
    ) -> Result<RawPayload, FetchError> {
        let url = self.url_for(query);
        let response = self.fetcher.fetch(&url, &self.options, cancel).await?;
        let records =
            parse_records(response.bytes()).map_err(|source| FetchError::Decode { url, source })?;

        Ok(RawPayload::DmmCache {
            records,
            only_cached: self.only_cached,
        })
    }
}

/// Records become torrent streams. Structured fields are appended to the
/// classifier text so they count even when the title omits them.
pub(crate) fn normalize(records: Vec<DmmRecord>, only_cached: bool) -> Vec<Stream> {
    records
        .into_iter()
        .filter_map(|record| {
            let Ok(hash) = InfoHash::parse(&record.info_hash) else {
                trace!(title = %record.raw_title, "Skipping DMM record with bad hash");
                return None;
            };

            let mut lines = vec![record.raw_title.clone()];
            let tags: Vec<&str> = record
                .resolution
                .iter()
                .chain(&record.codec)
                .chain(&record.hdr)
                .chain(&record.audio)
                .chain(&record.languages)
                .map(String::as_str)
                .collect();
            if !tags.is_empty() {
                lines.push(tags.join(" "));
            }
            if let Some(group) = &record.group {
                lines.push(group.clone());
            }

            Some(
                Stream::torrent(hash, DMM_ID, DMM_NAME, record.raw_title, lines.join("\n"))
                    .with_size_hint(record.size)
                    .with_upstream_cached(only_cached.then_some(true)),
            )
        })
        .collect()
}
