//! Built-in torrent aggregator source.
//!
//! Two endpoints: the plain one, and one with the debrid credential embedded
//! in the path (`{base}/{key}={token}/stream/...`) that only returns streams
//! the debrid service already has cached.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::addon::{self, join_url};
use super::{ContentQuery, RawPayload, SourceAdapter};
use crate::fetch::{FetchError, FetchOptions, ResilientFetcher};

pub const AGGREGATOR_ID: &str = "aggregator";
pub const AGGREGATOR_NAME: &str = "Aggregator";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregatorVariant {
    Unfiltered,
    Prefiltered { token_key: String, credential: String },
}

pub struct AggregatorSource {
    fetcher: Arc<ResilientFetcher>,
    base_url: String,
    variant: AggregatorVariant,
    options: FetchOptions,
    timeout: Duration,
}

impl AggregatorSource {
    pub fn unfiltered(
        fetcher: Arc<ResilientFetcher>,
        base_url: impl Into<String>,
        options: FetchOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            variant: AggregatorVariant::Unfiltered,
            options,
            timeout,
        }
    }

    /// The credential travels in the URL path, so relays are bypassed.
    pub fn prefiltered(
        fetcher: Arc<ResilientFetcher>,
        base_url: impl Into<String>,
        token_key: impl Into<String>,
        credential: impl Into<String>,
        options: FetchOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            base_url: base_url.into(),
            variant: AggregatorVariant::Prefiltered {
                token_key: token_key.into(),
                credential: credential.into(),
            },
            options: options.without_proxies(),
            timeout,
        }
    }

    pub fn variant(&self) -> &AggregatorVariant {
        &self.variant
    }

    pub fn url_for(&self, query: &ContentQuery) -> String {
        match &self.variant {
            AggregatorVariant::Unfiltered => join_url(&self.base_url, &query.stream_path()),
            AggregatorVariant::Prefiltered {
                token_key,
                credential,
            } => join_url(
                &self.base_url,
                &format!(
                    "{token_key}={}/{}",
                    urlencoding::encode(credential),
                    query.stream_path()
                ),
            ),
        }
    }
}

#[async_trait]
impl SourceAdapter for AggregatorSource {
    fn id(&self) -> &str {
        AGGREGATOR_ID
    }

    fn name(&self) -> &str {
        AGGREGATOR_NAME
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
        let streams = addon::parse_streams(response.bytes())
            .map_err(|source| FetchError::Decode { url, source })?;

        Ok(RawPayload::TorrentAggregator {
            provider_id: AGGREGATOR_ID.to_string(),
            provider_name: AGGREGATOR_NAME.to_string(),
            streams,
            prefiltered: matches!(self.variant, AggregatorVariant::Prefiltered { .. }),
        })
    }
}
