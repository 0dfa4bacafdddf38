//! Installed third-party provider source.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::addon::{self, join_url};
use super::{ContentQuery, RawPayload, SourceAdapter};
use crate::fetch::{FetchError, FetchOptions, ResilientFetcher};
use crate::registry::Provider;

pub struct ThirdPartySource {
    fetcher: Arc<ResilientFetcher>,
    provider: Provider,
    options: FetchOptions,
    timeout: Duration,
}

impl ThirdPartySource {
    pub fn new(
        fetcher: Arc<ResilientFetcher>,
        provider: Provider,
        options: FetchOptions,
        timeout: Duration,
    ) -> Self {
        Self {
            fetcher,
            provider,
            options,
            timeout,
        }
    }

    pub fn url_for(&self, query: &ContentQuery) -> String {
        join_url(&self.provider.base_url, &query.stream_path())
    }
}

#[async_trait]
impl SourceAdapter for ThirdPartySource {
    fn id(&self) -> &str {
        &self.provider.id
    }

    fn name(&self) -> &str {
        &self.provider.name
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

        Ok(RawPayload::ThirdParty {
            provider_id: self.provider.id.clone(),
            provider_name: self.provider.name.clone(),
            streams,
        })
    }
}
