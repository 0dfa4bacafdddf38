//! Resilient HTTP fetch primitive.
//!
//! Features:
//! - Ordered relay-proxy failover (selected proxy or direct first)
//! - Per-attempt timeouts, no composed global deadline
//! - HTML-error-page detection on JSON endpoints, body buffered once
//! - Direct retry loop with exponential backoff, skipped on 4xx
//! - Cooperative cancellation on every attempt and backoff sleep

pub mod proxy;
pub mod sniff;

use std::time::Duration;

use bytes::Bytes;
use rand::Rng;
use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Request, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

pub use proxy::{ProxyRoute, Route};

/// Default bound on a single attempt.
pub const DEFAULT_ATTEMPT_TIMEOUT: Duration = Duration::from_secs(8);

/// Transient fetch failures. Source adapters absorb these into empty results.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {url} timed out after {timeout:?}")]
    Timeout { url: String, timeout: Duration },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("HTTP {status} from {url}")]
    Status { status: StatusCode, url: String },

    #[error("invalid content from {url}: {reason}")]
    InvalidContent { url: String, reason: String },

    #[error("response from {url} is not the expected JSON: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("request cancelled")]
    Cancelled,

    #[error("no fetch attempt was made for {0}")]
    NoAttempts(String),
}

impl FetchError {
    /// HTTP status, if the failure was a non-2xx response.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// 4xx responses are not retried.
    pub fn is_client_error(&self) -> bool {
        self.status().is_some_and(|s| s.is_client_error())
    }
}

/// Per-call fetch behavior.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    pub attempt_timeout: Duration,
    /// Attempts in the direct retry loop that follows the proxy pass.
    pub direct_retries: u32,
    /// First backoff delay; doubles on every retry.
    pub backoff_base: Duration,
    /// Reject HTML bodies and `text/html` responses.
    pub expect_json: bool,
    /// Disable for credentialed calls that must not go through relays.
    pub use_proxies: bool,
    pub headers: Vec<(String, String)>,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            attempt_timeout: DEFAULT_ATTEMPT_TIMEOUT,
            direct_retries: 3,
            backoff_base: Duration::from_millis(250),
            expect_json: true,
            use_proxies: true,
            headers: Vec::new(),
        }
    }
}

impl FetchOptions {
    #[must_use]
    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_direct_retries(mut self, retries: u32) -> Self {
        self.direct_retries = retries;
        self
    }

    #[must_use]
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn without_proxies(mut self) -> Self {
        self.use_proxies = false;
        self
    }

    #[must_use]
    pub fn accept_any_content(mut self) -> Self {
        self.expect_json = false;
        self
    }

    /// Delay before retry `attempt` (0-based), with up to 25% jitter.
    fn backoff(&self, attempt: u32) -> Duration {
        let scaled = self.backoff_base.saturating_mul(1 << attempt.min(6));
        let jitter_ms = u64::try_from(self.backoff_base.as_millis() / 4).unwrap_or(0);
        let jitter = rand::thread_rng().gen_range(0..=jitter_ms);
        scaled + Duration::from_millis(jitter)
    }
}

/// A successful, validated response with its body already buffered.
///
/// The body can be read any number of times.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: StatusCode,
    pub content_type: Option<String>,
    pub body: Bytes,
    /// URL actually requested (after proxy rewriting).
    pub url: String,
    /// Label of the route that produced the response.
    pub route: String,
}

impl FetchResponse {
    pub fn bytes(&self) -> &Bytes {
        &self.body
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T, FetchError> {
        serde_json::from_slice(&self.body).map_err(|source| FetchError::Decode {
            url: self.url.clone(),
            source,
        })
    }
}

/// HTTP client with proxy failover and retries.
pub struct ResilientFetcher {
    client: Client,
    proxies: Vec<ProxyRoute>,
    selected_proxy: Option<String>,
}

impl ResilientFetcher {
    /// Fetcher without relay proxies.
    pub fn new() -> Result<Self, FetchError> {
        Self::with_proxies(Vec::new(), None)
    }

    /// Fetcher that tries `selected` first, then the remaining `proxies`.
    pub fn with_proxies(
        proxies: Vec<ProxyRoute>,
        selected: Option<String>,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .user_agent(concat!("reelsource/", env!("CARGO_PKG_VERSION")))
            // Keep connections alive for reuse across providers
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .tcp_nodelay(true)
            .use_rustls_tls()
            .brotli(true)
            .gzip(true)
            .deflate(true)
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(10))
            .build()?;

        Ok(Self {
            client,
            proxies,
            selected_proxy: selected,
        })
    }

    pub fn proxies(&self) -> &[ProxyRoute] {
        &self.proxies
    }

    /// Underlying reqwest client, for building non-GET requests.
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// GET `url` through the proxy plan, then the direct retry loop.
    ///
    /// Returns the first response that succeeds and passes content
    /// validation, otherwise the last error seen.
    #[instrument(skip(self, options, cancel), fields(url = %url))]
    pub async fn fetch(
        &self,
        url: &str,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, FetchError> {
        let plan = if options.use_proxies {
            proxy::attempt_plan(&self.proxies, self.selected_proxy.as_deref())
        } else {
            vec![Route::Direct]
        };

        let mut last_error = None;
        let mut direct_rejection = None;
        for route in &plan {
            match self.attempt(url, *route, options, cancel).await {
                Ok(response) => return Ok(response),
                Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
                Err(e) if *route == Route::Direct && e.is_client_error() => {
                    // Geo and CORS blocks show up as 4xx; relays can still succeed
                    warn!(error = %e, "Direct fetch rejected, trying relays");
                    direct_rejection = Some(e);
                }
                Err(e) => {
                    warn!(route = route.label(), error = %e, "Fetch attempt failed");
                    last_error = Some(e);
                }
            }
        }

        // Direct 4xx is final once the relays are exhausted
        if let Some(e) = direct_rejection {
            return Err(e);
        }

        for attempt in 0..options.direct_retries {
            let delay = options.backoff(attempt);
            debug!(attempt, ?delay, "Backing off before direct retry");
            tokio::select! {
                () = cancel.cancelled() => return Err(FetchError::Cancelled),
                () = tokio::time::sleep(delay) => {}
            }

            match self.attempt(url, Route::Direct, options, cancel).await {
                Ok(response) => return Ok(response),
                Err(FetchError::Cancelled) => return Err(FetchError::Cancelled),
                Err(e) if e.is_client_error() => {
                    warn!(attempt, error = %e, "Direct fetch rejected, not retrying");
                    return Err(e);
                }
                Err(e) => {
                    warn!(attempt, error = %e, "Direct fetch failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| FetchError::NoAttempts(url.to_string())))
    }

    /// Run one prepared request (e.g. a POST) as a single bounded attempt.
    pub async fn execute(
        &self,
        request: RequestBuilder,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }
        let request = request.build()?;
        self.run(request, Route::Direct.label(), options, cancel).await
    }

    async fn attempt(
        &self,
        url: &str,
        route: Route<'_>,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, FetchError> {
        if cancel.is_cancelled() {
            return Err(FetchError::Cancelled);
        }

        let target = route.target(url);
        let mut builder = self.client.get(&target);
        for (name, value) in &options.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        let request = builder.build()?;
        self.run(request, route.label(), options, cancel).await
    }

    async fn run(
        &self,
        request: Request,
        route: &str,
        options: &FetchOptions,
        cancel: &CancellationToken,
    ) -> Result<FetchResponse, FetchError> {
        let url = request.url().to_string();

        let exchange = async {
            let response = self.client.execute(request).await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status {
                    status,
                    url: url.clone(),
                });
            }

            let content_type = response
                .headers()
                .get(CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);
            let body = response.bytes().await?;

            if options.expect_json {
                if let Some(reason) = sniff::reject_non_json(content_type.as_deref(), &body) {
                    return Err(FetchError::InvalidContent {
                        url: url.clone(),
                        reason,
                    });
                }
            }

            debug!(%status, route, bytes = body.len(), "Response received");
            Ok::<_, FetchError>(FetchResponse {
                status,
                content_type,
                body,
                url: url.clone(),
                route: route.to_string(),
            })
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(FetchError::Cancelled),
            result = tokio::time::timeout(options.attempt_timeout, exchange) => match result {
                Ok(inner) => inner,
                Err(_) => Err(FetchError::Timeout {
                    url: url.clone(),
                    timeout: options.attempt_timeout,
                }),
            },
        }
    }
}
