//! Cached, rate-limited, retrying HTTP fetches.
//!
//! [`RetryingFetcher::fetch_with_cache`] is the only path by which a provider
//! adapter touches the network:
//!
//! 1. A cache hit returns immediately, without a request or a rate-limit slot.
//! 2. Otherwise the provider's [`RateLimiter`] is awaited before every attempt.
//! 3. Transient failures (transport errors, timeouts, HTTP 429 and 5xx) are
//!    retried with exponential backoff; other failures return at once.
//! 4. A successful JSON body is cached and returned.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use metaforged_common::{ProviderError, Result};
use rand::Rng;
use reqwest::header::RETRY_AFTER;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};

use super::cache::ResponseCache;
use super::rate_limit::{RateLimit, RateLimiter};

/// Upper bound on a single outbound request, including reading the body.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest `Retry-After` the fetcher will honour.
const MAX_RETRY_AFTER: Duration = Duration::from_secs(30);

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// How many times to try a request and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry; doubles for each one after.
    pub base_delay: Duration,
    /// Add up to 25% random jitter to each delay.
    pub jitter: bool,
}

impl RetryPolicy {
    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(16);
        let delay = self.base_delay.saturating_mul(1u32 << exponent);
        if !self.jitter {
            return delay;
        }

        let spread = delay.as_millis() as u64 / 4;
        if spread == 0 {
            return delay;
        }
        delay + Duration::from_millis(rand::thread_rng().gen_range(0..=spread))
    }
}

impl RetryPolicy {
    /// Delay after failed attempt `attempt`, stretched to honour a server's
    /// `Retry-After` up to [`MAX_RETRY_AFTER`].
    fn delay_after(&self, attempt: u32, retry_after: Option<Duration>) -> Duration {
        let delay = self.backoff(attempt);
        match retry_after {
            Some(requested) => delay.max(requested.min(MAX_RETRY_AFTER)),
            None => delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_millis(500),
            jitter: true,
        }
    }
}

// ---------------------------------------------------------------------------
// Request options
// ---------------------------------------------------------------------------

/// Query parameters and headers for one GET request.
///
/// Values may carry credentials, so the type has no `Debug` impl and is never
/// logged.
#[derive(Clone, Default)]
pub struct RequestOptions {
    query: Vec<(&'static str, String)>,
    headers: Vec<(&'static str, String)>,
}

impl RequestOptions {
    /// Empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a query parameter.
    pub fn query(mut self, key: &'static str, value: impl Into<String>) -> Self {
        self.query.push((key, value.into()));
        self
    }

    /// Append a query parameter when `value` is present.
    pub fn query_opt(self, key: &'static str, value: Option<impl Into<String>>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    /// Append a header.
    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

// ---------------------------------------------------------------------------
// Shared fetch context
// ---------------------------------------------------------------------------

/// Resources shared by every provider of one manager: the HTTP client, the
/// response cache, the retry policy, and one [`RateLimiter`] per provider.
#[derive(Clone)]
pub struct FetchContext {
    client: Client,
    cache: Arc<ResponseCache<Value>>,
    limiters: Arc<DashMap<&'static str, Arc<RateLimiter>>>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl FetchContext {
    /// Create a context around an existing client and cache.
    pub fn new(
        client: Client,
        cache: Arc<ResponseCache<Value>>,
        retry: RetryPolicy,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            cache,
            limiters: Arc::new(DashMap::new()),
            retry,
            timeout,
        }
    }

    /// Build the shared HTTP client with a default User-Agent and timeout.
    pub fn build_client(user_agent: &str, timeout: Duration) -> Client {
        Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                warn!("Failed to build HTTP client with timeout: {}", e);
                Client::new()
            })
    }

    /// Create a fetcher for `provider`.
    ///
    /// The first call for a provider creates its limiter from `rate_limit`;
    /// later calls reuse that same limiter so the budget stays shared.
    pub fn fetcher(&self, provider: &'static str, rate_limit: RateLimit) -> RetryingFetcher {
        let limiter = self
            .limiters
            .entry(provider)
            .or_insert_with(|| Arc::new(RateLimiter::new(provider, rate_limit)))
            .clone();

        RetryingFetcher {
            provider,
            client: self.client.clone(),
            cache: Arc::clone(&self.cache),
            limiter,
            retry: self.retry,
            timeout: self.timeout,
        }
    }

    /// The shared response cache.
    pub fn cache(&self) -> &Arc<ResponseCache<Value>> {
        &self.cache
    }

    /// The limiter registered for `provider`, if any.
    pub fn limiter(&self, provider: &str) -> Option<Arc<RateLimiter>> {
        self.limiters.get(provider).map(|l| Arc::clone(l.value()))
    }
}

impl Default for FetchContext {
    fn default() -> Self {
        Self::new(
            Self::build_client(crate::config::DEFAULT_USER_AGENT, DEFAULT_TIMEOUT),
            Arc::new(ResponseCache::default()),
            RetryPolicy::default(),
            DEFAULT_TIMEOUT,
        )
    }
}

// ---------------------------------------------------------------------------
// Fetcher
// ---------------------------------------------------------------------------

/// Failed attempt, plus the server's requested back-off if it sent one.
struct AttemptError {
    error: ProviderError,
    retry_after: Option<Duration>,
}

impl From<ProviderError> for AttemptError {
    fn from(error: ProviderError) -> Self {
        Self {
            error,
            retry_after: None,
        }
    }
}

/// One provider's gateway to the network.
pub struct RetryingFetcher {
    provider: &'static str,
    client: Client,
    cache: Arc<ResponseCache<Value>>,
    limiter: Arc<RateLimiter>,
    retry: RetryPolicy,
    timeout: Duration,
}

impl RetryingFetcher {
    /// Return the cached response for `cache_key`, or GET `url` and cache it.
    ///
    /// Failures are never cached, and a stale value is never substituted for
    /// a failed request.
    pub async fn fetch_with_cache(
        &self,
        url: &str,
        options: &RequestOptions,
        cache_key: &str,
    ) -> Result<Value> {
        self.fetch_with_cache_if(url, options, cache_key, |_| true).await
    }

    /// Like [`fetch_with_cache`](Self::fetch_with_cache), but a fetched body
    /// is stored only when `cacheable` accepts it.
    ///
    /// Services that report errors inside an HTTP 200 envelope use this so a
    /// transient error body is returned once and never replayed from cache.
    pub async fn fetch_with_cache_if<F>(
        &self,
        url: &str,
        options: &RequestOptions,
        cache_key: &str,
        cacheable: F,
    ) -> Result<Value>
    where
        F: FnOnce(&Value) -> bool + Send,
    {
        if let Some(cached) = self.cache.get(cache_key) {
            debug!(provider = self.provider, cache_key, "Cache hit");
            return Ok(cached);
        }

        debug!(provider = self.provider, cache_key, "Cache miss");
        let value = self.fetch(url, options).await?;
        if cacheable(&value) {
            self.cache.set(cache_key, value.clone());
        } else {
            debug!(provider = self.provider, cache_key, "Response not cached");
        }
        Ok(value)
    }

    /// GET `url` with rate limiting and retry, bypassing the cache.
    pub async fn fetch(&self, url: &str, options: &RequestOptions) -> Result<Value> {
        let max_attempts = self.retry.max_attempts.max(1);
        let mut attempt = 0u32;

        loop {
            attempt += 1;
            self.limiter.wait_if_needed().await;

            let failure = match self.attempt(url, options).await {
                Ok(value) => return Ok(value),
                Err(failure) => failure,
            };

            if !failure.error.is_retryable() {
                return Err(failure.error);
            }

            if attempt >= max_attempts {
                warn!(
                    provider = self.provider,
                    attempts = attempt,
                    error = %failure.error,
                    "Giving up after retries"
                );
                return Err(ProviderError::Exhausted {
                    provider: self.provider.to_string(),
                    attempts: attempt,
                    last: Box::new(failure.error),
                });
            }

            let delay = self.retry.delay_after(attempt, failure.retry_after);

            warn!(
                provider = self.provider,
                attempt,
                delay_ms = delay.as_millis() as u64,
                error = %failure.error,
                "Transient provider failure, backing off"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// This provider's limiter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Perform a single request and decode its JSON body.
    async fn attempt(
        &self,
        url: &str,
        options: &RequestOptions,
    ) -> std::result::Result<Value, AttemptError> {
        let mut request = self.client.get(url).query(&options.query);
        for (name, value) in &options.headers {
            request = request.header(*name, value);
        }

        let exchange = async {
            let response = request.send().await.map_err(|e| self.transport_error(e))?;
            let status = response.status();

            if !status.is_success() {
                let retry_after = response
                    .headers()
                    .get(RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.trim().parse::<u64>().ok())
                    .map(Duration::from_secs);

                if status == StatusCode::TOO_MANY_REQUESTS {
                    self.limiter.record_throttle();
                }

                return Err(AttemptError {
                    error: ProviderError::Status {
                        provider: self.provider.to_string(),
                        status: status.as_u16(),
                    },
                    retry_after,
                });
            }

            let body = response
                .bytes()
                .await
                .map_err(|e| self.transport_error(e))?;

            let value = serde_json::from_slice::<Value>(&body).map_err(|e| {
                AttemptError::from(ProviderError::decode(self.provider, e.to_string()))
            })?;
            Ok::<Value, AttemptError>(value)
        };

        match tokio::time::timeout(self.timeout, exchange).await {
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                provider: self.provider.to_string(),
            }
            .into()),
        }
    }

    fn transport_error(&self, error: reqwest::Error) -> AttemptError {
        if error.is_timeout() {
            ProviderError::Timeout {
                provider: self.provider.to_string(),
            }
            .into()
        } else if error.is_builder() {
            ProviderError::invalid_request(self.provider, error.to_string()).into()
        } else {
            ProviderError::network(self.provider, error.without_url()).into()
        }
    }
}
