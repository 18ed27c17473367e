use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::metadata::fetcher::RetryPolicy;
use crate::metadata::rate_limit::RateLimit;

/// User-Agent sent when no provider-specific one is configured.
pub const DEFAULT_USER_AGENT: &str = concat!(
    "metaforged/",
    env!("CARGO_PKG_VERSION"),
    " (+https://github.com/metaforged/metaforged)"
);

/// Non-secret engine settings. Credentials never live here; they come from
/// the environment.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub cache: CacheConfig,

    #[serde(default)]
    pub http: HttpConfig,

    #[serde(default)]
    pub retry: RetryConfig,

    /// Per-provider overrides keyed by provider id (`tmdb`, `discogs`, ...).
    #[serde(default)]
    pub providers: BTreeMap<String, ProviderSettings>,
}

impl EngineConfig {
    /// Settings for one provider, if the file mentions it.
    pub fn provider(&self, id: &str) -> Option<&ProviderSettings> {
        self.providers.get(id)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct CacheConfig {
    /// How long a cached provider response stays fresh
    #[serde(default = "default_ttl_secs")]
    pub ttl_secs: u64,
}

fn default_ttl_secs() -> u64 {
    7 * 24 * 60 * 60
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Upper bound on one outbound request, body included
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RetryConfig {
    /// Total attempts per request, including the first
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Delay before the first retry; doubles on each later one
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_true")]
    pub jitter: bool,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

impl RetryConfig {
    pub fn policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.max_attempts,
            base_delay: Duration::from_millis(self.base_delay_ms),
            jitter: self.jitter,
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            jitter: default_true(),
        }
    }
}

/// Overrides for one provider. Unset fields keep the provider's defaults.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProviderSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Alternate API root (a mirror or a test server)
    #[serde(default)]
    pub base_url: Option<String>,

    #[serde(default)]
    pub max_requests: Option<u32>,

    #[serde(default)]
    pub window_ms: Option<u64>,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: None,
            max_requests: None,
            window_ms: None,
        }
    }
}

impl ProviderSettings {
    /// `default` with whichever budget fields are set replaced.
    pub fn rate_limit(&self, default: RateLimit) -> RateLimit {
        RateLimit::new(
            self.max_requests.unwrap_or(default.max_requests),
            self.window_ms.unwrap_or(default.window_ms),
        )
    }
}
