//! Metadata provider orchestration.
//!
//! Lookups flow from the [`ProviderManager`] down to the network:
//!
//! - [`manager`] -- Category registry, alias resolution, env-driven wiring.
//! - [`fallback`] -- Ordered first-success search over one category.
//! - [`provider`] -- The [`MetadataProvider`] trait and provider config.
//! - [`providers`] -- One adapter per external catalog (TMDB, OMDb, ...).
//! - [`fetcher`] -- Cached, rate-limited, retrying HTTP fetches.
//! - [`cache`] -- Time-bound response cache.
//! - [`rate_limit`] -- Rolling-window per-provider rate limiter.

pub mod cache;
pub mod fallback;
pub mod fetcher;
pub mod manager;
pub mod provider;
pub mod providers;
pub mod rate_limit;

pub use cache::ResponseCache;
pub use fallback::FallbackChain;
pub use fetcher::{FetchContext, RetryPolicy, RetryingFetcher};
pub use manager::{create_manager_from_env, create_manager_with_config, ProviderManager};
pub use provider::{MetadataProvider, ProviderConfig, SearchHints};
pub use rate_limit::{RateLimit, RateLimiter};
