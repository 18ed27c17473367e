//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which starts a [`MockServer`] and builds a full
//! [`ProviderManager`] whose providers all point at it. Each provider gets its
//! own path prefix (`/tmdb`, `/omdb`, ...), so mocks never collide.

#![allow(dead_code)]

use std::collections::HashMap;

use metaforged::config::{EngineConfig, ProviderSettings};
use metaforged::metadata::manager::is_known_provider;
use metaforged::metadata::{create_manager_with_config, ProviderManager};
use wiremock::MockServer;

pub const PROVIDER_IDS: &[&str] = &[
    "tmdb",
    "omdb",
    "musicbrainz",
    "discogs",
    "fanarttv",
    "openlibrary",
    "comicvine",
];

/// A mock upstream plus a manager wired to it.
pub struct TestHarness {
    pub server: MockServer,
    pub manager: ProviderManager,
}

impl TestHarness {
    /// Start a mock server and build a manager from `env`.
    pub async fn new(env: &[(&str, &str)]) -> Self {
        Self::with_config(env, EngineConfig::default()).await
    }

    /// Like [`new`](Self::new), starting from a custom engine config. Base
    /// URLs are always redirected to the mock server.
    pub async fn with_config(env: &[(&str, &str)], mut engine: EngineConfig) -> Self {
        let server = MockServer::start().await;

        engine.retry.base_delay_ms = 1;
        engine.retry.jitter = false;
        for id in PROVIDER_IDS {
            assert!(is_known_provider(id));
            let settings = engine
                .providers
                .entry(id.to_string())
                .or_insert_with(ProviderSettings::default);
            settings.base_url = Some(format!("{}/{}", server.uri(), id));
        }

        let manager = create_manager_with_config(&env_map(env), &engine);
        Self { server, manager }
    }

    /// Number of requests the mock server has seen so far.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|r| r.len())
            .unwrap_or(0)
    }
}

pub fn env_map(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}
