//! Trait definition and configuration types for metadata providers.
//!
//! This module defines the [`MetadataProvider`] trait that every catalog
//! adapter (TMDB, OMDb, MusicBrainz, Fanart.tv, etc.) implements, along with
//! the credentials each one is built from and the hints a caller can attach to
//! a search.

use async_trait::async_trait;
use metaforged_common::{ContentKind, MediaSearchResult, Result, StandardMetadata};
use serde::{Deserialize, Serialize};

use super::rate_limit::RateLimit;

// ---------------------------------------------------------------------------
// Provider configuration
// ---------------------------------------------------------------------------

/// Credentials and budget for one provider.
///
/// Built once when the manager is created and never changed afterwards. The
/// [`Debug`] output redacts every credential, and the type deliberately does
/// not implement `Serialize`.
#[derive(Clone)]
pub struct ProviderConfig {
    enabled: bool,
    api_key: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    user_agent: Option<String>,
    base_url: Option<String>,
    rate_limit: RateLimit,
}

impl ProviderConfig {
    /// An enabled configuration with no credentials.
    pub fn new(rate_limit: RateLimit) -> Self {
        Self {
            enabled: true,
            api_key: None,
            client_id: None,
            client_secret: None,
            user_agent: None,
            base_url: None,
            rate_limit,
        }
    }

    /// Enable or disable the provider.
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Set the API key.
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the client id (consumer key).
    pub fn with_client_id(mut self, id: impl Into<String>) -> Self {
        self.client_id = Some(id.into());
        self
    }

    /// Set the client secret (consumer secret).
    pub fn with_client_secret(mut self, secret: impl Into<String>) -> Self {
        self.client_secret = Some(secret.into());
        self
    }

    /// Set the User-Agent sent to the provider.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Point the provider at a different API root (mirror or test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Whether the provider is switched on.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The API key, if one is set and non-blank.
    pub fn api_key(&self) -> Option<&str> {
        present(&self.api_key)
    }

    /// The client id, if one is set and non-blank.
    pub fn client_id(&self) -> Option<&str> {
        present(&self.client_id)
    }

    /// The client secret, if one is set and non-blank.
    pub fn client_secret(&self) -> Option<&str> {
        present(&self.client_secret)
    }

    /// The User-Agent, if one is set and non-blank.
    pub fn user_agent(&self) -> Option<&str> {
        present(&self.user_agent)
    }

    /// The API root override, without a trailing slash.
    pub fn base_url(&self) -> Option<&str> {
        present(&self.base_url).map(|url| url.trim_end_matches('/'))
    }

    /// The request budget.
    pub fn rate_limit(&self) -> RateLimit {
        self.rate_limit
    }
}

fn present(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn redacted(value: Option<&str>) -> &'static str {
            if value.is_some() {
                "<redacted>"
            } else {
                "<unset>"
            }
        }

        f.debug_struct("ProviderConfig")
            .field("enabled", &self.enabled)
            .field("api_key", &redacted(self.api_key()))
            .field("client_id", &redacted(self.client_id()))
            .field("client_secret", &redacted(self.client_secret()))
            .field("user_agent", &self.user_agent())
            .field("base_url", &self.base_url())
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

// ---------------------------------------------------------------------------
// Search hints
// ---------------------------------------------------------------------------

/// Optional context that narrows a search or detail lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchHints {
    /// What kind of item is being looked for.
    #[serde(rename = "type", default)]
    pub kind: Option<ContentKind>,
    /// Release year.
    #[serde(default)]
    pub year: Option<u16>,
    /// Performing artist, for music lookups.
    #[serde(default)]
    pub artist: Option<String>,
    /// Known TMDB id (used by artwork providers).
    #[serde(default)]
    pub tmdb_id: Option<String>,
    /// Known IMDb id (fan-art accepts it for films).
    #[serde(default)]
    pub imdb_id: Option<String>,
    /// Preferred language as an ISO-639-1 code or locale tag.
    #[serde(default)]
    pub language: Option<String>,
    /// Upper bound on returned matches.
    #[serde(default)]
    pub limit: Option<usize>,
}

impl SearchHints {
    /// Hints carrying only a content kind.
    pub fn kind(kind: ContentKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Add a release year.
    pub fn with_year(mut self, year: u16) -> Self {
        self.year = Some(year);
        self
    }

    /// Add an artist name.
    pub fn with_artist(mut self, artist: impl Into<String>) -> Self {
        self.artist = Some(artist.into());
        self
    }

    /// Add a known TMDB id.
    pub fn with_tmdb_id(mut self, id: impl Into<String>) -> Self {
        self.tmdb_id = Some(id.into());
        self
    }

    /// Add a known IMDb id.
    pub fn with_imdb_id(mut self, id: impl Into<String>) -> Self {
        self.imdb_id = Some(id.into());
        self
    }

    /// Apply `limit` to a list of records.
    pub fn truncate<T>(&self, mut items: Vec<T>) -> Vec<T> {
        if let Some(limit) = self.limit {
            items.truncate(limit);
        }
        items
    }
}

// ---------------------------------------------------------------------------
// Provider trait
// ---------------------------------------------------------------------------

/// Async trait that all metadata providers must implement.
///
/// Each provider wraps a single external API and normalizes its payloads into
/// [`StandardMetadata`]. Providers are shared behind an `Arc` across tasks.
///
/// "No results" is never an error: `search` returns an empty
/// [`MediaSearchResult`] and `get_details` returns `Ok(None)`. Calling either
/// method on an unavailable provider returns [`ProviderError::Unavailable`].
///
/// [`ProviderError::Unavailable`]: metaforged_common::ProviderError::Unavailable
#[async_trait]
pub trait MetadataProvider: Send + Sync {
    /// Short, lowercase identifier for this provider (e.g. `"tmdb"`).
    fn name(&self) -> &'static str;

    /// Returns `true` when the provider is enabled and every credential it
    /// needs is configured.
    fn is_available(&self) -> bool;

    /// Search the provider's catalog for `query`.
    async fn search(&self, query: &str, hints: &SearchHints) -> Result<MediaSearchResult>;

    /// Fetch one item by the provider's native id.
    async fn get_details(
        &self,
        source_id: &str,
        hints: &SearchHints,
    ) -> Result<Option<StandardMetadata>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_output_redacts_credentials() {
        let config = ProviderConfig::new(RateLimit::new(1, 1_000))
            .with_api_key("sk-very-secret")
            .with_client_id("client-123")
            .with_client_secret("hunter2");

        let debug = format!("{config:?}");
        assert!(!debug.contains("sk-very-secret"));
        assert!(!debug.contains("client-123"));
        assert!(!debug.contains("hunter2"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn blank_credentials_count_as_missing() {
        let config = ProviderConfig::new(RateLimit::new(1, 1_000))
            .with_api_key("   ")
            .with_base_url("http://localhost:9000/");

        assert_eq!(config.api_key(), None);
        assert_eq!(config.base_url(), Some("http://localhost:9000"));
    }

    #[test]
    fn hints_deserialize_type_field() {
        let hints: SearchHints =
            serde_json::from_str(r#"{"type": "movie", "year": 2010}"#).unwrap();
        assert_eq!(hints.kind, Some(ContentKind::Movie));
        assert_eq!(hints.year, Some(2010));
        assert_eq!(hints.artist, None);
    }

    #[test]
    fn hints_truncate() {
        let hints = SearchHints {
            limit: Some(2),
            ..SearchHints::default()
        };
        assert_eq!(hints.truncate(vec![1, 2, 3]), vec![1, 2]);
        assert_eq!(SearchHints::default().truncate(vec![1, 2, 3]), vec![1, 2, 3]);
    }
}
