//! TMDB (The Movie Database) metadata provider.
//!
//! Implements [`MetadataProvider`] against the TMDB v3 REST API.
//!
//! - Movie search by default; TV search when the hints ask for `tv`.
//! - Accepts either a v3 API key (sent as `api_key`) or a v4 read access
//!   token (sent as a bearer token).
//! - Genre ids in search results are mapped to names from TMDB's fixed list.

use async_trait::async_trait;
use metaforged_common::{ContentKind, MediaSearchResult, ProviderError, Result, StandardMetadata};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::metadata::cache::cache_key;
use crate::metadata::fetcher::{FetchContext, RequestOptions, RetryingFetcher};
use crate::metadata::provider::{MetadataProvider, ProviderConfig, SearchHints};
use crate::metadata::rate_limit::RateLimit;

use super::{decode_items, parse_year, path_segment, typed, NativeId};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

const NAME: &str = "tmdb";
const TMDB_BASE_URL: &str = "https://api.themoviedb.org/3";
const TMDB_POSTER_BASE: &str = "https://image.tmdb.org/t/p/w500";
const TMDB_BACKDROP_BASE: &str = "https://image.tmdb.org/t/p/original";

/// TMDB allows roughly 40 requests every 10 seconds.
pub const DEFAULT_RATE_LIMIT: RateLimit = RateLimit::new(40, 10_000);

/// TMDB's movie and TV genre ids.
const GENRES: &[(u64, &str)] = &[
    (12, "Adventure"),
    (14, "Fantasy"),
    (16, "Animation"),
    (18, "Drama"),
    (27, "Horror"),
    (28, "Action"),
    (35, "Comedy"),
    (36, "History"),
    (37, "Western"),
    (53, "Thriller"),
    (80, "Crime"),
    (99, "Documentary"),
    (878, "Science Fiction"),
    (9648, "Mystery"),
    (10402, "Music"),
    (10749, "Romance"),
    (10751, "Family"),
    (10752, "War"),
    (10759, "Action & Adventure"),
    (10762, "Kids"),
    (10763, "News"),
    (10764, "Reality"),
    (10765, "Sci-Fi & Fantasy"),
    (10766, "Soap"),
    (10767, "Talk"),
    (10768, "War & Politics"),
    (10770, "TV Movie"),
];

// ---------------------------------------------------------------------------
// TMDB API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct TmdbSearchResponse {
    #[serde(default)]
    results: Vec<Value>,
    total_results: Option<u64>,
}

/// One search hit; movies use `title`/`release_date`, TV uses
/// `name`/`first_air_date`.
#[derive(Debug, Deserialize)]
struct TmdbSearchResult {
    id: NativeId,
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    #[serde(default)]
    genre_ids: Vec<u64>,
}

#[derive(Debug, Deserialize)]
struct TmdbDetail {
    id: NativeId,
    title: Option<String>,
    name: Option<String>,
    release_date: Option<String>,
    first_air_date: Option<String>,
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    #[serde(default)]
    genres: Vec<TmdbGenre>,
}

#[derive(Debug, Deserialize)]
struct TmdbGenre {
    name: String,
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// TMDB metadata provider.
///
/// # Examples
///
/// ```no_run
/// use metaforged::metadata::fetcher::FetchContext;
/// use metaforged::metadata::provider::ProviderConfig;
/// use metaforged::metadata::providers::{tmdb, TmdbProvider};
///
/// let config = ProviderConfig::new(tmdb::DEFAULT_RATE_LIMIT).with_api_key("your-api-key");
/// let provider = TmdbProvider::new(config, &FetchContext::default());
/// ```
pub struct TmdbProvider {
    config: ProviderConfig,
    fetcher: RetryingFetcher,
    base_url: String,
}

impl TmdbProvider {
    /// Create a TMDB provider from its configuration and the shared context.
    pub fn new(config: ProviderConfig, ctx: &FetchContext) -> Self {
        let fetcher = ctx.fetcher(NAME, config.rate_limit());
        let base_url = config.base_url().unwrap_or(TMDB_BASE_URL).to_string();
        Self {
            config,
            fetcher,
            base_url,
        }
    }

    /// Attach credentials: v4 tokens (JWTs) go in a bearer header, v3 keys in
    /// the query string.
    fn authorize(&self, options: RequestOptions) -> RequestOptions {
        match self.config.api_key() {
            Some(key) if key.starts_with("eyJ") => {
                options.header("Authorization", format!("Bearer {key}"))
            }
            Some(key) => options.query("api_key", key),
            None => options,
        }
    }

    fn ensure_available(&self) -> Result<()> {
        if self.is_available() {
            Ok(())
        } else {
            Err(ProviderError::unavailable(NAME))
        }
    }

    fn normalize(
        kind: ContentKind,
        id: &NativeId,
        title: Option<String>,
        date: Option<&str>,
    ) -> Option<StandardMetadata> {
        StandardMetadata::new(NAME, id.to_string(), kind, title?, parse_year(date))
    }
}

/// Convert a TMDB poster path fragment to a full URL.
fn poster_url(path: Option<String>) -> Option<String> {
    path.map(|p| format!("{TMDB_POSTER_BASE}{p}"))
}

/// Convert a TMDB backdrop path fragment to a full URL.
fn backdrop_url(path: Option<String>) -> Option<String> {
    path.map(|p| format!("{TMDB_BACKDROP_BASE}{p}"))
}

fn genre_names(ids: &[u64]) -> Vec<String> {
    ids.iter()
        .filter_map(|id| GENRES.iter().find(|(g, _)| g == id))
        .map(|(_, name)| name.to_string())
        .collect()
}

fn endpoint_kind(hints: &SearchHints) -> ContentKind {
    match hints.kind {
        Some(ContentKind::Tv) => ContentKind::Tv,
        _ => ContentKind::Movie,
    }
}

#[async_trait]
impl MetadataProvider for TmdbProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.config.is_enabled() && self.config.api_key().is_some()
    }

    async fn search(&self, query: &str, hints: &SearchHints) -> Result<MediaSearchResult> {
        self.ensure_available()?;

        let kind = endpoint_kind(hints);
        let (path, year_param) = match kind {
            ContentKind::Tv => ("/search/tv", "first_air_date_year"),
            _ => ("/search/movie", "year"),
        };

        let year = hints.year.map(|y| y.to_string());
        let options = self
            .authorize(RequestOptions::new())
            .query("query", query.trim())
            .query_opt(year_param, year.clone())
            .query_opt("language", hints.language.clone());

        let key = cache_key(
            NAME,
            kind.as_str(),
            &[
                query,
                year.as_deref().unwrap_or(""),
                hints.language.as_deref().unwrap_or(""),
            ],
        );
        debug!(path, cache_key = %key, "TMDB search");

        let url = format!("{}{path}", self.base_url);
        let fetched = self.fetcher.fetch_with_cache(&url, &options, &key).await;
        let Some(body) = typed::<TmdbSearchResponse>(NAME, fetched)? else {
            return Ok(MediaSearchResult::empty(NAME));
        };

        let records: Vec<StandardMetadata> = decode_items::<TmdbSearchResult>(NAME, body.results)
            .into_iter()
            .filter_map(|r| {
                let title = r.title.or(r.name);
                let date = r.release_date.or(r.first_air_date);
                Self::normalize(kind, &r.id, title, date.as_deref()).map(|m| {
                    m.with_description(r.overview)
                        .with_thumbnail(poster_url(r.poster_path))
                        .with_backdrop(backdrop_url(r.backdrop_path))
                        .with_genres(genre_names(&r.genre_ids))
                })
            })
            .collect();

        Ok(MediaSearchResult::from_records(
            NAME,
            hints.truncate(records),
            body.total_results,
        ))
    }

    async fn get_details(
        &self,
        source_id: &str,
        hints: &SearchHints,
    ) -> Result<Option<StandardMetadata>> {
        self.ensure_available()?;

        let kind = endpoint_kind(hints);
        let segment = match kind {
            ContentKind::Tv => "tv",
            _ => "movie",
        };
        let url = format!("{}/{segment}/{}", self.base_url, path_segment(source_id.trim()));
        let options = self
            .authorize(RequestOptions::new())
            .query_opt("language", hints.language.clone());
        let key = cache_key(
            NAME,
            &format!("{}_detail", kind.as_str()),
            &[source_id, hints.language.as_deref().unwrap_or("")],
        );
        debug!(segment, cache_key = %key, "TMDB details");

        let fetched = self.fetcher.fetch_with_cache(&url, &options, &key).await;
        let Some(detail) = typed::<TmdbDetail>(NAME, fetched)? else {
            return Ok(None);
        };

        let title = detail.title.or(detail.name);
        let date = detail.release_date.or(detail.first_air_date);
        Ok(Self::normalize(kind, &detail.id, title, date.as_deref()).map(|m| {
            m.with_description(detail.overview)
                .with_thumbnail(poster_url(detail.poster_path))
                .with_backdrop(backdrop_url(detail.backdrop_path))
                .with_genres(detail.genres.into_iter().map(|g| g.name))
        }))
    }
}
