//! OMDb (Open Movie Database) metadata provider.
//!
//! A second film/TV catalog keyed by IMDb ids. OMDb reports "no results" as
//! HTTP 200 with `"Response": "False"`, which maps to an empty result.

use async_trait::async_trait;
use metaforged_common::{ContentKind, MediaSearchResult, ProviderError, Result, StandardMetadata};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::metadata::cache::cache_key;
use crate::metadata::fetcher::{FetchContext, RequestOptions, RetryingFetcher};
use crate::metadata::provider::{MetadataProvider, ProviderConfig, SearchHints};
use crate::metadata::rate_limit::RateLimit;

use super::{decode_items, not_placeholder, parse_year, typed};

const NAME: &str = "omdb";
const OMDB_BASE_URL: &str = "https://www.omdbapi.com";

/// Free keys are capped per day; keep bursts small.
pub const DEFAULT_RATE_LIMIT: RateLimit = RateLimit::new(10, 1_000);

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct OmdbSearchResponse {
    response: Option<String>,
    #[serde(default)]
    search: Vec<Value>,
    #[serde(rename = "totalResults")]
    total_results: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OmdbSearchItem {
    #[serde(rename = "imdbID")]
    imdb_id: String,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
    #[serde(rename = "Type")]
    kind: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OmdbDetail {
    #[serde(rename = "Response")]
    response: Option<String>,
    #[serde(rename = "imdbID")]
    imdb_id: Option<String>,
    #[serde(rename = "Title")]
    title: Option<String>,
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "Plot")]
    plot: Option<String>,
    #[serde(rename = "Genre")]
    genre: Option<String>,
    #[serde(rename = "Poster")]
    poster: Option<String>,
    #[serde(rename = "Type")]
    kind: Option<String>,
}

/// OMDb metadata provider.
pub struct OmdbProvider {
    config: ProviderConfig,
    fetcher: RetryingFetcher,
    base_url: String,
}

impl OmdbProvider {
    /// Create an OMDb provider from its configuration and the shared context.
    pub fn new(config: ProviderConfig, ctx: &FetchContext) -> Self {
        let fetcher = ctx.fetcher(NAME, config.rate_limit());
        let base_url = config.base_url().unwrap_or(OMDB_BASE_URL).to_string();
        Self {
            config,
            fetcher,
            base_url,
        }
    }

    fn options(&self) -> Result<RequestOptions> {
        let key = self
            .config
            .api_key()
            .filter(|_| self.config.is_enabled())
            .ok_or_else(|| ProviderError::unavailable(NAME))?;
        Ok(RequestOptions::new().query("apikey", key))
    }
}

fn kind_of(omdb_type: Option<&str>) -> ContentKind {
    match omdb_type {
        Some("series") | Some("episode") => ContentKind::Tv,
        _ => ContentKind::Movie,
    }
}

fn is_true(response: Option<&str>) -> bool {
    response.is_some_and(|r| r.eq_ignore_ascii_case("true"))
}

/// `Error` texts OMDb returns for a lookup that simply has no answer.
const SETTLED_ERRORS: &[&str] = &["not found", "incorrect imdb id", "too many results"];

/// Whether a raw body is worth caching: a hit, or a definite miss. Server-side
/// failures such as "Error getting data." also arrive as `"Response": "False"`.
fn cacheable(body: &Value) -> bool {
    if is_true(body.get("Response").and_then(Value::as_str)) {
        return true;
    }
    let error = body
        .get("Error")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_ascii_lowercase();
    SETTLED_ERRORS.iter().any(|settled| error.contains(settled))
}

#[async_trait]
impl MetadataProvider for OmdbProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.config.is_enabled() && self.config.api_key().is_some()
    }

    async fn search(&self, query: &str, hints: &SearchHints) -> Result<MediaSearchResult> {
        let type_param = match hints.kind {
            Some(ContentKind::Tv) => Some("series"),
            Some(ContentKind::Movie) => Some("movie"),
            _ => None,
        };
        let year = hints.year.map(|y| y.to_string());
        let options = self
            .options()?
            .query("s", query.trim())
            .query_opt("type", type_param)
            .query_opt("y", year.clone());

        let key = cache_key(
            NAME,
            type_param.unwrap_or("any"),
            &[query, year.as_deref().unwrap_or("")],
        );
        debug!(cache_key = %key, "OMDb search");

        let fetched = self
            .fetcher
            .fetch_with_cache_if(&self.base_url, &options, &key, cacheable)
            .await;
        let Some(body) = typed::<OmdbSearchResponse>(NAME, fetched)? else {
            return Ok(MediaSearchResult::empty(NAME));
        };
        if !is_true(body.response.as_deref()) {
            return Ok(MediaSearchResult::empty(NAME));
        }

        let records: Vec<StandardMetadata> = decode_items::<OmdbSearchItem>(NAME, body.search)
            .into_iter()
            .filter_map(|item| {
                let kind = kind_of(item.kind.as_deref());
                StandardMetadata::new(
                    NAME,
                    item.imdb_id,
                    kind,
                    item.title?,
                    parse_year(item.year.as_deref()),
                )
                .map(|m| m.with_thumbnail(not_placeholder(item.poster)))
            })
            .collect();

        let total = body.total_results.and_then(|t| t.trim().parse::<u64>().ok());
        Ok(MediaSearchResult::from_records(
            NAME,
            hints.truncate(records),
            total,
        ))
    }

    async fn get_details(
        &self,
        source_id: &str,
        _hints: &SearchHints,
    ) -> Result<Option<StandardMetadata>> {
        let options = self
            .options()?
            .query("i", source_id.trim())
            .query("plot", "short");
        let key = cache_key(NAME, "detail", &[source_id]);
        debug!(cache_key = %key, "OMDb details");

        let fetched = self
            .fetcher
            .fetch_with_cache_if(&self.base_url, &options, &key, cacheable)
            .await;
        let Some(detail) = typed::<OmdbDetail>(NAME, fetched)? else {
            return Ok(None);
        };
        if !is_true(detail.response.as_deref()) {
            return Ok(None);
        }

        let kind = kind_of(detail.kind.as_deref());
        let id = detail
            .imdb_id
            .unwrap_or_else(|| source_id.trim().to_string());
        let genres = not_placeholder(detail.genre)
            .map(|g| g.split(',').map(|s| s.trim().to_string()).collect::<Vec<_>>())
            .unwrap_or_default();

        Ok(detail.title.and_then(|title| {
            StandardMetadata::new(NAME, id, kind, title, parse_year(detail.year.as_deref())).map(
                |m| {
                    m.with_description(not_placeholder(detail.plot))
                        .with_thumbnail(not_placeholder(detail.poster))
                        .with_genres(genres)
                },
            )
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn type_mapping() {
        assert_eq!(kind_of(Some("series")), ContentKind::Tv);
        assert_eq!(kind_of(Some("movie")), ContentKind::Movie);
        assert_eq!(kind_of(None), ContentKind::Movie);
    }

    #[test]
    fn only_settled_answers_are_cacheable() {
        let failed = |error: &str| serde_json::json!({"Response": "False", "Error": error});

        assert!(cacheable(&serde_json::json!({"Response": "True", "Title": "Inception"})));
        assert!(cacheable(&failed("Movie not found!")));
        assert!(cacheable(&failed("Incorrect IMDb ID.")));
        assert!(!cacheable(&failed("Error getting data.")));
        assert!(!cacheable(&failed("Request limit reached!")));
        assert!(!cacheable(&serde_json::json!({"Response": "False"})));
    }

    #[test]
    fn response_flag() {
        assert!(is_true(Some("True")));
        assert!(!is_true(Some("False")));
        assert!(!is_true(None));
    }

    #[tokio::test]
    async fn unavailable_without_key() {
        let provider = OmdbProvider::new(
            ProviderConfig::new(DEFAULT_RATE_LIMIT),
            &FetchContext::default(),
        );
        assert!(!provider.is_available());
        assert!(provider
            .search("Inception", &SearchHints::default())
            .await
            .is_err());
    }
}
