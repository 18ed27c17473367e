//! Open Library book provider.
//!
//! Needs no credentials. Work ids are the `OL…W` part of `/works/OL…W` keys.

use async_trait::async_trait;
use metaforged_common::{ContentKind, MediaSearchResult, ProviderError, Result, StandardMetadata};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::metadata::cache::cache_key;
use crate::metadata::fetcher::{FetchContext, RequestOptions, RetryingFetcher};
use crate::metadata::provider::{MetadataProvider, ProviderConfig, SearchHints};
use crate::metadata::rate_limit::RateLimit;

use super::{decode_items, parse_year, path_segment, typed};

const NAME: &str = "openlibrary";
const OPENLIBRARY_BASE_URL: &str = "https://openlibrary.org";
const COVERS_BASE_URL: &str = "https://covers.openlibrary.org/b/id";
const DEFAULT_LIMIT: usize = 20;
const MAX_GENRES: usize = 10;

pub const DEFAULT_RATE_LIMIT: RateLimit = RateLimit::new(5, 1_000);

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(rename = "numFound")]
    num_found: Option<u64>,
    #[serde(default)]
    docs: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct SearchDoc {
    key: String,
    title: Option<String>,
    first_publish_year: Option<u16>,
    cover_i: Option<i64>,
    #[serde(default)]
    subject: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct Work {
    key: Option<String>,
    title: Option<String>,
    description: Option<Description>,
    first_publish_date: Option<String>,
    #[serde(default)]
    covers: Vec<i64>,
    #[serde(default)]
    subjects: Vec<String>,
}

/// Work descriptions are either a bare string or a typed text object.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Description {
    Text(String),
    Typed { value: String },
}

impl Description {
    fn into_text(self) -> String {
        match self {
            Self::Text(s) | Self::Typed { value: s } => s,
        }
    }
}

/// `-1` marks "no cover" in Open Library payloads.
fn cover_url(cover_id: Option<i64>) -> Option<String> {
    cover_id
        .filter(|id| *id > 0)
        .map(|id| format!("{COVERS_BASE_URL}/{id}-M.jpg"))
}

fn work_id(key: &str) -> &str {
    key.trim().trim_start_matches("/works/")
}

fn genres(subjects: Vec<String>) -> impl Iterator<Item = String> {
    subjects.into_iter().take(MAX_GENRES)
}

/// Open Library metadata provider.
pub struct OpenLibraryProvider {
    config: ProviderConfig,
    fetcher: RetryingFetcher,
    base_url: String,
}

impl OpenLibraryProvider {
    /// Create an Open Library provider from its configuration and the shared
    /// context.
    pub fn new(config: ProviderConfig, ctx: &FetchContext) -> Self {
        let fetcher = ctx.fetcher(NAME, config.rate_limit());
        let base_url = config.base_url().unwrap_or(OPENLIBRARY_BASE_URL).to_string();
        Self {
            config,
            fetcher,
            base_url,
        }
    }

    fn options(&self) -> Result<RequestOptions> {
        if !self.is_available() {
            return Err(ProviderError::unavailable(NAME));
        }
        let options = RequestOptions::new();
        Ok(match self.config.user_agent() {
            Some(ua) => options.header("User-Agent", ua),
            None => options,
        })
    }
}

#[async_trait]
impl MetadataProvider for OpenLibraryProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.config.is_enabled()
    }

    async fn search(&self, query: &str, hints: &SearchHints) -> Result<MediaSearchResult> {
        let options = self.options()?;
        if hints.kind == Some(ContentKind::Comic) {
            return Ok(MediaSearchResult::empty(NAME));
        }

        let limit = hints.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 100).to_string();
        let year = hints.year.map(|y| y.to_string());
        let options = options
            .query("q", query.trim())
            .query_opt("first_publish_year", year.clone())
            .query("limit", limit.clone());

        let key = cache_key(
            NAME,
            ContentKind::Book.as_str(),
            &[query, year.as_deref().unwrap_or(""), &limit],
        );
        debug!(cache_key = %key, "Open Library search");

        let url = format!("{}/search.json", self.base_url);
        let fetched = self.fetcher.fetch_with_cache(&url, &options, &key).await;
        let Some(body) = typed::<SearchResponse>(NAME, fetched)? else {
            return Ok(MediaSearchResult::empty(NAME));
        };

        let records: Vec<StandardMetadata> = decode_items::<SearchDoc>(NAME, body.docs)
            .into_iter()
            .filter_map(|doc| {
                StandardMetadata::new(
                    NAME,
                    work_id(&doc.key),
                    ContentKind::Book,
                    doc.title?,
                    doc.first_publish_year.filter(|y| *y > 0),
                )
                .map(|m| {
                    m.with_thumbnail(cover_url(doc.cover_i))
                        .with_genres(genres(doc.subject))
                })
            })
            .collect();

        Ok(MediaSearchResult::from_records(
            NAME,
            hints.truncate(records),
            body.num_found,
        ))
    }

    async fn get_details(
        &self,
        source_id: &str,
        hints: &SearchHints,
    ) -> Result<Option<StandardMetadata>> {
        let options = self.options()?;
        let id = work_id(source_id);
        let url = format!("{}/works/{}.json", self.base_url, path_segment(id));
        let key = cache_key(NAME, "work", &[id]);
        debug!(cache_key = %key, "Open Library details");

        let fetched = self.fetcher.fetch_with_cache(&url, &options, &key).await;
        let Some(work) = typed::<Work>(NAME, fetched)? else {
            return Ok(None);
        };

        let year = parse_year(work.first_publish_date.as_deref()).or(hints.year);
        let id = work
            .key
            .as_deref()
            .map(work_id)
            .unwrap_or(id)
            .to_string();
        Ok(work.title.and_then(|title| {
            StandardMetadata::new(NAME, id, ContentKind::Book, title, year).map(|m| {
                m.with_description(work.description.map(Description::into_text))
                    .with_thumbnail(cover_url(work.covers.first().copied()))
                    .with_genres(genres(work.subjects))
            })
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cover_urls() {
        assert_eq!(
            cover_url(Some(8_739_161)).as_deref(),
            Some("https://covers.openlibrary.org/b/id/8739161-M.jpg")
        );
        assert_eq!(cover_url(Some(-1)), None);
        assert_eq!(cover_url(None), None);
    }

    #[test]
    fn work_keys() {
        assert_eq!(work_id("/works/OL45883W"), "OL45883W");
        assert_eq!(work_id("OL45883W"), "OL45883W");
    }

    #[test]
    fn description_shapes() {
        let plain: Description = serde_json::from_value(serde_json::json!("A hobbit")).unwrap();
        assert_eq!(plain.into_text(), "A hobbit");

        let typed: Description = serde_json::from_value(
            serde_json::json!({"type": "/type/text", "value": "A hobbit"}),
        )
        .unwrap();
        assert_eq!(typed.into_text(), "A hobbit");
    }

    #[tokio::test]
    async fn available_without_credentials_unless_disabled() {
        let ctx = FetchContext::default();
        let provider = OpenLibraryProvider::new(ProviderConfig::new(DEFAULT_RATE_LIMIT), &ctx);
        assert!(provider.is_available());

        let disabled = OpenLibraryProvider::new(
            ProviderConfig::new(DEFAULT_RATE_LIMIT).enabled(false),
            &ctx,
        );
        assert!(!disabled.is_available());
        assert!(disabled
            .search("The Hobbit", &SearchHints::default())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn comic_searches_are_skipped() {
        let provider = OpenLibraryProvider::new(
            ProviderConfig::new(DEFAULT_RATE_LIMIT),
            &FetchContext::default(),
        );
        let result = provider
            .search("Saga", &SearchHints::kind(ContentKind::Comic))
            .await
            .unwrap();
        assert!(result.is_empty());
    }
}
