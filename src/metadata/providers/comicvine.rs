//! Comic Vine comic-series provider.
//!
//! Comic Vine wraps every response in an envelope whose `status_code` is `1`
//! on success, even when the HTTP status is 200 for a failed request.

use async_trait::async_trait;
use metaforged_common::{ContentKind, MediaSearchResult, ProviderError, Result, StandardMetadata};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::metadata::cache::cache_key;
use crate::metadata::fetcher::{FetchContext, RequestOptions, RetryingFetcher};
use crate::metadata::provider::{MetadataProvider, ProviderConfig, SearchHints};
use crate::metadata::rate_limit::RateLimit;

use super::{decode, decode_items, path_segment, typed, LooseYear, NativeId};

const NAME: &str = "comicvine";
const COMICVINE_BASE_URL: &str = "https://comicvine.gamespot.com/api";
/// Resource-type prefix of volume ids in detail URLs.
const VOLUME_PREFIX: &str = "4050";
const FIELDS: &str = "id,name,start_year,deck,image";

/// Comic Vine throttles hard past one request a second.
pub const DEFAULT_RATE_LIMIT: RateLimit = RateLimit::new(1, 1_000);

const STATUS_OK: i64 = 1;
const STATUS_NOT_FOUND: i64 = 101;

#[derive(Debug, Deserialize)]
struct Envelope {
    status_code: Option<i64>,
    error: Option<String>,
    number_of_total_results: Option<u64>,
    #[serde(default)]
    results: Value,
}

#[derive(Debug, Deserialize)]
struct Volume {
    id: NativeId,
    name: Option<String>,
    start_year: Option<LooseYear>,
    deck: Option<String>,
    image: Option<VolumeImage>,
}

#[derive(Debug, Deserialize)]
struct VolumeImage {
    thumb_url: Option<String>,
    super_url: Option<String>,
}

/// Outcome of checking a response envelope.
enum Checked {
    Ok(Envelope),
    NotFound,
}

fn check(envelope: Envelope) -> Result<Checked> {
    match envelope.status_code {
        Some(STATUS_OK) | None => Ok(Checked::Ok(envelope)),
        Some(STATUS_NOT_FOUND) => Ok(Checked::NotFound),
        Some(code) => Err(ProviderError::invalid_request(
            NAME,
            format!(
                "status {code}: {}",
                envelope.error.as_deref().unwrap_or("unknown error")
            ),
        )),
    }
}

/// Whether a raw envelope is a settled answer worth caching. Error codes
/// such as an invalid key or a rate-limit rejection are not.
fn cacheable(body: &Value) -> bool {
    matches!(
        body.get("status_code").and_then(Value::as_i64),
        None | Some(STATUS_OK) | Some(STATUS_NOT_FOUND)
    )
}

fn normalize(volume: Volume) -> Option<StandardMetadata> {
    let year = volume.start_year.as_ref().and_then(LooseYear::year);
    let (thumb, cover) = volume
        .image
        .map(|i| (i.thumb_url, i.super_url))
        .unwrap_or_default();

    StandardMetadata::new(NAME, volume.id.to_string(), ContentKind::Comic, volume.name?, year).map(
        |m| {
            m.with_description(volume.deck)
                .with_thumbnail(thumb)
                .with_backdrop(cover)
        },
    )
}

/// Comic Vine metadata provider.
pub struct ComicVineProvider {
    config: ProviderConfig,
    fetcher: RetryingFetcher,
    base_url: String,
}

impl ComicVineProvider {
    /// Create a Comic Vine provider from its configuration and the shared
    /// context.
    pub fn new(config: ProviderConfig, ctx: &FetchContext) -> Self {
        let fetcher = ctx.fetcher(NAME, config.rate_limit());
        let base_url = config.base_url().unwrap_or(COMICVINE_BASE_URL).to_string();
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
        let options = RequestOptions::new()
            .query("api_key", key)
            .query("format", "json")
            .query("field_list", FIELDS);
        Ok(match self.config.user_agent() {
            Some(ua) => options.header("User-Agent", ua),
            None => options,
        })
    }
}

#[async_trait]
impl MetadataProvider for ComicVineProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.config.is_enabled() && self.config.api_key().is_some()
    }

    async fn search(&self, query: &str, hints: &SearchHints) -> Result<MediaSearchResult> {
        let limit = hints.limit.unwrap_or(10).clamp(1, 100).to_string();
        let options = self
            .options()?
            .query("resources", "volume")
            .query("query", query.trim())
            .query("limit", limit.clone());

        let key = cache_key(NAME, ContentKind::Comic.as_str(), &[query, &limit]);
        debug!(cache_key = %key, "Comic Vine search");

        let url = format!("{}/search/", self.base_url);
        let fetched = self
            .fetcher
            .fetch_with_cache_if(&url, &options, &key, cacheable)
            .await;
        let Some(envelope) = typed::<Envelope>(NAME, fetched)? else {
            return Ok(MediaSearchResult::empty(NAME));
        };
        let Checked::Ok(envelope) = check(envelope)? else {
            return Ok(MediaSearchResult::empty(NAME));
        };

        let items = match envelope.results {
            Value::Array(items) => items,
            _ => Vec::new(),
        };
        let records: Vec<StandardMetadata> = decode_items::<Volume>(NAME, items)
            .into_iter()
            .filter(|v| {
                let year = v.start_year.as_ref().and_then(LooseYear::year);
                hints.year.is_none() || year == hints.year
            })
            .filter_map(normalize)
            .collect();

        let total = if hints.year.is_some() {
            None
        } else {
            envelope.number_of_total_results
        };
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
        let options = self.options()?;
        let id = source_id.trim().trim_start_matches("4050-");
        let url = format!(
            "{}/volume/{VOLUME_PREFIX}-{}/",
            self.base_url,
            path_segment(id)
        );
        let key = cache_key(NAME, "volume", &[id]);
        debug!(cache_key = %key, "Comic Vine details");

        let fetched = self
            .fetcher
            .fetch_with_cache_if(&url, &options, &key, cacheable)
            .await;
        let Some(envelope) = typed::<Envelope>(NAME, fetched)? else {
            return Ok(None);
        };
        let Checked::Ok(envelope) = check(envelope)? else {
            return Ok(None);
        };
        Ok(decode::<Volume>(NAME, envelope.results).and_then(normalize))
    }
}
