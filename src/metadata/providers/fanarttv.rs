//! Fanart.tv artwork provider.
//!
//! Fanart.tv has no text search; artwork is addressed by a TMDB id, taken
//! from `hints.tmdb_id` or from a purely numeric query. Film artwork can also
//! be addressed by `hints.imdb_id`. Payloads carry no release year, so matches
//! use `hints.year`.

use async_trait::async_trait;
use metaforged_common::{ContentKind, MediaSearchResult, ProviderError, Result, StandardMetadata};
use serde::Deserialize;
use tracing::debug;

use crate::metadata::cache::cache_key;
use crate::metadata::fetcher::{FetchContext, RequestOptions, RetryingFetcher};
use crate::metadata::provider::{MetadataProvider, ProviderConfig, SearchHints};
use crate::metadata::rate_limit::RateLimit;

use super::{path_segment, typed};

const NAME: &str = "fanarttv";
const FANART_BASE_URL: &str = "https://webservice.fanart.tv/v3";

pub const DEFAULT_RATE_LIMIT: RateLimit = RateLimit::new(10, 1_000);

#[derive(Debug, Default, Deserialize)]
struct FanartResponse {
    name: Option<String>,
    #[serde(default)]
    movieposter: Vec<FanartImage>,
    #[serde(default)]
    moviebackground: Vec<FanartImage>,
    #[serde(default)]
    tvposter: Vec<FanartImage>,
    #[serde(default)]
    showbackground: Vec<FanartImage>,
}

#[derive(Debug, Deserialize)]
struct FanartImage {
    url: Option<String>,
}

fn first_url(images: &[FanartImage]) -> Option<String> {
    images.iter().find_map(|i| i.url.clone())
}

/// Which fan-art collection to read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collection {
    Movies,
    Tv,
}

impl Collection {
    fn from_hints(hints: &SearchHints) -> Self {
        match hints.kind {
            Some(ContentKind::Tv) => Self::Tv,
            _ => Self::Movies,
        }
    }

    fn path(self) -> &'static str {
        match self {
            Self::Movies => "movies",
            Self::Tv => "tv",
        }
    }

    fn key_kind(self) -> &'static str {
        match self {
            Self::Movies => "movie",
            Self::Tv => "tv",
        }
    }
}

/// Fanart.tv metadata provider.
pub struct FanartTvProvider {
    config: ProviderConfig,
    fetcher: RetryingFetcher,
    base_url: String,
}

impl FanartTvProvider {
    /// Create a Fanart.tv provider from its configuration and the shared context.
    pub fn new(config: ProviderConfig, ctx: &FetchContext) -> Self {
        let fetcher = ctx.fetcher(NAME, config.rate_limit());
        let base_url = config.base_url().unwrap_or(FANART_BASE_URL).to_string();
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
        Ok(RequestOptions::new().query("api_key", key))
    }

    /// Fetch the artwork for one id and normalize it into a single record.
    async fn artwork(
        &self,
        id: &str,
        fallback_title: Option<&str>,
        hints: &SearchHints,
    ) -> Result<Option<StandardMetadata>> {
        let options = self.options()?;
        let collection = Collection::from_hints(hints);
        let url = format!(
            "{}/{}/{}",
            self.base_url,
            collection.path(),
            path_segment(id)
        );
        let key = cache_key(NAME, collection.key_kind(), &[id]);
        debug!(cache_key = %key, "Fanart.tv artwork");

        let fetched = self.fetcher.fetch_with_cache(&url, &options, &key).await;
        let Some(art) = typed::<FanartResponse>(NAME, fetched)? else {
            return Ok(None);
        };
        Ok(normalize(id, art, collection, fallback_title, hints.year))
    }
}

fn normalize(
    id: &str,
    art: FanartResponse,
    collection: Collection,
    fallback_title: Option<&str>,
    year: Option<u16>,
) -> Option<StandardMetadata> {
    let (poster, background) = match collection {
        Collection::Movies => (first_url(&art.movieposter), first_url(&art.moviebackground)),
        Collection::Tv => (first_url(&art.tvposter), first_url(&art.showbackground)),
    };
    if poster.is_none() && background.is_none() {
        return None;
    }

    let title = art.name.or_else(|| fallback_title.map(str::to_string))?;
    StandardMetadata::new(NAME, id, ContentKind::Image, title, year)
        .map(|m| m.with_thumbnail(poster).with_backdrop(background))
}

/// The id to look up: the TMDB hint wins, then a numeric query, then (for
/// films only) the IMDb hint.
fn lookup_id<'a>(query: &'a str, hints: &'a SearchHints) -> Option<&'a str> {
    fn hint(id: &Option<String>) -> Option<&str> {
        id.as_deref().map(str::trim).filter(|id| !id.is_empty())
    }

    hint(&hints.tmdb_id)
        .or_else(|| {
            let q = query.trim();
            (!q.is_empty() && q.bytes().all(|b| b.is_ascii_digit())).then_some(q)
        })
        .or_else(|| match Collection::from_hints(hints) {
            Collection::Movies => hint(&hints.imdb_id),
            Collection::Tv => None,
        })
}

#[async_trait]
impl MetadataProvider for FanartTvProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.config.is_enabled() && self.config.api_key().is_some()
    }

    async fn search(&self, query: &str, hints: &SearchHints) -> Result<MediaSearchResult> {
        if !self.is_available() {
            return Err(ProviderError::unavailable(NAME));
        }
        let Some(id) = lookup_id(query, hints) else {
            debug!("Fan-art search without a TMDB or IMDb id");
            return Ok(MediaSearchResult::empty(NAME));
        };

        let title = Some(query.trim()).filter(|q| !q.is_empty() && *q != id);
        let record = self.artwork(id, title, hints).await?;
        Ok(MediaSearchResult::from_records(
            NAME,
            record.into_iter().collect(),
            None,
        ))
    }

    async fn get_details(
        &self,
        source_id: &str,
        hints: &SearchHints,
    ) -> Result<Option<StandardMetadata>> {
        if !self.is_available() {
            return Err(ProviderError::unavailable(NAME));
        }
        self.artwork(source_id.trim(), None, hints).await
    }
}
