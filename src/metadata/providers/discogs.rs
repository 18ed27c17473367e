//! Discogs metadata provider.
//!
//! Discogs search needs a consumer key *and* a consumer secret, sent in the
//! `Authorization: Discogs key=…, secret=…` header. Search results title
//! releases as `"Artist - Album"`, which is split back into its parts.

use async_trait::async_trait;
use metaforged_common::{ContentKind, MediaSearchResult, ProviderError, Result, StandardMetadata};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::metadata::cache::cache_key;
use crate::metadata::fetcher::{FetchContext, RequestOptions, RetryingFetcher};
use crate::metadata::provider::{MetadataProvider, ProviderConfig, SearchHints};
use crate::metadata::rate_limit::RateLimit;

use super::{decode_items, path_segment, typed, LooseYear, NativeId};

const NAME: &str = "discogs";
const DISCOGS_BASE_URL: &str = "https://api.discogs.com";

/// Unauthenticated clients get 25 requests a minute; stay at that floor.
pub const DEFAULT_RATE_LIMIT: RateLimit = RateLimit::new(25, 60_000);

#[derive(Debug, Deserialize)]
struct DiscogsSearch {
    #[serde(default)]
    results: Vec<Value>,
    pagination: Option<Pagination>,
}

#[derive(Debug, Deserialize)]
struct Pagination {
    items: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct DiscogsSearchItem {
    id: NativeId,
    title: Option<String>,
    year: Option<LooseYear>,
    cover_image: Option<String>,
    thumb: Option<String>,
    #[serde(default)]
    genre: Vec<String>,
    #[serde(default)]
    style: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct DiscogsRelease {
    id: NativeId,
    title: Option<String>,
    year: Option<LooseYear>,
    released: Option<String>,
    notes: Option<String>,
    #[serde(default)]
    artists: Vec<DiscogsArtist>,
    #[serde(default)]
    genres: Vec<String>,
    #[serde(default)]
    styles: Vec<String>,
    #[serde(default)]
    images: Vec<DiscogsImage>,
}

#[derive(Debug, Deserialize)]
struct DiscogsArtist {
    name: String,
}

#[derive(Debug, Deserialize)]
struct DiscogsImage {
    #[serde(rename = "type")]
    kind: Option<String>,
    uri: Option<String>,
}

/// Split `"Artist - Album"` into its parts; a title without the separator is
/// all album.
fn split_title(title: &str) -> (Option<String>, String) {
    match title.split_once(" - ") {
        Some((artist, album)) => (Some(artist.trim().to_string()), album.trim().to_string()),
        None => (None, title.trim().to_string()),
    }
}

/// Discogs disambiguates artists as `"Name (2)"`; drop the suffix.
fn clean_artist(name: &str) -> String {
    let trimmed = name.trim();
    let numbered = trimmed.rfind(" (").filter(|&open| {
        trimmed[open + 2..]
            .strip_suffix(')')
            .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
    });
    match numbered {
        Some(open) => trimmed[..open].to_string(),
        None => trimmed.to_string(),
    }
}

/// Discogs metadata provider.
pub struct DiscogsProvider {
    config: ProviderConfig,
    fetcher: RetryingFetcher,
    base_url: String,
}

impl DiscogsProvider {
    /// Create a Discogs provider from its configuration and the shared context.
    pub fn new(config: ProviderConfig, ctx: &FetchContext) -> Self {
        let fetcher = ctx.fetcher(NAME, config.rate_limit());
        let base_url = config.base_url().unwrap_or(DISCOGS_BASE_URL).to_string();
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
        let (Some(key), Some(secret)) = (self.config.client_id(), self.config.client_secret())
        else {
            return Err(ProviderError::unavailable(NAME));
        };
        Ok(RequestOptions::new().header(
            "Authorization",
            format!("Discogs key={key}, secret={secret}"),
        ))
    }
}

#[async_trait]
impl MetadataProvider for DiscogsProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.config.is_enabled()
            && self.config.client_id().is_some()
            && self.config.client_secret().is_some()
    }

    async fn search(&self, query: &str, hints: &SearchHints) -> Result<MediaSearchResult> {
        let year = hints.year.map(|y| y.to_string());
        let per_page = hints.limit.unwrap_or(25).clamp(1, 100).to_string();
        let options = self
            .options()?
            .query("q", query.trim())
            .query("type", "release")
            .query_opt("artist", hints.artist.clone())
            .query_opt("year", year.clone())
            .query("per_page", per_page.clone());

        let key = cache_key(
            NAME,
            ContentKind::Album.as_str(),
            &[
                query,
                hints.artist.as_deref().unwrap_or(""),
                year.as_deref().unwrap_or(""),
                &per_page,
            ],
        );
        debug!(cache_key = %key, "Discogs search");

        let url = format!("{}/database/search", self.base_url);
        let fetched = self.fetcher.fetch_with_cache(&url, &options, &key).await;
        let Some(body) = typed::<DiscogsSearch>(NAME, fetched)? else {
            return Ok(MediaSearchResult::empty(NAME));
        };

        let records: Vec<StandardMetadata> = decode_items::<DiscogsSearchItem>(NAME, body.results)
            .into_iter()
            .filter_map(|item| {
                let (artist, album) = split_title(item.title.as_deref()?);
                let year = item.year.as_ref().and_then(LooseYear::year);
                let id = item.id.to_string();
                StandardMetadata::new(NAME, id, ContentKind::Album, album.clone(), year).map(|m| {
                    m.with_artist(artist.map(|a| clean_artist(&a)))
                        .with_album(Some(album))
                        .with_thumbnail(item.thumb)
                        .with_backdrop(item.cover_image)
                        .with_genres(item.genre.into_iter().chain(item.style))
                })
            })
            .collect();

        let total = body.pagination.and_then(|p| p.items);
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
        let url = format!("{}/releases/{}", self.base_url, path_segment(source_id.trim()));
        let key = cache_key(NAME, "release_detail", &[source_id]);
        debug!(cache_key = %key, "Discogs details");

        let fetched = self.fetcher.fetch_with_cache(&url, &options, &key).await;
        let Some(release) = typed::<DiscogsRelease>(NAME, fetched)? else {
            return Ok(None);
        };

        let year = release
            .year
            .as_ref()
            .and_then(LooseYear::year)
            .or_else(|| super::parse_year(release.released.as_deref()));
        let artist = (!release.artists.is_empty()).then(|| {
            release
                .artists
                .iter()
                .map(|a| clean_artist(&a.name))
                .collect::<Vec<_>>()
                .join(", ")
        });
        let primary = release
            .images
            .iter()
            .find(|i| i.kind.as_deref() == Some("primary"))
            .or(release.images.first())
            .and_then(|i| i.uri.clone());

        let Some(title) = release.title else {
            return Ok(None);
        };
        Ok(StandardMetadata::new(
            NAME,
            release.id.to_string(),
            ContentKind::Album,
            title.clone(),
            year,
        )
        .map(|m| {
            m.with_artist(artist)
                .with_album(Some(title))
                .with_description(release.notes)
                .with_thumbnail(primary)
                .with_genres(release.genres.into_iter().chain(release.styles))
        }))
    }
}
