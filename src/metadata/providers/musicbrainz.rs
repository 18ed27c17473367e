//! MusicBrainz metadata provider.
//!
//! Searches recordings (tracks) by default and releases when the hints ask for
//! an album. MusicBrainz needs no key, only a descriptive User-Agent, and
//! enforces one request per second per client.

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

const NAME: &str = "musicbrainz";
const MUSICBRAINZ_BASE_URL: &str = "https://musicbrainz.org/ws/2";
const COVER_ART_BASE: &str = "https://coverartarchive.org/release";
const DEFAULT_LIMIT: usize = 25;

/// MusicBrainz allows one request per second.
pub const DEFAULT_RATE_LIMIT: RateLimit = RateLimit::new(1, 1_000);

// ---------------------------------------------------------------------------
// MusicBrainz API response types (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RecordingSearch {
    #[serde(default)]
    recordings: Vec<Value>,
    count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct ReleaseSearch {
    #[serde(default)]
    releases: Vec<Value>,
    count: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct Recording {
    id: String,
    title: Option<String>,
    #[serde(rename = "first-release-date")]
    first_release_date: Option<String>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(default)]
    releases: Vec<ReleaseRef>,
    #[serde(default)]
    tags: Vec<Named>,
    #[serde(default)]
    genres: Vec<Named>,
}

#[derive(Debug, Deserialize)]
struct Release {
    id: String,
    title: Option<String>,
    date: Option<String>,
    #[serde(rename = "artist-credit", default)]
    artist_credit: Vec<ArtistCredit>,
    #[serde(rename = "cover-art-archive")]
    cover_art_archive: Option<CoverArtArchive>,
    #[serde(default)]
    tags: Vec<Named>,
    #[serde(default)]
    genres: Vec<Named>,
}

#[derive(Debug, Deserialize)]
struct ReleaseRef {
    title: Option<String>,
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ArtistCredit {
    name: Option<String>,
    artist: Option<Named>,
    joinphrase: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Named {
    name: String,
}

#[derive(Debug, Deserialize)]
struct CoverArtArchive {
    #[serde(default)]
    front: bool,
}

// ---------------------------------------------------------------------------
// Normalization helpers
// ---------------------------------------------------------------------------

/// Join an artist credit into one display string, honouring join phrases.
fn credit_name(credits: &[ArtistCredit]) -> Option<String> {
    let mut out = String::new();
    for credit in credits {
        let name = credit
            .name
            .as_deref()
            .or(credit.artist.as_ref().map(|a| a.name.as_str()));
        if let Some(name) = name {
            out.push_str(name);
        }
        if let Some(join) = credit.joinphrase.as_deref() {
            out.push_str(join);
        }
    }
    let out = out.trim().to_string();
    (!out.is_empty()).then_some(out)
}

/// Genres if MusicBrainz sent any, otherwise folksonomy tags.
fn genre_labels(genres: Vec<Named>, tags: Vec<Named>) -> Vec<String> {
    let source = if genres.is_empty() { tags } else { genres };
    source.into_iter().map(|n| n.name).collect()
}

/// Earliest dated release, as (year, album title).
fn earliest_release(releases: &[ReleaseRef]) -> (Option<u16>, Option<String>) {
    releases
        .iter()
        .filter_map(|r| parse_year(r.date.as_deref()).map(|y| (y, r.title.clone())))
        .min_by_key(|(y, _)| *y)
        .map(|(y, t)| (Some(y), t))
        .unwrap_or((None, releases.first().and_then(|r| r.title.clone())))
}

fn normalize_recording(recording: Recording) -> Option<StandardMetadata> {
    let (release_year, album) = earliest_release(&recording.releases);
    let year = parse_year(recording.first_release_date.as_deref()).or(release_year);
    let artist = credit_name(&recording.artist_credit);

    StandardMetadata::new(NAME, recording.id, ContentKind::Track, recording.title?, year).map(|m| {
        m.with_artist(artist)
            .with_album(album)
            .with_genres(genre_labels(recording.genres, recording.tags))
    })
}

fn normalize_release(release: Release) -> Option<StandardMetadata> {
    let artist = credit_name(&release.artist_credit);
    let has_front = release.cover_art_archive.as_ref().is_some_and(|c| c.front);
    let cover = has_front.then(|| format!("{COVER_ART_BASE}/{}/front-250", release.id));
    let title = release.title?;

    StandardMetadata::new(
        NAME,
        release.id,
        ContentKind::Album,
        title.clone(),
        parse_year(release.date.as_deref()),
    )
    .map(|m| {
        m.with_artist(artist)
            .with_album(Some(title))
            .with_thumbnail(cover)
            .with_genres(genre_labels(release.genres, release.tags))
    })
}

/// Escape Lucene special characters inside a quoted phrase.
fn lucene_phrase(s: &str) -> String {
    let escaped = s.trim().replace('\\', "\\\\").replace('"', "\\\"");
    format!("\"{escaped}\"")
}

// ---------------------------------------------------------------------------
// Provider implementation
// ---------------------------------------------------------------------------

/// MusicBrainz metadata provider.
pub struct MusicBrainzProvider {
    config: ProviderConfig,
    fetcher: RetryingFetcher,
    base_url: String,
}

impl MusicBrainzProvider {
    /// Create a MusicBrainz provider from its configuration and the shared
    /// context.
    pub fn new(config: ProviderConfig, ctx: &FetchContext) -> Self {
        let fetcher = ctx.fetcher(NAME, config.rate_limit());
        let base_url = config.base_url().unwrap_or(MUSICBRAINZ_BASE_URL).to_string();
        Self {
            config,
            fetcher,
            base_url,
        }
    }

    fn options(&self) -> Result<RequestOptions> {
        let user_agent = self
            .config
            .user_agent()
            .filter(|_| self.config.is_enabled())
            .ok_or_else(|| ProviderError::unavailable(NAME))?;
        Ok(RequestOptions::new()
            .header("User-Agent", user_agent)
            .header("Accept", "application/json")
            .query("fmt", "json"))
    }
}

fn wants_album(hints: &SearchHints) -> bool {
    hints.kind == Some(ContentKind::Album)
}

#[async_trait]
impl MetadataProvider for MusicBrainzProvider {
    fn name(&self) -> &'static str {
        NAME
    }

    fn is_available(&self) -> bool {
        self.config.is_enabled() && self.config.user_agent().is_some()
    }

    async fn search(&self, query: &str, hints: &SearchHints) -> Result<MediaSearchResult> {
        let options = self.options()?;
        let album = wants_album(hints);
        let (entity, field) = if album {
            ("release", "release")
        } else {
            ("recording", "recording")
        };

        let mut lucene = format!("{field}:{}", lucene_phrase(query));
        if let Some(artist) = hints.artist.as_deref().filter(|a| !a.trim().is_empty()) {
            lucene.push_str(&format!(" AND artist:{}", lucene_phrase(artist)));
        }
        let limit = hints.limit.unwrap_or(DEFAULT_LIMIT).clamp(1, 100);
        let options = options
            .query("query", lucene)
            .query("limit", limit.to_string());

        let kind = if album { ContentKind::Album } else { ContentKind::Track };
        let key = cache_key(
            NAME,
            kind.as_str(),
            &[
                query,
                hints.artist.as_deref().unwrap_or(""),
                &limit.to_string(),
            ],
        );
        debug!(entity, cache_key = %key, "MusicBrainz search");

        let url = format!("{}/{entity}", self.base_url);
        let fetched = self.fetcher.fetch_with_cache(&url, &options, &key).await;

        let (records, count) = if album {
            let Some(body) = typed::<ReleaseSearch>(NAME, fetched)? else {
                return Ok(MediaSearchResult::empty(NAME));
            };
            let records: Vec<StandardMetadata> = decode_items::<Release>(NAME, body.releases)
                .into_iter()
                .filter_map(normalize_release)
                .collect();
            (records, body.count)
        } else {
            let Some(body) = typed::<RecordingSearch>(NAME, fetched)? else {
                return Ok(MediaSearchResult::empty(NAME));
            };
            let records: Vec<StandardMetadata> =
                decode_items::<Recording>(NAME, body.recordings)
                    .into_iter()
                    .filter_map(normalize_recording)
                    .collect();
            (records, body.count)
        };

        Ok(MediaSearchResult::from_records(
            NAME,
            hints.truncate(records),
            count,
        ))
    }

    async fn get_details(
        &self,
        source_id: &str,
        hints: &SearchHints,
    ) -> Result<Option<StandardMetadata>> {
        let options = self.options()?;
        let album = wants_album(hints);
        let (entity, inc) = if album {
            ("release", "artist-credits+genres+tags")
        } else {
            ("recording", "artist-credits+releases+genres+tags")
        };
        let options = options.query("inc", inc);
        let url = format!("{}/{entity}/{}", self.base_url, path_segment(source_id.trim()));
        let key = cache_key(NAME, &format!("{entity}_detail"), &[source_id]);
        debug!(entity, cache_key = %key, "MusicBrainz details");

        let fetched = self.fetcher.fetch_with_cache(&url, &options, &key).await;
        if album {
            Ok(typed::<Release>(NAME, fetched)?.and_then(normalize_release))
        } else {
            Ok(typed::<Recording>(NAME, fetched)?.and_then(normalize_recording))
        }
    }
}
