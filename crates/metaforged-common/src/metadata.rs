//! Normalized metadata records shared by every provider adapter.

use serde::{Deserialize, Serialize};

use crate::types::ContentKind;

/// Canonical metadata record produced by a provider adapter.
///
/// `source_api` and `source_id` together identify where the record came from.
/// A record always carries a non-empty `title` and a `year`; every other field
/// is `None` (serialized as `null`) when the provider did not supply it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardMetadata {
    /// Provider identifier (e.g. `"tmdb"`).
    pub source_api: String,
    /// The provider's native identifier for this item.
    pub source_id: String,
    /// What this record describes.
    pub kind: ContentKind,
    /// Display title.
    pub title: String,
    /// Release, premiere, or publication year.
    pub year: u16,
    /// Synopsis or summary text.
    pub description: Option<String>,
    /// Poster, cover, or thumbnail URL.
    pub thumbnail_url: Option<String>,
    /// Backdrop or fanart URL.
    pub backdrop_url: Option<String>,
    /// Genre labels.
    pub genres: Vec<String>,
    /// Performing artist, for music.
    pub artist: Option<String>,
    /// Album or release title, for music.
    pub album: Option<String>,
}

impl StandardMetadata {
    /// Start a record from its required fields.
    ///
    /// Returns `None` when the title is blank or the year is unknown, so an
    /// adapter can `filter_map` raw results straight into records.
    pub fn new(
        source_api: impl Into<String>,
        source_id: impl Into<String>,
        kind: ContentKind,
        title: impl Into<String>,
        year: Option<u16>,
    ) -> Option<Self> {
        let title = title.into();
        let title = title.trim();
        if title.is_empty() {
            return None;
        }

        Some(Self {
            source_api: source_api.into(),
            source_id: source_id.into(),
            kind,
            title: title.to_string(),
            year: year?,
            description: None,
            thumbnail_url: None,
            backdrop_url: None,
            genres: Vec::new(),
            artist: None,
            album: None,
        })
    }

    /// Set the description, treating blank text as absent.
    pub fn with_description(mut self, description: Option<String>) -> Self {
        self.description = non_blank(description);
        self
    }

    /// Set the thumbnail URL, treating blank text as absent.
    pub fn with_thumbnail(mut self, url: Option<String>) -> Self {
        self.thumbnail_url = non_blank(url);
        self
    }

    /// Set the backdrop URL, treating blank text as absent.
    pub fn with_backdrop(mut self, url: Option<String>) -> Self {
        self.backdrop_url = non_blank(url);
        self
    }

    /// Set the genre labels, dropping blank entries.
    pub fn with_genres(mut self, genres: impl IntoIterator<Item = String>) -> Self {
        self.genres = genres
            .into_iter()
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .collect();
        self
    }

    /// Set the performing artist.
    pub fn with_artist(mut self, artist: Option<String>) -> Self {
        self.artist = non_blank(artist);
        self
    }

    /// Set the album title.
    pub fn with_album(mut self, album: Option<String>) -> Self {
        self.album = non_blank(album);
        self
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// A [`StandardMetadata`] record with a stable client-side key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaMatch {
    /// `{source_api}_{kind}_{source_id}`.
    pub id: String,
    /// The normalized record.
    #[serde(flatten)]
    pub metadata: StandardMetadata,
}

impl From<StandardMetadata> for MediaMatch {
    fn from(metadata: StandardMetadata) -> Self {
        let id = format!(
            "{}_{}_{}",
            metadata.source_api, metadata.kind, metadata.source_id
        );
        Self { id, metadata }
    }
}

/// Result of one provider's search.
///
/// `source` always names the single provider that produced `matches`; results
/// from different providers are never merged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaSearchResult {
    /// Matches in the provider's own ranking order.
    pub matches: Vec<MediaMatch>,
    /// Total hits reported by the provider (at least `matches.len()`).
    pub total: u64,
    /// Identifier of the provider that answered.
    pub source: String,
}

impl MediaSearchResult {
    /// A result with no matches.
    pub fn empty(source: impl Into<String>) -> Self {
        Self {
            matches: Vec::new(),
            total: 0,
            source: source.into(),
        }
    }

    /// Build a result from normalized records.
    ///
    /// `reported_total` is the provider's own hit count, if it sends one.
    pub fn from_records(
        source: impl Into<String>,
        records: Vec<StandardMetadata>,
        reported_total: Option<u64>,
    ) -> Self {
        let matches: Vec<MediaMatch> = records.into_iter().map(MediaMatch::from).collect();
        let total = if matches.is_empty() {
            0
        } else {
            reported_total
                .unwrap_or(0)
                .max(matches.len() as u64)
        };

        Self {
            matches,
            total,
            source: source.into(),
        }
    }

    /// Whether this result carries no matches.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inception() -> StandardMetadata {
        StandardMetadata::new("tmdb", "27205", ContentKind::Movie, "Inception", Some(2010)).unwrap()
    }

    #[test]
    fn test_required_fields() {
        assert!(StandardMetadata::new("tmdb", "1", ContentKind::Movie, "  ", Some(2010)).is_none());
        let undated = StandardMetadata::new("tmdb", "1", ContentKind::Movie, "Inception", None);
        assert!(undated.is_none());
        assert_eq!(inception().title, "Inception");
    }

    #[test]
    fn test_blank_optionals_become_null() {
        let record = inception()
            .with_description(Some("".to_string()))
            .with_thumbnail(Some("   ".to_string()))
            .with_genres(vec!["Action".to_string(), " ".to_string()]);

        assert_eq!(record.description, None);
        assert_eq!(record.thumbnail_url, None);
        assert_eq!(record.genres, vec!["Action".to_string()]);

        let json = serde_json::to_value(&record).unwrap();
        assert!(json["description"].is_null());
        assert!(json["artist"].is_null());
    }

    #[test]
    fn test_match_id_format() {
        let m = MediaMatch::from(inception());
        assert_eq!(m.id, "tmdb_movie_27205");

        let json = serde_json::to_value(&m).unwrap();
        assert_eq!(json["id"], "tmdb_movie_27205");
        assert_eq!(json["year"], 2010);
    }

    #[test]
    fn test_search_result_total() {
        let result = MediaSearchResult::from_records("tmdb", vec![inception()], Some(42));
        assert_eq!(result.total, 42);
        assert_eq!(result.source, "tmdb");

        let result = MediaSearchResult::from_records("tmdb", vec![inception()], None);
        assert_eq!(result.total, 1);

        let result = MediaSearchResult::from_records("tmdb", Vec::new(), Some(42));
        assert!(result.is_empty());
        assert_eq!(result.total, 0);
    }
}
