//! Concrete metadata provider implementations.
//!
//! Each submodule wraps a single external API and implements the
//! [`MetadataProvider`](super::MetadataProvider) trait. The helpers here are
//! the shared decode boundary: raw JSON goes in, typed values or `None` come
//! out, and a payload that drifted from the expected shape never becomes an
//! error.

pub mod comicvine;
pub mod discogs;
pub mod fanarttv;
pub mod musicbrainz;
pub mod omdb;
pub mod openlibrary;
pub mod tmdb;

pub use comicvine::ComicVineProvider;
pub use discogs::DiscogsProvider;
pub use fanarttv::FanartTvProvider;
pub use musicbrainz::MusicBrainzProvider;
pub use omdb::OmdbProvider;
pub use openlibrary::OpenLibraryProvider;
pub use tmdb::TmdbProvider;

use std::fmt;

use metaforged_common::Result;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

/// A provider-native identifier that may arrive as a number or a string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum NativeId {
    Number(u64),
    Text(String),
}

impl fmt::Display for NativeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s.trim()),
        }
    }
}

/// A year that may arrive as a number or inside a date string.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub(crate) enum LooseYear {
    Number(u16),
    Text(String),
}

impl LooseYear {
    pub(crate) fn year(&self) -> Option<u16> {
        match self {
            Self::Number(n) if *n > 0 => Some(*n),
            Self::Number(_) => None,
            Self::Text(s) => parse_year(Some(s)),
        }
    }
}

/// Extract a four-digit year from strings like `"2023-04-15"`, `"2010"`, or
/// `"2010–2014"`.
pub(crate) fn parse_year(date: Option<&str>) -> Option<u16> {
    date.map(str::trim)
        .and_then(|d| d.get(..4))
        .and_then(|y| y.parse::<u16>().ok())
        .filter(|y| *y > 0)
}

/// Decode a typed payload from raw JSON, logging and dropping it on mismatch.
pub(crate) fn decode<T: DeserializeOwned>(provider: &str, value: Value) -> Option<T> {
    match serde_json::from_value(value) {
        Ok(decoded) => Some(decoded),
        Err(e) => {
            warn!(provider, error = %e, "Unexpected payload shape; ignoring response");
            None
        }
    }
}

/// Decode each element of a raw JSON array independently, skipping elements
/// that do not match.
pub(crate) fn decode_items<T: DeserializeOwned>(provider: &str, items: Vec<Value>) -> Vec<T> {
    let total = items.len();
    let decoded: Vec<T> = items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect();

    if decoded.len() < total {
        warn!(
            provider,
            skipped = total - decoded.len(),
            "Skipped malformed entries in provider payload"
        );
    }
    decoded
}

/// Map a fetch outcome onto "payload, nothing, or error".
///
/// A body that is not JSON and an HTTP 404 both mean there is nothing to
/// normalize; every other failure is passed up unchanged.
pub(crate) fn payload(provider: &str, fetched: Result<Value>) -> Result<Option<Value>> {
    match fetched {
        Ok(value) => Ok(Some(value)),
        Err(e) if e.is_malformed() => {
            warn!(provider, error = %e, "Provider returned a malformed body");
            Ok(None)
        }
        Err(e) if e.is_not_found() => Ok(None),
        Err(e) => Err(e),
    }
}

/// Fetch-and-decode in one step: see [`payload`] and [`decode`].
pub(crate) fn typed<T: DeserializeOwned>(
    provider: &str,
    fetched: Result<Value>,
) -> Result<Option<T>> {
    Ok(payload(provider, fetched)?.and_then(|value| decode(provider, value)))
}

/// Drop provider placeholders such as OMDb's `"N/A"`.
pub(crate) fn not_placeholder(value: Option<String>) -> Option<String> {
    value.filter(|v| {
        let v = v.trim();
        !v.is_empty() && !v.eq_ignore_ascii_case("n/a")
    })
}

/// Percent-encode one URL path segment.
pub(crate) fn path_segment(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for b in s.bytes() {
        match b {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char);
            }
            _ => {
                out.push('%');
                out.push(char::from(HEX[(b >> 4) as usize]));
                out.push(char::from(HEX[(b & 0x0f) as usize]));
            }
        }
    }
    out
}

const HEX: [u8; 16] = *b"0123456789ABCDEF";

#[cfg(test)]
mod tests {
    use super::*;
    use metaforged_common::ProviderError;

    #[test]
    fn year_parsing() {
        assert_eq!(parse_year(Some("2023-04-15")), Some(2023));
        assert_eq!(parse_year(Some("1999")), Some(1999));
        assert_eq!(parse_year(Some("2010–2014")), Some(2010));
        assert_eq!(parse_year(Some("")), None);
        assert_eq!(parse_year(Some("soon")), None);
        assert_eq!(parse_year(None), None);
    }

    #[test]
    fn loose_values() {
        let id: NativeId = serde_json::from_value(serde_json::json!(27205)).unwrap();
        assert_eq!(id.to_string(), "27205");
        let id: NativeId = serde_json::from_value(serde_json::json!("tt1375666")).unwrap();
        assert_eq!(id.to_string(), "tt1375666");

        let year: LooseYear = serde_json::from_value(serde_json::json!(2010)).unwrap();
        assert_eq!(year.year(), Some(2010));
        let year: LooseYear = serde_json::from_value(serde_json::json!("2010-07-15")).unwrap();
        assert_eq!(year.year(), Some(2010));
        let year: LooseYear = serde_json::from_value(serde_json::json!(0)).unwrap();
        assert_eq!(year.year(), None);
    }

    #[test]
    fn decode_items_skips_bad_entries() {
        #[derive(Deserialize)]
        struct Item {
            #[allow(dead_code)]
            id: u64,
        }

        let items = vec![
            serde_json::json!({"id": 1}),
            serde_json::json!({"id": "not a number"}),
            serde_json::json!({"id": 3}),
        ];
        let decoded: Vec<Item> = decode_items("test", items);
        assert_eq!(decoded.len(), 2);
    }

    #[test]
    fn payload_swallows_absence_only() {
        let malformed = payload("test", Err(ProviderError::decode("test", "bad")));
        assert!(matches!(malformed, Ok(None)));

        let missing = payload(
            "test",
            Err(ProviderError::Status {
                provider: "test".to_string(),
                status: 404,
            }),
        );
        assert!(matches!(missing, Ok(None)));

        let failed = payload(
            "test",
            Err(ProviderError::Status {
                provider: "test".to_string(),
                status: 401,
            }),
        );
        assert!(failed.is_err());
    }

    #[test]
    fn placeholders_and_segments() {
        assert_eq!(not_placeholder(Some("N/A".to_string())), None);
        assert_eq!(not_placeholder(Some("x.jpg".to_string())), Some("x.jpg".to_string()));
        assert_eq!(path_segment("OL45883W"), "OL45883W");
        assert_eq!(path_segment("a/b c"), "a%2Fb%20c");
    }
}
