//! Content categories and content kinds.
//!
//! A [`Category`] selects which provider list handles a lookup; a
//! [`ContentKind`] describes what one normalized record is. Both serialize in
//! lowercase.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Alternate category names and the canonical category they resolve to.
const CATEGORY_ALIASES: &[(&str, Category)] = &[
    ("films", Category::Videos),
    ("film", Category::Videos),
    ("movies", Category::Videos),
    ("series", Category::Videos),
    ("shows", Category::Videos),
    ("tv", Category::Videos),
    ("music", Category::Musics),
    ("audio", Category::Musics),
    ("photos", Category::Images),
    ("pictures", Category::Images),
    ("comics", Category::Books),
    ("ebooks", Category::Books),
];

/// Content category a user's file belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Films and TV series.
    Videos,
    /// Tracks and albums.
    Musics,
    /// Pictures and artwork.
    Images,
    /// Generic documents.
    Documents,
    /// Books and comics.
    Books,
    /// Compressed archives.
    Archives,
}

impl Category {
    /// Every canonical category, in display order.
    pub const ALL: [Category; 6] = [
        Category::Videos,
        Category::Musics,
        Category::Images,
        Category::Documents,
        Category::Books,
        Category::Archives,
    ];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Videos => "videos",
            Self::Musics => "musics",
            Self::Images => "images",
            Self::Documents => "documents",
            Self::Books => "books",
            Self::Archives => "archives",
        }
    }

    /// Resolve a category name or alias to its canonical category.
    ///
    /// Matching ignores ASCII case and surrounding whitespace. Canonical names
    /// resolve to themselves, so resolving twice yields the same category.
    pub fn resolve(name: &str) -> Option<Category> {
        let name = name.trim().to_ascii_lowercase();

        if let Some(category) = Self::ALL.iter().find(|c| c.as_str() == name) {
            return Some(*category);
        }

        CATEGORY_ALIASES
            .iter()
            .find(|(alias, _)| *alias == name)
            .map(|(_, category)| *category)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::resolve(s).ok_or_else(|| format!("Unknown category: {}", s))
    }
}

/// What a single normalized record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentKind {
    /// A feature film.
    Movie,
    /// A TV series.
    Tv,
    /// A single music recording.
    Track,
    /// A music release.
    Album,
    /// A book or edition.
    Book,
    /// A comic volume.
    Comic,
    /// A piece of artwork.
    Image,
}

impl ContentKind {
    /// Lowercase name used in match ids and cache keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Movie => "movie",
            Self::Tv => "tv",
            Self::Track => "track",
            Self::Album => "album",
            Self::Book => "book",
            Self::Comic => "comic",
            Self::Image => "image",
        }
    }
}

impl fmt::Display for ContentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ContentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "movie" | "film" => Ok(Self::Movie),
            "tv" | "series" | "show" => Ok(Self::Tv),
            "track" | "recording" | "song" => Ok(Self::Track),
            "album" | "release" => Ok(Self::Album),
            "book" => Ok(Self::Book),
            "comic" => Ok(Self::Comic),
            "image" | "artwork" => Ok(Self::Image),
            _ => Err(format!("Invalid content kind: {}", s)),
        }
    }
}
