//! Metaforged-Common: Shared vocabulary for the metadata engine.
//!
//! This crate provides the types every other part of metaforged speaks:
//!
//! - **Categories**: The closed set of content categories and their aliases
//! - **Content kinds**: What a single match describes (movie, track, book, ...)
//! - **Normalized records**: [`StandardMetadata`], [`MediaMatch`], and
//!   [`MediaSearchResult`]
//! - **Error Handling**: [`ProviderError`] and its result alias
//!
//! # Examples
//!
//! ```
//! use metaforged_common::{Category, ContentKind, MediaMatch, StandardMetadata};
//!
//! // Aliases resolve to one canonical category
//! assert_eq!(Category::resolve("films"), Some(Category::Videos));
//!
//! // Records without a year are never emitted
//! assert!(StandardMetadata::new("tmdb", "1", ContentKind::Movie, "Inception", None).is_none());
//!
//! let record = StandardMetadata::new("tmdb", "27205", ContentKind::Movie, "Inception", Some(2010))
//!     .unwrap();
//! assert_eq!(MediaMatch::from(record).id, "tmdb_movie_27205");
//! ```

pub mod error;
pub mod metadata;
pub mod types;

pub use error::{ProviderError, Result};
pub use metadata::{MediaMatch, MediaSearchResult, StandardMetadata};
pub use types::*;
