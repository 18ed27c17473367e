//! Metaforged - media metadata lookup across external catalogs
//!
//! This library crate exposes the provider engine for the binary and for
//! integration testing.

pub mod config;
pub mod metadata;

pub use metaforged_common::{
    Category, ContentKind, MediaMatch, MediaSearchResult, ProviderError, StandardMetadata,
};
