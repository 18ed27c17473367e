//! Ordered, first-success provider search.
//!
//! A [`FallbackChain`] tries its providers one after another and stops at the
//! first non-empty [`MediaSearchResult`]. A provider that errors counts as
//! empty: the failure is logged and the next provider is tried.

use std::sync::Arc;

use metaforged_common::MediaSearchResult;
use tracing::{debug, warn};

use super::provider::{MetadataProvider, SearchHints};

/// An ordered list of available providers for one category.
///
/// Unavailable providers are dropped at construction, so they are never
/// invoked.
///
/// # Examples
///
/// ```rust,ignore
/// let chain = FallbackChain::new(vec![tmdb, omdb]);
/// if let Some(result) = chain.search("Inception", &SearchHints::default()).await {
///     println!("{} answered with {} matches", result.source, result.matches.len());
/// }
/// ```
#[derive(Clone)]
pub struct FallbackChain {
    providers: Vec<Arc<dyn MetadataProvider>>,
}

impl FallbackChain {
    /// Build a chain from `providers`, keeping only those that are available.
    pub fn new(providers: impl IntoIterator<Item = Arc<dyn MetadataProvider>>) -> Self {
        let providers = providers
            .into_iter()
            .filter(|p| {
                let available = p.is_available();
                if !available {
                    debug!(provider = p.name(), "Skipping unavailable provider");
                }
                available
            })
            .collect();
        Self { providers }
    }

    /// Names of the providers in this chain, in the order they are tried.
    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Whether the chain has no provider to try.
    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Try each provider in order and return the first non-empty result.
    ///
    /// Returns `None` when every provider came back empty or failed.
    pub async fn search(&self, query: &str, hints: &SearchHints) -> Option<MediaSearchResult> {
        for provider in &self.providers {
            match provider.search(query, hints).await {
                Ok(result) if !result.is_empty() => {
                    debug!(
                        provider = provider.name(),
                        matches = result.matches.len(),
                        "Provider answered"
                    );
                    return Some(result);
                }
                Ok(_) => {
                    debug!(provider = provider.name(), "No matches; trying next provider");
                }
                Err(e) => {
                    warn!(
                        provider = provider.name(),
                        error = %e,
                        "Provider search failed; trying next provider"
                    );
                }
            }
        }
        None
    }
}

impl std::fmt::Debug for FallbackChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackChain")
            .field("providers", &self.provider_names())
            .finish()
    }
}
