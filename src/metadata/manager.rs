//! Category registry and the public lookup entry point.
//!
//! A [`ProviderManager`] maps each [`Category`] to an ordered provider list
//! and keeps one [`FallbackChain`] per category over the available ones.
//! Category names are resolved through the alias table first, so `"films"`
//! and `"videos"` behave identically. Nothing here returns an error: a
//! lookup that cannot be answered is `None`.

use std::collections::HashMap;
use std::sync::Arc;

use metaforged_common::{Category, MediaSearchResult, StandardMetadata};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;

use super::cache::ResponseCache;
use super::fallback::FallbackChain;
use super::fetcher::FetchContext;
use super::provider::{MetadataProvider, ProviderConfig, SearchHints};
use super::providers::{
    comicvine, discogs, fanarttv, musicbrainz, omdb, openlibrary, tmdb, ComicVineProvider,
    DiscogsProvider, FanartTvProvider, MusicBrainzProvider, OmdbProvider, OpenLibraryProvider,
    TmdbProvider,
};
use super::rate_limit::RateLimit;

// ---------------------------------------------------------------------------
// Environment wiring
// ---------------------------------------------------------------------------

/// Which [`ProviderConfig`] slot an environment variable fills.
#[derive(Debug, Clone, Copy)]
enum Credential {
    ApiKey,
    ClientId,
    ClientSecret,
    UserAgent,
}

/// Provider id, variable name, slot.
const ENV_CREDENTIALS: &[(&str, &str, Credential)] = &[
    ("tmdb", "TMDB_API_KEY", Credential::ApiKey),
    ("omdb", "OMDB_API_KEY", Credential::ApiKey),
    ("musicbrainz", "MUSICBRAINZ_USER_AGENT", Credential::UserAgent),
    ("discogs", "DISCOGS_CONSUMER_KEY", Credential::ClientId),
    ("discogs", "DISCOGS_CONSUMER_SECRET", Credential::ClientSecret),
    ("fanarttv", "FANARTTV_API_KEY", Credential::ApiKey),
    ("openlibrary", "OPENLIBRARY_USER_AGENT", Credential::UserAgent),
    ("comicvine", "COMICVINE_API_KEY", Credential::ApiKey),
];

/// Every provider id with its default budget, in registration order.
const PROVIDERS: &[(&str, RateLimit)] = &[
    ("tmdb", tmdb::DEFAULT_RATE_LIMIT),
    ("omdb", omdb::DEFAULT_RATE_LIMIT),
    ("musicbrainz", musicbrainz::DEFAULT_RATE_LIMIT),
    ("discogs", discogs::DEFAULT_RATE_LIMIT),
    ("fanarttv", fanarttv::DEFAULT_RATE_LIMIT),
    ("openlibrary", openlibrary::DEFAULT_RATE_LIMIT),
    ("comicvine", comicvine::DEFAULT_RATE_LIMIT),
];

/// Providers that identify themselves by User-Agent alone fall back to the
/// engine's own.
const KEYLESS: &[&str] = &["musicbrainz", "openlibrary"];

/// Whether `id` names a provider this engine can build.
pub fn is_known_provider(id: &str) -> bool {
    PROVIDERS.iter().any(|(known, _)| *known == id)
}

fn env_value<'a>(env: &'a HashMap<String, String>, name: &str) -> Option<&'a str> {
    env.get(name).map(|v| v.trim()).filter(|v| !v.is_empty())
}

/// Budget for `id`: `<ID>_RATE_LIMIT` wins over the config file, which wins
/// over the provider default.
fn rate_limit_for(
    id: &str,
    default: RateLimit,
    env: &HashMap<String, String>,
    engine: &EngineConfig,
) -> RateLimit {
    let configured = engine
        .provider(id)
        .map(|s| s.rate_limit(default))
        .unwrap_or(default);

    let var = format!("{}_RATE_LIMIT", id.to_uppercase());
    match env_value(env, &var).map(str::parse::<RateLimit>) {
        Some(Ok(limit)) => limit,
        Some(Err(e)) => {
            warn!(provider = id, "Ignoring {}: {}", var, e);
            configured
        }
        None => configured,
    }
}

/// Build one provider's configuration from the environment and config file.
fn provider_config(
    id: &str,
    default: RateLimit,
    env: &HashMap<String, String>,
    engine: &EngineConfig,
) -> ProviderConfig {
    let settings = engine.provider(id);
    let mut config = ProviderConfig::new(rate_limit_for(id, default, env, engine))
        .enabled(settings.map_or(true, |s| s.enabled));

    if let Some(url) = settings.and_then(|s| s.base_url.as_deref()) {
        config = config.with_base_url(url);
    }
    if KEYLESS.contains(&id) {
        config = config.with_user_agent(engine.http.user_agent.as_str());
    }

    for (_, var, slot) in ENV_CREDENTIALS.iter().filter(|(p, _, _)| *p == id) {
        let Some(value) = env_value(env, var) else {
            continue;
        };
        config = match slot {
            Credential::ApiKey => config.with_api_key(value),
            Credential::ClientId => config.with_client_id(value),
            Credential::ClientSecret => config.with_client_secret(value),
            Credential::UserAgent => config.with_user_agent(value),
        };
    }
    config
}

/// Build a fully wired manager from environment-shaped credentials and the
/// default engine settings.
///
/// Each provider is enabled only when its required variables are present;
/// see [`create_manager_with_config`].
pub fn create_manager_from_env(env: &HashMap<String, String>) -> ProviderManager {
    create_manager_with_config(env, &EngineConfig::default())
}

/// Build a fully wired manager from environment-shaped credentials and an
/// explicit engine configuration.
///
/// | category | providers, in fallback order |
/// |----------|------------------------------|
/// | videos   | tmdb, omdb                   |
/// | musics   | musicbrainz, discogs         |
/// | images   | fanarttv                     |
/// | books    | openlibrary, comicvine       |
pub fn create_manager_with_config(
    env: &HashMap<String, String>,
    engine: &EngineConfig,
) -> ProviderManager {
    let client = FetchContext::build_client(&engine.http.user_agent, engine.http.timeout());
    let ctx = FetchContext::new(
        client,
        Arc::new(ResponseCache::new(engine.cache.ttl())),
        engine.retry.policy(),
        engine.http.timeout(),
    );

    let config = |id: &str| {
        let default = PROVIDERS
            .iter()
            .find(|(known, _)| *known == id)
            .map(|(_, limit)| *limit)
            .unwrap_or(RateLimit::new(1, 1_000));
        provider_config(id, default, env, engine)
    };

    let mut manager = ProviderManager::new(ctx.clone());
    manager.register(
        Category::Videos,
        Arc::new(TmdbProvider::new(config("tmdb"), &ctx)),
    );
    manager.register(
        Category::Videos,
        Arc::new(OmdbProvider::new(config("omdb"), &ctx)),
    );
    manager.register(
        Category::Musics,
        Arc::new(MusicBrainzProvider::new(config("musicbrainz"), &ctx)),
    );
    manager.register(
        Category::Musics,
        Arc::new(DiscogsProvider::new(config("discogs"), &ctx)),
    );
    manager.register(
        Category::Images,
        Arc::new(FanartTvProvider::new(config("fanarttv"), &ctx)),
    );
    manager.register(
        Category::Books,
        Arc::new(OpenLibraryProvider::new(config("openlibrary"), &ctx)),
    );
    manager.register(
        Category::Books,
        Arc::new(ComicVineProvider::new(config("comicvine"), &ctx)),
    );

    info!(
        available = ?manager.available_providers(),
        "Metadata providers ready"
    );
    manager
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Registry of providers per category and the single public lookup surface.
pub struct ProviderManager {
    registry: HashMap<Category, Vec<Arc<dyn MetadataProvider>>>,
    chains: HashMap<Category, FallbackChain>,
    context: FetchContext,
}

impl ProviderManager {
    /// Create an empty manager around a shared fetch context.
    pub fn new(context: FetchContext) -> Self {
        Self {
            registry: HashMap::new(),
            chains: HashMap::new(),
            context,
        }
    }

    /// Append `provider` to `category`'s fallback order.
    pub fn register(&mut self, category: Category, provider: Arc<dyn MetadataProvider>) {
        let providers = self.registry.entry(category).or_default();
        providers.push(provider);
        self.chains
            .insert(category, FallbackChain::new(providers.iter().cloned()));
    }

    fn resolve(category: &str) -> Option<Category> {
        let resolved = Category::resolve(category);
        if resolved.is_none() {
            warn!(category, "Unknown metadata category");
        }
        resolved
    }

    fn providers(&self, category: Category) -> &[Arc<dyn MetadataProvider>] {
        self.registry
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Search `category` for `query`, trying its providers in order.
    ///
    /// Returns the first provider's non-empty result, or `None` when the
    /// category is unknown, has no available provider, or nobody matched.
    pub async fn search(
        &self,
        category: &str,
        query: &str,
        hints: &SearchHints,
    ) -> Option<MediaSearchResult> {
        let category = Self::resolve(category)?;
        if query.trim().is_empty() {
            debug!(%category, "Ignoring blank query");
            return None;
        }
        let chain = self.chains.get(&category)?;
        chain.search(query, hints).await
    }

    /// Like [`search`](Self::search), but providers named in `preferred` go
    /// first, in that order, followed by the rest in registry order.
    ///
    /// Unknown or unavailable names in `preferred` are ignored.
    pub async fn search_with_fallback(
        &self,
        category: &str,
        query: &str,
        hints: &SearchHints,
        preferred: &[&str],
    ) -> Option<MediaSearchResult> {
        let category = Self::resolve(category)?;
        if query.trim().is_empty() {
            return None;
        }

        let providers = self.providers(category);
        let ordered = preferred
            .iter()
            .filter_map(|name| providers.iter().find(|p| p.name() == *name))
            .chain(providers.iter().filter(|p| !preferred.contains(&p.name())))
            .cloned();
        let chain = FallbackChain::new(ordered);
        debug!(%category, order = ?chain.provider_names(), "Search with preferred order");
        chain.search(query, hints).await
    }

    /// Fetch one item from a named provider, bypassing the fallback chain.
    ///
    /// Returns `None` when the provider is not registered for `category`, is
    /// unavailable, failed, or has no such item.
    pub async fn get_details(
        &self,
        category: &str,
        source_id: &str,
        provider_name: &str,
        hints: &SearchHints,
    ) -> Option<StandardMetadata> {
        let category = Self::resolve(category)?;
        let Some(provider) = self
            .providers(category)
            .iter()
            .find(|p| p.name() == provider_name)
        else {
            debug!(%category, provider = provider_name, "Provider not registered for category");
            return None;
        };
        if !provider.is_available() {
            debug!(provider = provider_name, "Provider unavailable");
            return None;
        }

        match provider.get_details(source_id, hints).await {
            Ok(details) => details,
            Err(e) => {
                warn!(provider = provider_name, error = %e, "Detail lookup failed");
                None
            }
        }
    }

    /// Whether at least one provider for `category` is available.
    pub fn is_category_available(&self, category: &str) -> bool {
        Category::resolve(category)
            .is_some_and(|c| self.providers(c).iter().any(|p| p.is_available()))
    }

    /// Ids of the available providers for `category`, in fallback order.
    pub fn get_available_apis(&self, category: &str) -> Vec<&'static str> {
        Category::resolve(category)
            .map(|c| {
                self.providers(c)
                    .iter()
                    .filter(|p| p.is_available())
                    .map(|p| p.name())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Canonical categories that have at least one registered provider.
    pub fn categories(&self) -> Vec<Category> {
        Category::ALL
            .into_iter()
            .filter(|c| !self.providers(*c).is_empty())
            .collect()
    }

    /// Drop every cached provider response.
    pub fn clear_cache(&self) {
        self.context.cache().clear();
        info!("Metadata response cache cleared");
    }

    /// The shared fetch context (cache and per-provider limiters).
    pub fn context(&self) -> &FetchContext {
        &self.context
    }

    fn available_providers(&self) -> Vec<&'static str> {
        Category::ALL
            .into_iter()
            .flat_map(|c| self.get_available_apis(c.as_str()))
            .collect()
    }
}

impl std::fmt::Debug for ProviderManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderManager")
            .field("chains", &self.chains)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::fallback::tests::StubProvider;

    fn env(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    fn stub_manager() -> (ProviderManager, Arc<StubProvider>, Arc<StubProvider>) {
        let empty = StubProvider::answering("empty", &[]);
        let full = StubProvider::answering("full", &["Inception"]);
        let mut manager = ProviderManager::new(FetchContext::default());
        manager.register(Category::Videos, empty.clone());
        manager.register(Category::Videos, full.clone());
        manager.register(Category::Books, StubProvider::offline("offline"));
        (manager, empty, full)
    }

    #[tokio::test]
    async fn aliases_reach_the_same_chain() {
        let (manager, _, _) = stub_manager();
        let hints = SearchHints::default();

        let canonical = manager.search("videos", "Inception", &hints).await.unwrap();
        let alias = manager.search("films", "Inception", &hints).await.unwrap();
        assert_eq!(canonical, alias);
        assert_eq!(alias.source, "full");
    }

    #[tokio::test]
    async fn unknown_or_empty_categories_give_none() {
        let (manager, _, _) = stub_manager();
        let hints = SearchHints::default();

        assert!(manager.search("podcasts", "Inception", &hints).await.is_none());
        assert!(manager.search("books", "Inception", &hints).await.is_none());
        assert!(manager.search("archives", "Inception", &hints).await.is_none());
        assert!(manager.search("videos", "   ", &hints).await.is_none());
    }

    #[tokio::test]
    async fn preferred_providers_go_first() {
        let (manager, empty, full) = stub_manager();
        let result = manager
            .search_with_fallback("videos", "Inception", &SearchHints::default(), &["full"])
            .await
            .unwrap();
        assert_eq!(result.source, "full");
        assert_eq!(full.calls(), 1);
        assert_eq!(empty.calls(), 0);
    }

    #[tokio::test]
    async fn details_go_to_the_named_provider_only() {
        let (manager, empty, full) = stub_manager();
        let hints = SearchHints::default();

        let details = manager
            .get_details("films", "inception", "full", &hints)
            .await
            .unwrap();
        assert_eq!(details.title, "Inception");
        assert_eq!(empty.calls(), 0);

        assert!(manager
            .get_details("videos", "inception", "missing", &hints)
            .await
            .is_none());
        assert!(manager
            .get_details("books", "inception", "offline", &hints)
            .await
            .is_none());
        assert!(manager
            .get_details("musics", "inception", "full", &hints)
            .await
            .is_none());
        assert_eq!(full.calls(), 1);
    }

    #[test]
    fn availability_and_categories() {
        let (manager, _, _) = stub_manager();
        assert!(manager.is_category_available("series"));
        assert!(!manager.is_category_available("books"));
        assert!(!manager.is_category_available("nonsense"));
        assert_eq!(manager.get_available_apis("videos"), vec!["empty", "full"]);
        assert!(manager.get_available_apis("books").is_empty());
        assert_eq!(manager.categories(), vec![Category::Videos, Category::Books]);
    }

    #[test]
    fn env_factory_gates_on_credentials() {
        let manager = create_manager_from_env(&env(&[
            ("TMDB_API_KEY", "tmdb-secret"),
            ("DISCOGS_CONSUMER_KEY", "only-half"),
        ]));

        assert_eq!(manager.get_available_apis("videos"), vec!["tmdb"]);
        assert_eq!(manager.get_available_apis("music"), vec!["musicbrainz"]);
        assert_eq!(manager.get_available_apis("books"), vec!["openlibrary"]);
        assert!(!manager.is_category_available("images"));
        assert!(!manager.is_category_available("documents"));
    }

    #[test]
    fn env_rate_limit_overrides() {
        let manager = create_manager_from_env(&env(&[
            ("TMDB_API_KEY", "k"),
            ("TMDB_RATE_LIMIT", "2/500"),
            ("OMDB_RATE_LIMIT", "garbage"),
        ]));

        let tmdb = format!("{:?}", manager.context().limiter("tmdb").unwrap());
        assert!(tmdb.contains("max_requests: 2"));
        assert!(tmdb.contains("500ms"));
        assert!(manager.context().limiter("omdb").is_some());
    }

    #[test]
    fn config_can_disable_a_provider() {
        let mut engine = EngineConfig::default();
        engine.providers.insert(
            "tmdb".to_string(),
            crate::config::ProviderSettings {
                enabled: false,
                ..Default::default()
            },
        );
        let manager = create_manager_with_config(&env(&[("TMDB_API_KEY", "k")]), &engine);
        assert!(!manager.is_category_available("videos"));
    }

    #[test]
    fn known_providers() {
        assert!(is_known_provider("discogs"));
        assert!(!is_known_provider("opensubtitles"));
    }
}
