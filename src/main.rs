mod cli;

use metaforged::config;
use metaforged::metadata::{create_manager_with_config, ProviderManager, SearchHints};
use metaforged::{Category, ContentKind};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use std::collections::HashMap;
use std::path::Path;

fn build_manager(config_path: Option<&Path>) -> Result<ProviderManager> {
    let engine = config::load_config_or_default(config_path)?;
    let env: HashMap<String, String> = std::env::vars().collect();
    Ok(create_manager_with_config(&env, &engine))
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[allow(clippy::too_many_arguments)]
async fn search(
    config_path: Option<&Path>,
    category: &str,
    query: &str,
    kind: Option<ContentKind>,
    year: Option<u16>,
    artist: Option<String>,
    tmdb_id: Option<String>,
    providers: &[String],
) -> Result<()> {
    if Category::resolve(category).is_none() {
        anyhow::bail!("Unknown category: {}", category);
    }
    let manager = build_manager(config_path)?;
    let hints = SearchHints {
        kind,
        year,
        artist,
        tmdb_id,
        ..SearchHints::default()
    };

    let result = if providers.is_empty() {
        manager.search(category, query, &hints).await
    } else {
        let preferred: Vec<&str> = providers.iter().map(String::as_str).collect();
        manager
            .search_with_fallback(category, query, &hints, &preferred)
            .await
    };

    if result.is_none() {
        tracing::info!("No provider returned matches in {}", category);
    }
    print_json(&result)
}

async fn details(
    config_path: Option<&Path>,
    category: &str,
    provider: &str,
    source_id: &str,
    kind: Option<ContentKind>,
    year: Option<u16>,
) -> Result<()> {
    let manager = build_manager(config_path)?;
    let hints = SearchHints {
        kind,
        year,
        ..SearchHints::default()
    };
    let details = manager
        .get_details(category, source_id, provider, &hints)
        .await;
    print_json(&details)
}

fn list_apis(config_path: Option<&Path>, category: Option<&str>) -> Result<()> {
    let manager = build_manager(config_path)?;

    let categories: Vec<Category> = match category {
        Some(name) => match Category::resolve(name) {
            Some(c) => vec![c],
            None => anyhow::bail!("Unknown category: {}", name),
        },
        None => Category::ALL.to_vec(),
    };

    for category in categories {
        let apis = manager.get_available_apis(category.as_str());
        if apis.is_empty() {
            println!("{:<10} (none)", category.as_str());
        } else {
            println!("{:<10} {}", category.as_str(), apis.join(", "));
        }
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            println!("  Cache TTL: {}s", config.cache.ttl_secs);
            println!("  HTTP timeout: {}s", config.http.timeout_secs);
            println!(
                "  Retry: {} attempts, {}ms base delay, jitter {}",
                config.retry.max_attempts,
                config.retry.base_delay_ms,
                if config.retry.jitter { "on" } else { "off" }
            );
            println!("  Provider overrides: {}", config.providers.len());
            for (id, settings) in &config.providers {
                println!(
                    "    {}: {}",
                    id,
                    if settings.enabled { "enabled" } else { "disabled" }
                );
            }
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::EngineConfig::default();
            println!("Default config:");
            println!("  Cache TTL: {}s", config.cache.ttl_secs);
            println!("  HTTP timeout: {}s", config.http.timeout_secs);
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "metaforged=trace,metaforged_common=debug,reqwest=debug".to_string()
        } else {
            "metaforged=warn".to_string()
        }
    });

    // Logs go to stderr so stdout stays valid JSON
    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    let config_path = cli.config.as_deref();
    match cli.command {
        Commands::Search {
            category,
            query,
            kind,
            year,
            artist,
            tmdb_id,
            providers,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(search(
                config_path,
                &category,
                &query,
                kind,
                year,
                artist,
                tmdb_id,
                &providers,
            ))
        }
        Commands::Details {
            category,
            provider,
            source_id,
            kind,
            year,
        } => {
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(details(
                config_path,
                &category,
                &provider,
                &source_id,
                kind,
                year,
            ))
        }
        Commands::Apis { category } => list_apis(config_path, category.as_deref()),
        Commands::Validate {
            config: validate_path,
        } => {
            let path = validate_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("metaforged {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}
