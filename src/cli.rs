use clap::{Parser, Subcommand};
use metaforged::ContentKind;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "metaforged")]
#[command(author, version, about = "Media metadata lookup across external catalogs")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Search a category and print the first provider's matches as JSON
    Search {
        /// Category or alias (videos, films, music, books, ...)
        category: String,

        /// Title or free-text query
        query: String,

        /// Content kind (movie, tv, track, album, book, comic, image)
        #[arg(long)]
        kind: Option<ContentKind>,

        /// Release year
        #[arg(long)]
        year: Option<u16>,

        /// Artist name, for music searches
        #[arg(long)]
        artist: Option<String>,

        /// Known TMDB id, for artwork searches
        #[arg(long)]
        tmdb_id: Option<String>,

        /// Try these providers first (repeatable)
        #[arg(short, long = "provider")]
        providers: Vec<String>,
    },

    /// Fetch one item from a named provider and print it as JSON
    Details {
        /// Category or alias
        category: String,

        /// Provider id (tmdb, omdb, musicbrainz, ...)
        provider: String,

        /// The provider's id for the item
        source_id: String,

        /// Content kind
        #[arg(long)]
        kind: Option<ContentKind>,

        /// Release year, for providers whose payloads lack one
        #[arg(long)]
        year: Option<u16>,
    },

    /// List available providers per category
    Apis {
        /// Only this category
        category: Option<String>,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
