//! `reelsource` CLI - search, classify and resolve playable sources

mod cmd;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use tracing_subscriber::EnvFilter;

use reelsource::{AggregationRequest, CachePolicy, SizeOrder};

#[derive(Parser)]
#[command(name = "reelsource")]
#[command(about = "Find playable movie and episode sources across stream providers")]
#[command(version)]
struct Cli {
    /// Directory holding config.toml and providers.json
    #[arg(long, global = true, env = "REELSOURCE_CONFIG_DIR")]
    config_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search every configured source for an IMDb id
    Search {
        /// IMDb id, e.g. tt0111161
        imdb_id: String,

        /// Season number (episodes only)
        #[arg(long, requires = "episode")]
        season: Option<u32>,

        /// Episode number (episodes only)
        #[arg(long, requires = "season")]
        episode: Option<u32>,

        /// Sort by size
        #[arg(long, value_enum, default_value = "desc")]
        sort: SortArg,

        /// Keep only streams the debrid service has cached
        #[arg(long, conflicts_with = "exploratory")]
        cached_only: bool,

        /// Keep uncached streams, tagging cached ones (default)
        #[arg(long)]
        exploratory: bool,

        /// Also list matching files already in the debrid library
        #[arg(long)]
        library: bool,

        /// Print the result as JSON
        #[arg(long)]
        json: bool,
    },

    /// Manage installed third-party providers
    Providers {
        #[command(subcommand)]
        action: ProvidersAction,
    },

    /// Resolve an info hash to direct URLs through the debrid service
    Resolve {
        /// 40-character hex info hash
        info_hash: String,

        /// File index inside the torrent
        #[arg(long)]
        file: Option<u32>,
    },

    /// Classify a release title
    Classify {
        /// Release title or stream description
        text: String,

        /// Print the classification as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ProvidersAction {
    /// List installed providers in order
    List,
    /// Install a provider from its manifest URL
    Install {
        /// Manifest URL (or addon base URL)
        url: String,
    },
    /// Remove a provider by id
    Remove {
        /// Provider id
        id: String,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum SortArg {
    Asc,
    Desc,
}

impl From<SortArg> for SizeOrder {
    fn from(arg: SortArg) -> Self {
        match arg {
            SortArg::Asc => SizeOrder::Ascending,
            SortArg::Desc => SizeOrder::Descending,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reelsource=info")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();
    let config_dir = cli.config_dir.unwrap_or_else(reelsource::config::config_dir);

    match cli.command {
        Commands::Search {
            imdb_id,
            season,
            episode,
            sort,
            cached_only,
            exploratory: _,
            library,
            json,
        } => {
            let policy = if cached_only {
                CachePolicy::CachedOnly
            } else {
                CachePolicy::Exploratory
            };
            let request = match season.zip(episode) {
                Some((season, episode)) => AggregationRequest::episode(&imdb_id, season, episode),
                None => AggregationRequest::movie(&imdb_id),
            }
            .with_sort(sort.into())
            .with_cache_policy(policy);
            let request = if library { request.with_library() } else { request };
            cmd::search::cmd_search(&config_dir, &request, json).await?;
        }
        Commands::Providers { action } => match action {
            ProvidersAction::List => cmd::providers::cmd_list(&config_dir).await?,
            ProvidersAction::Install { url } => {
                cmd::providers::cmd_install(&config_dir, &url).await?;
            }
            ProvidersAction::Remove { id } => cmd::providers::cmd_remove(&config_dir, &id).await?,
        },
        Commands::Resolve { info_hash, file } => {
            cmd::resolve::cmd_resolve(&config_dir, &info_hash, file).await?;
        }
        Commands::Classify { text, json } => cmd::classify::cmd_classify(&text, json)?,
    }

    Ok(())
}
