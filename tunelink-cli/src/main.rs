use std::{path::PathBuf, sync::OnceLock};

use clap::Parser;
use eyre::{Context as _, Result};
use serde::Serialize;
use tracing_subscriber::EnvFilter;
use tunelink::{EntityKind, PrefetchOptions, RankedItem, SearchError, SearchQuery};

mod backfill;

static OUTPUT_JSON: OnceLock<bool> = OnceLock::new();

#[derive(Debug, Parser)]
struct Args {
    /// Directory holding the durable artwork cache.
    #[clap(long, default_value = ".tunelink", env = "TUNELINK_DATA_DIR")]
    data_dir: PathBuf,

    #[clap(long, env = "SPOTIFY_CLIENT_ID")]
    spotify_client_id: Option<String>,

    #[clap(long, env = "SPOTIFY_CLIENT_SECRET")]
    spotify_client_secret: Option<String>,

    #[clap(long, env = "TUNELINK_MARKET")]
    market: Option<String>,

    #[clap(long, env = "TUNELINK_JSON")]
    json: bool,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Debug, Parser)]
enum Command {
    Search(SearchArgs),
    Charts,
    Resolve(ResolveArgs),
    Artwork(ArtworkArgs),
}

#[derive(Debug, Serialize)]
struct Item {
    kind: EntityKind,
    id: String,
    title: String,
    subtitle: Option<String>,
    artwork_url: Option<String>,
    explicit: bool,
    url: Option<String>,
}

impl From<RankedItem> for Item {
    fn from(item: RankedItem) -> Self {
        Self {
            kind: item.kind,
            url: item.external_urls.values().next().cloned(),
            id: item.id.to_string(),
            title: item.title,
            subtitle: item.subtitle,
            artwork_url: item.artwork_url,
            explicit: item.explicit,
        }
    }
}

impl std::fmt::Display for Item {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}\t{}\t{}{}\t{}\t{}",
            self.kind,
            self.id,
            self.title,
            if self.explicit { " [E]" } else { "" },
            self.subtitle.as_deref().unwrap_or_default(),
            self.url.as_deref().unwrap_or_default(),
        )
    }
}

#[derive(Debug, Serialize)]
struct Artwork {
    entity_id: String,
    artwork_url: String,
}

impl std::fmt::Display for Artwork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}\t{}", self.entity_id, self.artwork_url)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let _ = OUTPUT_JSON.set(args.json);
    let context = create_context(&args)?;

    match args.command {
        Command::Search(cargs) => cmd_search(&context, cargs).await?,
        Command::Charts => cmd_charts(&context).await?,
        Command::Resolve(cargs) => cmd_resolve(&context, cargs).await?,
        Command::Artwork(cargs) => match cargs.command {
            ArtworkCommand::Get(cargs) => cmd_artwork_get(&context, cargs).await?,
            ArtworkCommand::Seed(cargs) => cmd_artwork_seed(&context, cargs).await?,
            ArtworkCommand::Prefetch(cargs) => cmd_artwork_prefetch(&context, cargs).await?,
        },
    }

    Ok(())
}

fn create_context(args: &Args) -> Result<tunelink::Context> {
    let mut config = tunelink::Config::new(tunelink::StorageBackend::Filesystem {
        path: args.data_dir.clone(),
    });

    match (&args.spotify_client_id, &args.spotify_client_secret) {
        (Some(id), Some(secret)) => {
            let mut spotify = tunelink_spotify::SpotifyClient::new(id, secret);
            if let Some(market) = &args.market {
                spotify = spotify.with_market(market);
            }
            config.register_provider(0, "spotify", spotify)?;
        }
        (None, None) => tracing::info!("spotify credentials not set, using deezer only"),
        _ => eyre::bail!("both the spotify client id and secret are required"),
    }
    config.register_provider(1, "deezer", tunelink_deezer::DeezerClient::default())?;

    tunelink::new(config).context("creating context")
}

fn artwork_cache(context: &tunelink::Context) -> tunelink::MetadataBackfillCache {
    context.artwork_cache(
        backfill::SearchLister(context.clone()),
        backfill::LinkFetcher(context.clone()),
    )
}

#[derive(Debug, Parser)]
struct SearchArgs {
    #[clap(long)]
    kind: Option<EntityKind>,

    query: String,
}

async fn cmd_search(context: &tunelink::Context, args: SearchArgs) -> Result<()> {
    let mut query = SearchQuery::new(&args.query);
    if let Some(kind) = args.kind {
        query = query.with_kind(kind);
    }
    let results = match context.search().search(&query).await {
        Ok(results) => results,
        Err(SearchError::AllProvidersFailed(err)) => {
            for (provider, err) in err.failures() {
                tracing::error!("{provider}: {err}");
            }
            eyre::bail!("no results, try again")
        }
        Err(err) => return Err(err.into()),
    };
    let items = tunelink::rank(&results, &args.query)
        .into_iter()
        .map(Item::from)
        .collect::<Vec<_>>();
    stdout_values(&items)
}

async fn cmd_charts(context: &tunelink::Context) -> Result<()> {
    let charts = context.charts().top_charts().await?;
    let items = tunelink::rank(&charts, "")
        .into_iter()
        .map(Item::from)
        .collect::<Vec<_>>();
    stdout_values(&items)
}

#[derive(Debug, Parser)]
struct ResolveArgs {
    url: String,
}

async fn cmd_resolve(context: &tunelink::Context, args: ResolveArgs) -> Result<()> {
    let entity = context
        .search()
        .resolve(&args.url)
        .await
        .with_context(|| format!("resolving {}", args.url))?;
    stdout_value(Item::from(backfill::ranked(&entity)))
}

#[derive(Debug, Parser)]
struct ArtworkArgs {
    #[clap(subcommand)]
    command: ArtworkCommand,
}

#[derive(Debug, Parser)]
enum ArtworkCommand {
    Get(ArtworkGetArgs),
    Seed(ArtworkSeedArgs),
    Prefetch(ArtworkPrefetchArgs),
}

#[derive(Debug, Parser)]
struct ArtworkGetArgs {
    entity_id: String,
}

async fn cmd_artwork_get(context: &tunelink::Context, args: ArtworkGetArgs) -> Result<()> {
    let cache = artwork_cache(context);
    match cache.get(&args.entity_id).await {
        Some(artwork_url) => stdout_value(Artwork {
            entity_id: args.entity_id,
            artwork_url,
        }),
        None => eyre::bail!("no artwork cached for {}", args.entity_id),
    }
}

#[derive(Debug, Parser)]
struct ArtworkSeedArgs {
    entity_id: String,

    artwork_url: String,
}

async fn cmd_artwork_seed(context: &tunelink::Context, args: ArtworkSeedArgs) -> Result<()> {
    let cache = artwork_cache(context);
    cache.seed(&args.entity_id, &args.artwork_url).await;
    Ok(())
}

#[derive(Debug, Parser)]
struct ArtworkPrefetchArgs {
    #[clap(long, default_value_t = tunelink::DEFAULT_PAGE_SIZE)]
    page_size: usize,

    #[clap(long, default_value_t = tunelink::DEFAULT_MAX_BACKFILL)]
    max_backfill: usize,

    /// Search query whose results get their missing artwork filled in.
    query: String,
}

async fn cmd_artwork_prefetch(
    context: &tunelink::Context,
    args: ArtworkPrefetchArgs,
) -> Result<()> {
    let cache = artwork_cache(context);
    let options = PrefetchOptions {
        page_size: args.page_size,
        max_backfill: args.max_backfill,
    };
    cache.prefetch_for_owner(&args.query, options).await;
    let entries = cache
        .entries()
        .await
        .into_iter()
        .map(|entry| Artwork {
            entity_id: entry.entity_id,
            artwork_url: entry.artwork_url,
        })
        .collect::<Vec<_>>();
    stdout_values(&entries)
}

fn output_json() -> bool {
    OUTPUT_JSON.get().copied().unwrap_or(false)
}

fn stdout_value<T: std::fmt::Display + Serialize>(value: T) -> Result<()> {
    use std::io::Write;
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    if output_json() {
        serde_json::to_writer_pretty(&mut stdout, &value)?;
        writeln!(stdout)?;
    } else {
        writeln!(stdout, "{}", value)?;
    }
    Ok(())
}

fn stdout_values<T: std::fmt::Display + Serialize>(values: &[T]) -> Result<()> {
    use std::io::Write;
    let stdout = std::io::stdout();
    let mut stdout = stdout.lock();
    if output_json() {
        serde_json::to_writer_pretty(&mut stdout, &values)?;
        writeln!(stdout)?;
    } else {
        for value in values {
            writeln!(stdout, "{}", value)?;
        }
    }
    Ok(())
}
