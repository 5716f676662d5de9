use std::{error::Error, process, sync::Arc};

use clap::{command, ArgGroup, Parser, ValueHint};
use log::{debug, error, info, warn, LevelFilter};
use url::Url;

use tunebridge::{
    cache::{MemoryCache, ResolutionCache},
    catalog::{Catalog, CatalogClient},
    config::Config,
    credentials::Credentials,
    error::ErrorKind,
    gateway::{Collection, Gateway, SourceListingClient},
    queue::ProgressiveQueue,
    resolver::Resolver,
    token::{AuthProvider, StaticToken},
    track::SourceId,
};

/// Profile to display when not built in release mode.
#[cfg(debug_assertions)]
const BUILD_PROFILE: &str = "debug";
/// Profile to display when not built release mode.
#[cfg(not(debug_assertions))]
const BUILD_PROFILE: &str = "release";

/// Group name for mutually exclusive logging options.
const ARGS_GROUP_LOGGING: &str = "logging";

/// Group name for the mutually exclusive queue sources.
const ARGS_GROUP_SOURCE: &str = "source";

/// Command line arguments as parsed by `clap`.
#[derive(Clone, Debug, PartialEq, Parser)]
#[command(author, version, about, long_about = None)]
#[command(group(ArgGroup::new(ARGS_GROUP_SOURCE).required(true)))]
struct Args {
    /// Secrets file
    ///
    /// Ensure that the this file is kept secure and not shared publicly, as it
    /// contains bearer tokens that grant access to your accounts.
    #[arg(short, long, value_name = "FILE", value_hint = ValueHint::FilePath, default_value_t = String::from("secrets.toml"))]
    secrets_file: String,

    /// Base URL of the playback catalog API
    #[arg(long, value_name = "URL", value_hint = ValueHint::Url, env = "TUNEBRIDGE_CATALOG_URL")]
    catalog_url: Url,

    /// Base URL of the source catalog Web API
    ///
    /// [default: https://api.spotify.com/v1/]
    #[arg(long, value_name = "URL", value_hint = ValueHint::Url, env = "TUNEBRIDGE_SOURCE_URL")]
    source_url: Option<Url>,

    /// Queue the tracks of a playlist
    #[arg(long, value_name = "ID", group = ARGS_GROUP_SOURCE)]
    playlist: Option<String>,

    /// Queue the tracks of an album
    #[arg(long, value_name = "ID", group = ARGS_GROUP_SOURCE)]
    album: Option<String>,

    /// Queue a track followed by recommendations for it
    #[arg(long, value_name = "TRACK_ID", group = ARGS_GROUP_SOURCE)]
    seed: Option<String>,

    /// Position in the listing to start playback at
    #[arg(long, value_name = "INDEX", default_value_t = 0)]
    start: usize,

    /// Number of tracks resolved concurrently per batch
    #[arg(long, value_name = "COUNT")]
    batch_size: Option<usize>,

    /// Minimum match score to accept a candidate, between 0 and 1
    #[arg(long, value_name = "SCORE")]
    threshold: Option<f64>,

    /// Suppresses all output except warnings and errors.
    #[arg(short, long, default_value_t = false, group = ARGS_GROUP_LOGGING)]
    quiet: bool,

    /// Enable verbose logging
    ///
    /// Specify twice for trace logging.
    #[arg(short, long, action = clap::ArgAction::Count, group = ARGS_GROUP_LOGGING)]
    verbose: u8,
}

/// Initializes the logger facade.
///
/// The logging level is determined as follows, in order of precedence from
/// highest to lowest:
/// 1. Command line arguments
/// 2. `RUST_LOG` environment variable
/// 3. Hard coded default
///
/// # Panics
///
/// Panics when a logger facade is already initialized.
fn init_logger(config: &Args) {
    let mut logger = env_logger::Builder::from_env(
        // Note: if you change the default logging level here, then you should
        // probably also change the verbosity levels below.
        env_logger::Env::default().filter_or(env_logger::DEFAULT_FILTER_ENV, "info"),
    );

    if config.quiet || config.verbose > 0 {
        let level = match config.verbose {
            // Quiet and verbose are mutually exclusive.
            0 => LevelFilter::Warn,
            1 => LevelFilter::Debug,
            _ => LevelFilter::Trace,
        };

        // Filter log messages of external crates.
        logger.filter_module(module_path!(), level);
    }

    logger.init();
}

/// Loads the bearer tokens from the secrets file.
fn load_credentials(secrets_file: &str) -> tunebridge::error::Result<Credentials> {
    let credentials = Credentials::from_file(secrets_file);

    if let Err(ref e) = credentials {
        if e.kind == ErrorKind::NotFound {
            info!("read the documentation on how to set your tokens in {secrets_file}");
        }
    }

    credentials
}

/// Builds the configuration out of the defaults and the command line.
fn configure(args: &Args) -> tunebridge::error::Result<Config> {
    let mut config = Config::new()?;

    config.catalog_url = Some(args.catalog_url.clone());
    if let Some(ref url) = args.source_url {
        config.source_url = url.clone();
    }
    if let Some(batch_size) = args.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(threshold) = args.threshold {
        config.match_threshold = threshold;
    }

    config.validate()?;
    Ok(config)
}

/// Main application loop.
///
/// Builds a queue for the requested listing, logs the item playback would
/// start with and then advances until the queue is exhausted.
///
/// # Errors
///
/// Returns an error when the configuration or credentials are invalid, or
/// when the seed track cannot be looked up.
async fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let credentials = load_credentials(&args.secrets_file)?;
    let config = configure(&args)?;

    let source_auth: Arc<dyn AuthProvider> = Arc::new(StaticToken::new(credentials.source));
    let catalog_auth = credentials
        .catalog
        .map(|token| Arc::new(StaticToken::new(token)) as Arc<dyn AuthProvider>);

    let gateway: Arc<dyn SourceListingClient> = Arc::new(Gateway::new(&config, source_auth)?);
    let catalog: Arc<dyn CatalogClient> = Arc::new(Catalog::new(&config, catalog_auth)?);

    let cache = Arc::new(MemoryCache::with_capacity(
        config.cache_capacity,
        config.cache_ttl,
    ));
    let resolver = Arc::new(Resolver::from_config(
        &config,
        catalog,
        Arc::clone(&cache) as Arc<dyn ResolutionCache>,
    ));

    let mut queue = if let Some(id) = args.playlist {
        ProgressiveQueue::for_collection(&config, gateway, Collection::Playlist(id), resolver)
    } else if let Some(id) = args.album {
        ProgressiveQueue::for_collection(&config, gateway, Collection::Album(id), resolver)
    } else if let Some(id) = args.seed {
        let seed = gateway.track(&SourceId::new(id)).await?;
        info!("seeding recommendations with {seed}");
        ProgressiveQueue::for_recommendations(&config, gateway, seed, resolver)
    } else {
        return Err("no playlist, album or seed given".into());
    };

    let snapshot = queue.start(args.start).await;
    let mut position = 0;
    match snapshot.items.first() {
        Some(item) => {
            info!("{position}: {item}");
            position += 1;
        }
        None => warn!("nothing playable at index {}", snapshot.start_index),
    }

    while queue.has_more() {
        tokio::select! {
            // Prioritize shutdown signals.
            biased;

            _ = tokio::signal::ctrl_c() => {
                info!("shutting down gracefully");
                break;
            }

            items = queue.advance() => {
                for item in items {
                    info!("{position}: {item}");
                    position += 1;
                }
            }
        }
    }

    let stats = cache.stats();
    info!(
        "resolved {position} items; cache holds {} entries ({} hits, {} misses)",
        stats.entries, stats.hits, stats.misses
    );

    Ok(())
}

/// Main entry point of the application.
///
/// This function initializes the logger facade, parses the command line
/// arguments, and starts the main application loop.
#[tokio::main]
async fn main() {
    // `clap` handles our command line arguments and help text.
    let args = Args::parse();
    init_logger(&args);

    // Dump command line arguments before we do anything more.
    // This aids in debugging of whatever comes next.
    debug!("Command {:#?}", args);

    let cmd = command!();
    let name = cmd.get_name().to_string();
    let version = cmd.get_version().unwrap_or("UNKNOWN").to_string();

    info!("starting {name}/{version}; {BUILD_PROFILE}");

    if let Err(e) = run(args).await {
        error!("{e}");
        process::exit(1);
    }
}
