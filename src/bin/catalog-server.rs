//! this binary starts the catalog server
//! to see the list of options, type: `catalog-server --help`

use std::env::current_dir;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::process::exit;
use std::time::Duration;

use catalog::config::{claim_data_dir, DEFAULT_ADDRESS};
use catalog::server::MIN_FRAME;
use catalog::thread_pool::{
    NaiveThreadPool, PoolKind, RayonThreadPool, SharedQueueThreadPool, ThreadPool,
};
use catalog::{
    CatalogEngine, CatalogError, CatalogServer, Dispatcher, EngineKind, LogCatalog,
    MemoryCatalog, Result, ServerConfig, SessionLimits, SledCatalog,
};
use clap::{crate_version, App, Arg, ArgMatches};
use tracing::{error, info, Level};
use tracing_subscriber::FmtSubscriber;

fn main() {
    let matches = App::new("catalog-server")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("a multi-threaded movie catalog server")
        .arg(Arg::with_name("addr")
            .long("addr")
            .value_name("IP_ADDR:PORT")
            .help("sets the IP_ADDR:PORT that the server listens on")
            .default_value(DEFAULT_ADDRESS))
        .arg(Arg::with_name("data-dir")
            .long("data-dir")
            .value_name("DIR")
            .help("directory the catalog is kept in (defaults to the current directory)"))
        .arg(Arg::with_name("engine")
            .long("engine")
            .value_name("ENGINE_NAME")
            .help("sets the storage engine to use, either 'sled', 'log' or 'memory'")
            .default_value("sled"))
        .arg(Arg::with_name("pool")
            .long("pool")
            .value_name("POOL")
            .help("how sessions are run: 'naive' (a thread per connection), 'shared' or 'rayon'")
            .default_value("naive"))
        .arg(Arg::with_name("threads")
            .long("threads")
            .value_name("N")
            .help("number of threads of the 'shared' and 'rayon' pools (defaults to the number of CPUs)"))
        .arg(Arg::with_name("max-frame")
            .long("max-frame")
            .value_name("BYTES")
            .help("longest request or response line, newline included")
            .default_value("1024"))
        .arg(Arg::with_name("idle-timeout")
            .long("idle-timeout")
            .value_name("SECONDS")
            .help("close connections that send nothing for this many seconds"))
        .arg(Arg::with_name("accept-retries")
            .long("accept-retries")
            .value_name("N")
            .help("consecutive accept failures tolerated before the server exits")
            .default_value("5"))
        .arg(Arg::with_name("log-level")
            .long("log-level")
            .value_name("LEVEL")
            .help("one of trace, debug, info, warn, error")
            .default_value("info"))
        .get_matches();

    let level = matches
        .value_of("log-level")
        .and_then(|level| level.parse::<Level>().ok())
        .unwrap_or(Level::INFO);
    subscriber_config(level);

    let result = build_config(&matches).and_then(run);
    if let Err(e) = result {
        error!("{}", e);
        exit(1);
    }
}

/// validates the command line options and collects them into a [`ServerConfig`]
///
/// # Errors
/// returns [`CatalogError::Parsing`] if one of the options is invalid
fn build_config(matches: &ArgMatches) -> Result<ServerConfig> {
    let defaults = ServerConfig::default();

    let addr = matches.value_of("addr").unwrap_or(DEFAULT_ADDRESS);
    let addr: SocketAddr = addr.parse().map_err(|_| {
        CatalogError::Parsing(format!("could not parse {} into an IP address and port", addr))
    })?;
    let data_dir = match matches.value_of("data-dir") {
        Some(dir) => PathBuf::from(dir),
        None => current_dir()?,
    };
    let engine: EngineKind = matches.value_of("engine").unwrap_or("sled").parse()?;
    let pool: PoolKind = matches.value_of("pool").unwrap_or("naive").parse()?;
    let threads = match matches.value_of("threads") {
        Some(n) => parse_number::<u32>("threads", n)?.max(1),
        None => defaults.threads,
    };
    let max_frame = parse_number::<usize>("max-frame", matches.value_of("max-frame").unwrap_or("1024"))?;
    if max_frame < MIN_FRAME {
        return Err(CatalogError::Parsing(format!(
            "max-frame must be at least {} bytes",
            MIN_FRAME
        )));
    }
    let idle_timeout = match matches.value_of("idle-timeout") {
        Some(secs) => match parse_number::<u64>("idle-timeout", secs)? {
            0 => return Err(CatalogError::Parsing("idle-timeout must be at least 1 second".to_string())),
            secs => Some(Duration::from_secs(secs)),
        },
        None => None,
    };
    let accept_retries = parse_number::<u32>("accept-retries", matches.value_of("accept-retries").unwrap_or("5"))?;

    Ok(ServerConfig {
        addr,
        data_dir,
        engine,
        pool,
        threads,
        limits: SessionLimits {
            max_frame,
            idle_timeout,
            accept_retries,
        },
    })
}

fn parse_number<T: std::str::FromStr>(option: &str, value: &str) -> Result<T> {
    value
        .parse::<T>()
        .map_err(|_| CatalogError::Parsing(format!("--{} expects a number, got '{}'", option, value)))
}

fn run(config: ServerConfig) -> Result<()> {
    info!("catalog-server {}", env!("CARGO_PKG_VERSION"));
    info!("Storage engine: {}", config.engine);
    info!("Thread pool: {} ({} threads)", config.pool, config.threads);
    info!("Data directory: {:?}", config.data_dir);

    claim_data_dir(&config.data_dir, config.engine)?;

    match config.engine {
        EngineKind::Log => run_with_engine(LogCatalog::open(&config.data_dir)?, &config),
        EngineKind::Sled => run_with_engine(SledCatalog::open(&config.data_dir)?, &config),
        EngineKind::Memory => run_with_engine(MemoryCatalog::new(), &config),
    }
}

fn run_with_engine<E: CatalogEngine>(engine: E, config: &ServerConfig) -> Result<()> {
    let dispatcher = Dispatcher::new(engine);
    match config.pool {
        PoolKind::Naive => run_with_pool(dispatcher, NaiveThreadPool::new(config.threads)?, config),
        PoolKind::Shared => run_with_pool(dispatcher, SharedQueueThreadPool::new(config.threads)?, config),
        PoolKind::Rayon => run_with_pool(dispatcher, RayonThreadPool::new(config.threads)?, config),
    }
}

fn run_with_pool<E: CatalogEngine, P: ThreadPool>(
    dispatcher: Dispatcher<E>,
    pool: P,
    config: &ServerConfig,
) -> Result<()> {
    CatalogServer::new(dispatcher, pool)
        .with_limits(config.limits)
        .run(config.addr)
}

/// configures a tracing subscriber that will log to STDERR
fn subscriber_config(level: Level) {
    let subscriber = FmtSubscriber::builder()
        // spans/events at `level` or more severe are written
        .with_max_level(level)
        // log to stderr instead of stdout
        .with_writer(std::io::stderr)
        // completes the builder.
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting tracing default subscriber failed");
}
