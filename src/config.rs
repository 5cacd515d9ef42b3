//! Server configuration and the data directory engine marker.
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::warn;

use crate::engine::EngineKind;
use crate::frame::DEFAULT_MAX_FRAME;
use crate::thread_pool::PoolKind;
use crate::{CatalogError, Result};

/// default address the server listens on
pub const DEFAULT_ADDRESS: &str = "0.0.0.0:8080";

/// default address the client connects to
pub const DEFAULT_CLIENT_ADDRESS: &str = "127.0.0.1:8080";

/// consecutive accept failures tolerated before the server gives up
pub const DEFAULT_ACCEPT_RETRIES: u32 = 5;

// the name of the marker file recording which engine owns a data directory
const ENGINE_FILE: &str = "engine";

/// Everything a catalog server is started with
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// address to listen on
    pub addr: SocketAddr,
    /// directory the engine keeps its data in
    pub data_dir: PathBuf,
    /// which storage engine to use
    pub engine: EngineKind,
    /// which thread pool runs the sessions
    pub pool: PoolKind,
    /// size of fixed thread pools, ignored by the naive pool
    pub threads: u32,
    /// limits applied to every session and to the accept loop
    pub limits: SessionLimits,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            addr: SocketAddr::from(([0, 0, 0, 0], 8080)),
            data_dir: PathBuf::from("."),
            engine: EngineKind::Sled,
            pool: PoolKind::Naive,
            threads: num_cpus::get().max(1) as u32,
            limits: SessionLimits::default(),
        }
    }
}

/// Bounds on sessions and on the accept loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionLimits {
    /// longest request or response line, delimiter included
    pub max_frame: usize,
    /// close a session that sends nothing for this long
    pub idle_timeout: Option<Duration>,
    /// consecutive accept failures tolerated before the server stops
    pub accept_retries: u32,
}

impl Default for SessionLimits {
    fn default() -> Self {
        SessionLimits {
            max_frame: DEFAULT_MAX_FRAME,
            idle_timeout: None,
            accept_retries: DEFAULT_ACCEPT_RETRIES,
        }
    }
}

/// Makes sure `data_dir` is used with a single engine.
///
/// The first start records `engine` in a marker file; later starts must ask for the same
/// engine. The memory engine keeps nothing on disk and is always accepted.
///
/// # Errors
/// returns [`CatalogError::Parsing`] if the directory already belongs to another engine
pub fn claim_data_dir(data_dir: &Path, engine: EngineKind) -> Result<()> {
    if engine == EngineKind::Memory {
        return Ok(());
    }
    fs::create_dir_all(data_dir)?;
    match current_engine(data_dir)? {
        Some(current) if current != engine => Err(CatalogError::Parsing(format!(
            "the requested engine: {} does not match the engine currently in use: {}",
            engine, current
        ))),
        Some(_) => Ok(()),
        None => {
            fs::write(data_dir.join(ENGINE_FILE), engine.to_string())?;
            Ok(())
        }
    }
}

/// Reads the engine marker of `data_dir`.
///
/// Returns `Ok(None)` if there is no marker yet, or if its contents are not an engine name.
pub fn current_engine(data_dir: &Path) -> Result<Option<EngineKind>> {
    let marker = data_dir.join(ENGINE_FILE);
    if !marker.exists() {
        return Ok(None);
    }
    match fs::read_to_string(&marker)?.parse() {
        Ok(engine) => Ok(Some(engine)),
        Err(e) => {
            warn!("The content of the engine file is invalid: {}", e);
            Ok(None)
        }
    }
}
