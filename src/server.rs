//! The TCP acceptor and the per-connection session loop.
use std::io::{self, ErrorKind};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::thread;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::command::{ProtocolError, Response, Status};
use crate::config::SessionLimits;
use crate::dispatcher::Dispatcher;
use crate::engine::CatalogEngine;
use crate::frame::{FrameError, FrameReader, FrameWriter};
use crate::identity::{KeyScheme, PrimeSum};
use crate::thread_pool::ThreadPool;
use crate::{CatalogError, Result};

// first pause after a failed accept, doubled on every further consecutive failure
const ACCEPT_BACKOFF: Duration = Duration::from_millis(10);

// replies sent when the full reply does not fit in a frame
const TOO_LARGE: &str = "FAIL too large";
const TOO_LONG: &str = "ERROR too long";

/// The smallest frame bound that still carries every reply in full: the short fallback
/// replies plus the delimiter.
pub const MIN_FRAME: usize = TOO_LONG.len() + 1;

/// A TCP server over a catalog engine.
///
/// It accepts connections on a [`TcpListener`] and hands every connection to the
/// [`ThreadPool`], where a session reads request lines, dispatches them and writes one
/// response line per request until the client hangs up.
///
/// Each session receives a clone of the [`Dispatcher`]. Sessions share nothing else, and
/// nothing is locked while a session waits on its socket.
///
/// # Example
/// Serve a sled catalog kept in the current directory on port 8080, one thread per connection
/// ```rust,no_run
/// use std::path::Path;
/// use catalog::{CatalogServer, Dispatcher, SledCatalog};
/// use catalog::thread_pool::{NaiveThreadPool, ThreadPool};
/// # fn main() -> catalog::Result<()> {
/// let engine = SledCatalog::open(Path::new("."))?;
/// let server = CatalogServer::new(Dispatcher::new(engine), NaiveThreadPool::new(0)?);
/// server.run("0.0.0.0:8080")?;
/// # Ok(())
/// # }
/// ```
pub struct CatalogServer<E: CatalogEngine, P: ThreadPool, K: KeyScheme = PrimeSum> {
    dispatcher: Dispatcher<E, K>,
    pool: P,
    limits: SessionLimits,
}

impl<E: CatalogEngine, P: ThreadPool, K: KeyScheme> CatalogServer<E, P, K> {
    /// creates a server with the default [`SessionLimits`]
    pub fn new(dispatcher: Dispatcher<E, K>, pool: P) -> Self {
        CatalogServer {
            dispatcher,
            pool,
            limits: SessionLimits::default(),
        }
    }

    /// replaces the session limits
    pub fn with_limits(mut self, limits: SessionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// binds to `addr` and serves connections, see [`CatalogServer::serve`]
    pub fn run<A: ToSocketAddrs>(self, addr: A) -> Result<()> {
        let listener = TcpListener::bind(addr)?;
        self.serve(listener)
    }

    /// Accepts connections on `listener` until accepting fails for good.
    ///
    /// # Errors
    /// returns [`CatalogError::Accept`] once the accept retries are exhausted
    pub fn serve(self, listener: TcpListener) -> Result<()> {
        info!("Listening on {}", listener.local_addr()?);
        self.serve_with(|| listener.accept().map(|(tcp, _)| tcp))
    }

    /// Runs the accept loop over `accept`, which yields one connection per call.
    ///
    /// Interrupted accepts are retried straight away. Other accept errors are retried after an
    /// exponential backoff, up to `accept_retries` consecutive failures. A successful accept
    /// resets the count.
    ///
    /// # Errors
    /// returns [`CatalogError::Accept`] once the retries are exhausted
    pub fn serve_with<F>(self, mut accept: F) -> Result<()>
    where
        F: FnMut() -> io::Result<TcpStream>,
    {
        let mut failures = 0_u32;
        loop {
            match accept() {
                Ok(tcp) => {
                    failures = 0;
                    let dispatcher = self.dispatcher.clone();
                    let limits = self.limits;
                    self.pool.spawn(move || {
                        if let Err(e) = serve_session(dispatcher, tcp, limits) {
                            error!("Error on serving client: {}", e);
                        }
                    });
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    failures += 1;
                    if failures > self.limits.accept_retries {
                        error!("giving up after {} failed accepts: {}", failures, e);
                        return Err(CatalogError::Accept {
                            attempts: failures,
                            source: e,
                        });
                    }
                    let backoff = ACCEPT_BACKOFF * 2_u32.saturating_pow(failures - 1);
                    warn!("Connection failed: {}, retrying in {:?}", e, backoff);
                    thread::sleep(backoff);
                }
            }
        }
    }
}

/// Serves one connection: reads a request frame, dispatches it, writes the response frame,
/// until the client closes the stream.
///
/// Protocol errors are answered and the session goes on. An IO error ends the session.
/// The socket is closed when this returns, on every path.
fn serve_session<E: CatalogEngine, K: KeyScheme>(
    dispatcher: Dispatcher<E, K>,
    tcp: TcpStream,
    limits: SessionLimits,
) -> Result<()> {
    let peer_addr = tcp.peer_addr()?;
    // a zero timeout is refused by the socket, it means no timeout here
    tcp.set_read_timeout(limits.idle_timeout.filter(|timeout| !timeout.is_zero()))?;
    debug!("Accepted connection from {}", peer_addr);

    let mut reader = FrameReader::new(&tcp, limits.max_frame);
    let mut writer = FrameWriter::new(&tcp);

    loop {
        let response = match reader.read_frame() {
            Ok(Some(frame)) => match String::from_utf8(frame) {
                Ok(line) => {
                    debug!("Receive request from {}: {:?}", peer_addr, line);
                    dispatcher.handle(&line)
                }
                Err(_) => Response::Protocol(ProtocolError::NotUtf8),
            },
            Ok(None) => {
                debug!("{} closed the connection", peer_addr);
                return Ok(());
            }
            Err(FrameError::TooLong { limit }) => {
                Response::Protocol(ProtocolError::FrameTooLong { limit })
            }
            Err(FrameError::Io(e))
                if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut =>
            {
                info!("closing idle connection from {}", peer_addr);
                return Ok(());
            }
            Err(FrameError::Io(e)) => return Err(e.into()),
        };

        let line = encode_bounded(&response, limits.max_frame);
        writer.write_frame(line.as_bytes())?;
        debug!("Response sent to {}: {:?}", peer_addr, line);
    }
}

/// Encodes `response` so that it fits in one frame of `max_frame` bytes (delimiter included).
///
/// A response that is too long is replaced by a `FAIL` reply giving the sizes, or by the
/// short `FAIL too large` if even that does not fit. Protocol errors keep their `ERROR`
/// status and fall back to `ERROR too long`. Below [`MIN_FRAME`] the short reply is cut
/// to the bound.
pub fn encode_bounded(response: &Response, max_frame: usize) -> String {
    let line = response.encode();
    if line.len() < max_frame {
        return line;
    }
    warn!(
        "response of {} bytes does not fit in a {}-byte frame",
        line.len() + 1,
        max_frame
    );
    let (detailed, short) = match response.status() {
        Status::Error => (None, TOO_LONG),
        _ => (
            Some(
                Response::Failure(format!(
                    "response of {} bytes exceeds the {}-byte frame limit",
                    line.len() + 1,
                    max_frame
                ))
                .encode(),
            ),
            TOO_LARGE,
        ),
    };
    match detailed {
        Some(detailed) if detailed.len() < max_frame => detailed,
        _ => {
            let mut short = short.to_string();
            short.truncate(max_frame.saturating_sub(1));
            short
        }
    }
}
