#![deny(missing_docs)]
//! A multithreaded, persistent movie catalog served over TCP.
//!
//! This crate provides the [`CatalogServer`] itself, the storage engines it runs on, as well
//! as a [`catalog-client`] and [`catalog-server`] executable that can be used to interact with
//! the catalog. Requests and responses travel as newline terminated text lines over plain TCP.
//!
//! ## Supported Operations
//! Each request starts with a one digit opcode followed by `|`-separated operands:
//!
//! | Opcode | Operation | Operands |
//! |---|---|---|
//! | 1 | create a movie | title, genre, director, year |
//! | 2 | change a movie's genre | id, genre |
//! | 3 | delete a movie | id |
//! | 4 | list ids and titles | |
//! | 5 | list every movie | |
//! | 6 | get one movie | id |
//! | 7 | list the movies of a genre | genre |
//!
//! See [`Request`] and [`Response`] for the exact grammar, and [`Reply`] for how a client reads
//! responses back.
//!
//! ## Movie identity
//! Clients never pick ids. The key of a movie is derived from its title, genre, director and
//! year by a [`KeyScheme`], so creating the same movie twice is answered with `DUPLICATE`
//! instead of storing a second copy.
//!
//! ## Engines
//! The catalog is kept by a [`CatalogEngine`]:
//! - [`SledCatalog`] stores movies in a [`sled`] database
//! - [`LogCatalog`] appends catalog changes to "command-log" files and compacts them once the
//! size of stale entries hits a threshold (currently 1 MB)
//! - [`MemoryCatalog`] keeps everything in memory
//!
//! Each engine call is atomic, in particular a create is a single "insert unless present" call,
//! so two connections racing to create the same movie store it once.
//!
//! ## Client / Server
//! The server accepts connections on one thread and runs every session on a
//! [`ThreadPool`](thread_pool::ThreadPool). Sessions only touch shared state while executing a
//! request, never while waiting on the network.
//!
//! [`sled`]: https://docs.rs/sled/latest/sled/
//! [`catalog-server`]: ../catalog_server/index.html
//! [`catalog-client`]: ../catalog_client/index.html

pub use client::CatalogClient;
pub use command::{ProtocolError, Reply, Request, Response, Status};
pub use config::{ServerConfig, SessionLimits};
pub use dispatcher::Dispatcher;
pub use engine::{CatalogEngine, EngineKind, Insert, LogCatalog, MemoryCatalog, SledCatalog};
pub use error::{CatalogError, Result};
pub use identity::{derive_key, KeyScheme, PrimeSum};
pub use movie::{Key, Movie, Summary};
pub use server::CatalogServer;

mod client;
pub mod command;
pub mod config;
mod dispatcher;
mod engine;
mod error;
pub mod frame;
mod identity;
mod movie;
pub mod server;
pub mod thread_pool;
