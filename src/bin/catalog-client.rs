//! The catalog-client executable supports the following command line arguments:
//!
//! `catalog-client add <TITLE> <GENRE> <DIRECTOR> <YEAR> [--addr IP-PORT]`
//!
//!     Add a movie. The server derives its id from the four fields.
//!
//! `catalog-client genre <ID> <GENRE> [--addr IP-PORT]`
//!
//!     Change the genre of a movie.
//!
//! `catalog-client rm <ID> [--addr IP-PORT]`
//!
//!     Remove a movie.
//!
//! `catalog-client get <ID> [--addr IP-PORT]`
//!
//!     Print every field of a movie.
//!
//! `catalog-client list | list-all | by-genre <GENRE> [--addr IP-PORT]`
//!
//!     Print the id and title of every movie, every movie in full, or the movies of one genre.
//!
//! `catalog-client shell [--addr IP-PORT]`
//!
//!     Read raw request lines (e.g. `6|687616`) from stdin and print each reply.
//!
//! --addr accepts an IP address, either v4 or v6, and a port number, with the format IP:PORT.
//! If --addr is not specified then connect on 127.0.0.1:8080.
//!
//! The exit code is 0 for an OK reply, 2 for NOT_FOUND or DUPLICATE, and 1 for ERROR or FAIL
//! replies, connection failures, or if IP-PORT does not parse as an address.

use std::io::{self, BufRead};
use std::net::SocketAddr;
use std::process::exit;

use catalog::config::DEFAULT_CLIENT_ADDRESS;
use catalog::{CatalogClient, CatalogError, Key, Reply, Request, Result, Status};
use clap::{crate_version, App, AppSettings, Arg, ArgMatches, SubCommand};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

/// ['Opt'] holds parsed and validated options from the command line
#[derive(Debug)]
struct Opt {
    /// the server's ip:port
    addr: SocketAddr,
    /// a single request, or `None` for the interactive shell
    req: Option<Request>,
}

impl Opt {
    /// validates the `addr` parameter is a valid IP address and PORT
    ///
    /// # Errors
    /// returns [`CatalogError::Parsing`] if one of the parameters is invalid
    fn build(addr: &str, req: Option<Request>) -> Result<Opt> {
        let addr: SocketAddr = addr.parse().map_err(|_| {
            CatalogError::Parsing(format!("could not parse {} into an IP address and port", addr))
        })?;
        Ok(Opt { addr, req })
    }
}

fn main() {
    // configure a subscriber that will log messages to STDERR
    subscriber_config();

    let matches = App::new("catalog-client")
        .version(crate_version!())
        .author("strohs <strohs1@gmail.com>")
        .about("a client for the movie catalog server")
        .setting(AppSettings::SubcommandRequiredElseHelp)
        .subcommands(vec![
            SubCommand::with_name("add")
                .about("Add a movie")
                .arg(Arg::with_name("TITLE").required(true).index(1))
                .arg(Arg::with_name("GENRE").required(true).index(2))
                .arg(Arg::with_name("DIRECTOR").required(true).index(3))
                .arg(Arg::with_name("YEAR").required(true).index(4))
                .arg(addr_arg()),
            SubCommand::with_name("genre")
                .about("Change the genre of a movie")
                .arg(Arg::with_name("ID").required(true).index(1))
                .arg(Arg::with_name("GENRE").required(true).index(2))
                .arg(addr_arg()),
            SubCommand::with_name("rm")
                .about("Remove a movie")
                .arg(Arg::with_name("ID").required(true).index(1))
                .arg(addr_arg()),
            SubCommand::with_name("get")
                .about("Show every field of a movie")
                .arg(Arg::with_name("ID").required(true).index(1))
                .arg(addr_arg()),
            SubCommand::with_name("list")
                .about("List the id and title of every movie")
                .arg(addr_arg()),
            SubCommand::with_name("list-all")
                .about("List every movie with all of its fields")
                .arg(addr_arg()),
            SubCommand::with_name("by-genre")
                .about("List the movies of a genre")
                .arg(Arg::with_name("GENRE").required(true).index(1))
                .arg(addr_arg()),
            SubCommand::with_name("shell")
                .about("Send raw request lines read from stdin")
                .arg(addr_arg()),
        ])
        .get_matches();

    let code = match parse_options(&matches).and_then(run) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e);
            1
        }
    };
    exit(code);
}

/// sends the request described by `opt` and returns the process exit code
fn run(opt: Opt) -> Result<i32> {
    let mut client = CatalogClient::connect(opt.addr)?;
    match opt.req {
        Some(req) => {
            let reply = client.send(&req)?;
            println!("{}", reply);
            Ok(exit_code(&reply))
        }
        None => shell(&mut client),
    }
}

/// forwards stdin line by line, like a plain line-protocol client
fn shell(client: &mut CatalogClient) -> Result<i32> {
    let mut code = 0;
    for line in io::stdin().lock().lines() {
        let line = line?;
        if line.is_empty() {
            continue;
        }
        let reply = client.send_line(&line)?;
        println!("{}", reply);
        code = code.max(exit_code(&reply));
    }
    Ok(code)
}

fn exit_code(reply: &Reply) -> i32 {
    match reply.status {
        Status::Ok => 0,
        Status::NotFound | Status::Duplicate => 2,
        Status::Fail | Status::Error => 1,
    }
}

/// parses the matches from the command line into an [`Opt`] struct
fn parse_options(matches: &ArgMatches) -> Result<Opt> {
    let addr = matches
        .subcommand()
        .1
        .and_then(|args| args.value_of("addr"))
        .unwrap_or(DEFAULT_CLIENT_ADDRESS);
    let req = match matches.subcommand() {
        ("add", Some(args)) => Some(Request::Create {
            title: arg(args, "TITLE"),
            genre: arg(args, "GENRE"),
            director: arg(args, "DIRECTOR"),
            year: arg(args, "YEAR"),
        }),
        ("genre", Some(args)) => Some(Request::UpdateGenre {
            key: id(args)?,
            genre: arg(args, "GENRE"),
        }),
        ("rm", Some(args)) => Some(Request::Delete { key: id(args)? }),
        ("get", Some(args)) => Some(Request::Get { key: id(args)? }),
        ("list", Some(_)) => Some(Request::ListSummaries),
        ("list-all", Some(_)) => Some(Request::ListAll),
        ("by-genre", Some(args)) => Some(Request::ListByGenre {
            genre: arg(args, "GENRE"),
        }),
        ("shell", Some(_)) => None,
        (other, _) => return Err(CatalogError::Parsing(format!("unknown command '{}'", other))),
    };
    Opt::build(addr, req)
}

fn addr_arg() -> Arg<'static, 'static> {
    Arg::with_name("addr")
        .long("addr")
        .value_name("IP_ADDR:PORT")
        .help("the server to connect to")
        .default_value(DEFAULT_CLIENT_ADDRESS)
}

fn arg(args: &ArgMatches, name: &str) -> String {
    args.value_of(name).map(String::from).unwrap_or_default()
}

fn id(args: &ArgMatches) -> Result<Key> {
    let raw = args.value_of("ID").unwrap_or_default();
    raw.parse::<Key>()
        .map_err(|_| CatalogError::Parsing(format!("'{}' is not a movie id", raw)))
}

/// configures a tracing subscriber that will log warnings and errors to STDERR
fn subscriber_config() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::WARN)
        // log to stderr, stdout carries the replies
        .with_writer(std::io::stderr)
        // completes the builder.
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .expect("setting tracing default subscriber failed");
}
