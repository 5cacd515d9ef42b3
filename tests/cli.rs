use std::fs;
use std::io::Write;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::Duration;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::{contains, is_empty};
use tempfile::TempDir;

/// kills the server when a test ends, passing or not
struct Server(Child);

impl Server {
    fn start(engine: &str, addr: &str, dir: &TempDir) -> Server {
        let child = Command::cargo_bin("catalog-server")
            .unwrap()
            .args(&["--engine", engine, "--addr", addr])
            .arg("--data-dir")
            .arg(dir.path())
            .spawn()
            .unwrap();
        thread::sleep(Duration::from_secs(1));
        Server(child)
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        let _ = self.0.kill();
        let _ = self.0.wait();
    }
}

fn client(args: &[&str], addr: &str) -> Command {
    let mut cmd = Command::cargo_bin("catalog-client").unwrap();
    cmd.args(args).args(&["--addr", addr]);
    cmd
}

// `catalog-client` with no args should exit with a non-zero code.
#[test]
fn client_cli_no_args() {
    Command::cargo_bin("catalog-client").unwrap().assert().failure();
}

// `catalog-client -V` should print the version
#[test]
fn client_cli_version() {
    Command::cargo_bin("catalog-client")
        .unwrap()
        .args(&["-V"])
        .assert()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

// `catalog-server -V` should print the version
#[test]
fn server_cli_version() {
    Command::cargo_bin("catalog-server")
        .unwrap()
        .args(&["-V"])
        .assert()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn client_cli_invalid_arguments() {
    Command::cargo_bin("catalog-client")
        .unwrap()
        .args(&["add", "Dune", "Sci-Fi", "Denis Villeneuve"])
        .assert()
        .failure();

    Command::cargo_bin("catalog-client")
        .unwrap()
        .args(&["get", "1", "--addr", "invalid-addr"])
        .assert()
        .code(1)
        .stderr(contains("invalid-addr"));

    Command::cargo_bin("catalog-client")
        .unwrap()
        .args(&["rm", "dune"])
        .assert()
        .code(1)
        .stderr(contains("not a movie id"));

    Command::cargo_bin("catalog-client")
        .unwrap()
        .args(&["unknown"])
        .assert()
        .failure();
}

#[test]
fn server_cli_invalid_arguments() {
    let temp_dir = TempDir::new().unwrap();
    for args in &[
        &["--engine", "mysql"][..],
        &["--pool", "threads"][..],
        &["--addr", "localhost"][..],
        &["--max-frame", "1"][..],
        &["--max-frame", "14"][..],
        &["--idle-timeout", "0"][..],
        &["--idle-timeout", "soon"][..],
        &["--threads", "many"][..],
    ] {
        Command::cargo_bin("catalog-server")
            .unwrap()
            .args(*args)
            .arg("--data-dir")
            .arg(temp_dir.path())
            .assert()
            .code(1);
    }
}

#[test]
fn server_refuses_a_directory_of_another_engine() {
    let temp_dir = TempDir::new().unwrap();
    fs::write(temp_dir.path().join("engine"), "log").unwrap();

    Command::cargo_bin("catalog-server")
        .unwrap()
        .args(&["--engine", "sled", "--addr", "127.0.0.1:4211"])
        .arg("--data-dir")
        .arg(temp_dir.path())
        .assert()
        .code(1)
        .stderr(contains("does not match"));
}

#[test]
fn client_without_a_server_fails() {
    client(&["list"], "127.0.0.1:4219").assert().code(1);
}

fn cli_access_server(engine: &str, addr: &str) {
    let temp_dir = TempDir::new().unwrap();
    let server = Server::start(engine, addr, &temp_dir);

    client(&["add", "Dune", "Sci-Fi", "Denis Villeneuve", "2021"], addr)
        .assert()
        .success()
        .stdout("OK created 687616\n");
    client(&["add", "Dune", "Sci-Fi", "Denis Villeneuve", "2021"], addr)
        .assert()
        .code(2)
        .stdout(contains("DUPLICATE"));
    client(&["genre", "687616", "Adventure"], addr)
        .assert()
        .success()
        .stdout("OK updated 687616\n");
    client(&["get", "687616"], addr)
        .assert()
        .success()
        .stdout(contains("Genre: Adventure").and(contains("Year: 2021")));
    client(&["add", "Heat", "Crime", "Michael Mann", "1995"], addr)
        .assert()
        .success();
    client(&["list"], addr)
        .assert()
        .success()
        .stdout(contains("OK 2 record(s)\n").and(contains("Title: Heat")));
    client(&["by-genre", "Crime"], addr)
        .assert()
        .success()
        .stdout(contains("Director: Michael Mann").and(contains("Dune").not()));
    client(&["by-genre", "Western"], addr).assert().code(2);
    client(&["list-all"], addr)
        .assert()
        .success()
        .stdout(contains("Title: Dune").and(contains("Title: Heat")));

    let mut shell = client(&["shell"], addr)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .spawn()
        .unwrap();
    shell
        .stdin
        .take()
        .unwrap()
        .write_all(b"9\n3|687616\n6|687616\n")
        .unwrap();
    shell
        .wait_with_output()
        .unwrap()
        .assert()
        .code(2)
        .stdout(
            contains("ERROR unknown operation '9'")
                .and(contains("OK deleted 687616"))
                .and(contains("NOT_FOUND no movie with id 687616")),
        );
    client(&["get", "687616"], addr)
        .assert()
        .code(2)
        .stderr(is_empty());

    // the remaining movie survives a restart
    drop(server);
    let _server = Server::start(engine, addr, &temp_dir);
    client(&["list"], addr)
        .assert()
        .success()
        .stdout(contains("OK 1 record(s)").and(contains("Title: Heat")));
}

#[test]
fn cli_access_server_log_engine() {
    cli_access_server("log", "127.0.0.1:4204");
}

#[test]
fn cli_access_server_sled_engine() {
    cli_access_server("sled", "127.0.0.1:4205");
}

#[test]
fn memory_engine_starts_empty_every_time() {
    let temp_dir = TempDir::new().unwrap();
    let addr = "127.0.0.1:4206";
    {
        let _server = Server::start("memory", addr, &temp_dir);
        client(&["add", "Ran", "Drama", "Akira Kurosawa", "1985"], addr)
            .assert()
            .success();
    }
    let _server = Server::start("memory", addr, &temp_dir);
    client(&["list"], addr)
        .assert()
        .success()
        .stdout("OK catalog is empty\n");
    assert!(!temp_dir.path().join("engine").exists());
}
