//! Tests for the per-connection request/response loop

use std::sync::Arc;
use std::time::{Duration, Instant};

use lantern::http::connection::{Connection, ConnectionState, ServerContext};
use lantern::http::parser::{ParseError, ParseOutcome};
use lantern::http::request::RequestBuilder;
use lantern::http::response::StatusCode;
use lantern::static_files::FileResolver;
use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};
use tokio::task::JoinHandle;

const INDEX: &str = "<h1>home</h1>";

fn context(read_timeout: Duration) -> (tempfile::TempDir, Arc<ServerContext>) {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("index.html"), INDEX).unwrap();
    std::fs::write(dir.path().join("a.txt"), "aaa").unwrap();
    let resolver = FileResolver::new(dir.path()).unwrap();
    (dir, Arc::new(ServerContext::new(resolver, read_timeout)))
}

fn start(ctx: Arc<ServerContext>) -> (DuplexStream, JoinHandle<anyhow::Result<()>>) {
    let (client, server) = tokio::io::duplex(64 * 1024);
    let handle = tokio::spawn(async move {
        let mut conn = Connection::new(server, ctx);
        conn.run().await
    });
    (client, handle)
}

/// Sends `input`, half-closes, and collects everything the server writes.
async fn exchange(input: &[u8]) -> String {
    let (_dir, ctx) = context(Duration::from_secs(5));
    let (mut client, handle) = start(ctx);

    client.write_all(input).await.unwrap();
    client.shutdown().await.unwrap();

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    handle.await.unwrap().unwrap();
    String::from_utf8(out).unwrap()
}

/// Status lines in order. Bodies are not CRLF-terminated, so a status line
/// can directly follow the previous body.
fn status_lines(output: &str) -> Vec<&str> {
    output
        .match_indices("HTTP/1.1 ")
        .map(|(start, _)| {
            let rest = &output[start..];
            &rest[..rest.find("\r\n").unwrap_or(rest.len())]
        })
        .collect()
}

#[tokio::test]
async fn test_serves_file_then_closes_on_eof() {
    let out = exchange(b"GET /index.html HTTP/1.1\r\nHost: x\r\n\r\n").await;

    assert_eq!(status_lines(&out), vec!["HTTP/1.1 200 OK"]);
    assert!(out.contains("\r\nContent-Length: 13\r\n"));
    assert!(out.contains("\r\nContent-Type: text/html\r\n"));
    assert!(!out.contains("Connection: close"));
    assert!(out.ends_with(INDEX));
}

#[tokio::test]
async fn test_keep_alive_serves_requests_in_order() {
    let out = exchange(
        b"GET /a.txt HTTP/1.1\r\nHost: x\r\n\r\n\
          GET /missing HTTP/1.1\r\nHost: x\r\n\r\n\
          GET / HTTP/1.1\r\nHost: x\r\n\r\n",
    )
    .await;

    assert_eq!(
        status_lines(&out),
        vec!["HTTP/1.1 200 OK", "HTTP/1.1 404 Not Found", "HTTP/1.1 200 OK"]
    );
    let a = out.find("aaa").unwrap();
    let not_found = out.find("404 Not Found").unwrap();
    assert!(a < not_found);
}

#[tokio::test]
async fn test_connection_close_ends_after_response() {
    let out = exchange(
        b"GET /a.txt HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n\
          GET /a.txt HTTP/1.1\r\nHost: x\r\n\r\n",
    )
    .await;

    assert_eq!(status_lines(&out), vec!["HTTP/1.1 200 OK"]);
    assert!(out.contains("\r\nConnection: close\r\n"));
}

#[tokio::test]
async fn test_not_found_with_close() {
    let out = exchange(b"GET /nope HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n").await;

    assert_eq!(status_lines(&out), vec!["HTTP/1.1 404 Not Found"]);
    assert!(out.contains("\r\nConnection: close\r\n"));
    assert!(out.ends_with("\r\n\r\n"));
}

#[tokio::test]
async fn test_missing_host_is_bad_request_and_closes() {
    let out = exchange(
        b"GET / HTTP/1.1\r\nAccept: */*\r\n\r\n\
          GET / HTTP/1.1\r\nHost: x\r\n\r\n",
    )
    .await;

    assert_eq!(status_lines(&out), vec!["HTTP/1.1 400 Bad Request"]);
    assert!(out.contains("\r\nConnection: close\r\n"));
}

#[tokio::test]
async fn test_bad_method_is_bad_request() {
    let out = exchange(b"BADMETHOD / HTTP/1.1\r\nHost: x\r\n\r\n").await;
    assert_eq!(status_lines(&out), vec!["HTTP/1.1 400 Bad Request"]);
}

#[tokio::test]
async fn test_bad_request_after_good_one() {
    let out = exchange(
        b"GET /a.txt HTTP/1.1\r\nHost: x\r\n\r\n\
          garbage\r\n\r\n",
    )
    .await;

    assert_eq!(
        status_lines(&out),
        vec!["HTTP/1.1 200 OK", "HTTP/1.1 400 Bad Request"]
    );
}

#[tokio::test]
async fn test_eof_mid_request_is_bad_request() {
    let out = exchange(b"GET / HTTP/1.1\r\nHost: x\r\n").await;
    assert_eq!(status_lines(&out), vec!["HTTP/1.1 400 Bad Request"]);
}

#[tokio::test]
async fn test_immediate_eof_sends_nothing() {
    let out = exchange(b"").await;
    assert!(out.is_empty());
}

#[tokio::test]
async fn test_idle_timeout_closes_silently() {
    let (_dir, ctx) = context(Duration::from_millis(100));
    let (mut client, handle) = start(ctx);

    let started = Instant::now();
    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();

    assert!(out.is_empty());
    assert!(started.elapsed() >= Duration::from_millis(100));
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_partial_request_timeout_sends_one_bad_request() {
    let (_dir, ctx) = context(Duration::from_millis(100));
    let (mut client, handle) = start(ctx);

    client
        .write_all(b"GET /index.html HTTP/1.1\r\nHost: x\r\n")
        .await
        .unwrap();

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();

    assert_eq!(status_lines(&out), vec!["HTTP/1.1 400 Bad Request"]);
    assert!(out.contains("\r\nConnection: close\r\n"));
    handle.await.unwrap().unwrap();
}

#[tokio::test]
async fn test_idle_timeout_after_keep_alive_response() {
    let (_dir, ctx) = context(Duration::from_millis(100));
    let (mut client, handle) = start(ctx);

    client
        .write_all(b"GET /a.txt HTTP/1.1\r\nHost: x\r\n\r\n")
        .await
        .unwrap();

    let mut out = Vec::new();
    client.read_to_end(&mut out).await.unwrap();
    let out = String::from_utf8(out).unwrap();

    assert_eq!(status_lines(&out), vec!["HTTP/1.1 200 OK"]);
    assert!(out.ends_with("aaa"));
    handle.await.unwrap().unwrap();
}

#[test]
fn test_state_after_end_of_stream() {
    assert!(matches!(
        ConnectionState::after_parse(ParseOutcome::EndOfStream),
        ConnectionState::Closed
    ));
}

#[test]
fn test_state_after_idle_timeout() {
    let outcome = ParseOutcome::Failure {
        error: ParseError::Timeout,
        bytes_received: false,
    };
    assert!(matches!(
        ConnectionState::after_parse(outcome),
        ConnectionState::Closed
    ));
}

#[test]
fn test_state_after_partial_timeout() {
    let outcome = ParseOutcome::Failure {
        error: ParseError::Timeout,
        bytes_received: true,
    };
    match ConnectionState::after_parse(outcome) {
        ConnectionState::Respond(response) => {
            assert_eq!(response.status, StatusCode::BadRequest);
            assert!(response.closes_connection());
        }
        other => panic!("unexpected state {:?}", other),
    }
}

#[test]
fn test_state_after_io_error() {
    let outcome = ParseOutcome::Failure {
        error: ParseError::Io(std::io::ErrorKind::ConnectionReset.into()),
        bytes_received: true,
    };
    assert!(matches!(
        ConnectionState::after_parse(outcome),
        ConnectionState::Closed
    ));
}

#[test]
fn test_state_after_malformed_request() {
    let outcome = ParseOutcome::Failure {
        error: ParseError::MissingHost,
        bytes_received: true,
    };
    assert!(matches!(
        ConnectionState::after_parse(outcome),
        ConnectionState::Respond(_)
    ));
}

#[test]
fn test_state_after_success() {
    let request = RequestBuilder::new().target("/").host("x").build().unwrap();
    match ConnectionState::after_parse(ParseOutcome::Success(request.clone())) {
        ConnectionState::Dispatch(dispatched) => assert_eq!(dispatched, request),
        other => panic!("unexpected state {:?}", other),
    }
}

#[tokio::test]
async fn test_context_respond_resolves_files() {
    let (_dir, ctx) = context(Duration::from_secs(5));

    let found = RequestBuilder::new().target("/").host("x").build().unwrap();
    let response = ctx.respond(found).await;
    assert_eq!(response.status, StatusCode::Ok);
    assert_eq!(response.header("Content-Length"), Some("13"));

    let escape = RequestBuilder::new().target("/../etc/passwd").host("x").build().unwrap();
    let response = ctx.respond(escape).await;
    assert_eq!(response.status, StatusCode::NotFound);
}
