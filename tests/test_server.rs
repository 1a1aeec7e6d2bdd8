use std::sync::{Arc, Mutex};
use std::time::Duration;

use tidewire::config::Config;
use tidewire::http::connection::Connection;
use tidewire::http::response::{StatusCode, default_headers};
use tidewire::server::{
    Middleware, RequestLogger, Server, ServerHandle, SharedHandler, compose, handler_fn,
    middleware_fn,
};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Replies `200` with `"<method> <target> <body>"`, or `400` on `/bad`.
fn echo() -> SharedHandler {
    Arc::new(handler_fn(|w, r| {
        Box::pin(async move {
            if r.target == "/bad" {
                let body = b"bad request test";
                let headers = default_headers(body.len(), "text/plain", false);
                w.write(StatusCode::BadRequest, &headers, body).await;
                return;
            }

            let body = format!(
                "{} {} {}",
                r.method,
                r.target,
                String::from_utf8_lossy(&r.body)
            );
            let headers = default_headers(body.len(), "text/plain", r.keep_alive());
            w.write(StatusCode::Ok, &headers, body.as_bytes()).await;
        })
    }))
}

fn test_config(read_timeout: Duration) -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        read_timeout,
        ..Config::default()
    }
}

async fn start(read_timeout: Duration) -> ServerHandle {
    let middleware: Vec<Arc<dyn Middleware>> = vec![Arc::new(RequestLogger)];
    Server::bind(&test_config(read_timeout), echo(), &middleware)
        .await
        .unwrap()
        .spawn()
        .unwrap()
}

/// Reads one response: the head plus as many body bytes as its
/// Content-Length announces.
async fn read_response<S: AsyncRead + Unpin>(stream: &mut S) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];

    loop {
        if let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            let head = String::from_utf8_lossy(&buf[..end]).to_string();
            let body_len = head
                .lines()
                .find_map(|line| line.strip_prefix("Content-Length: "))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);

            if buf.len() >= end + 4 + body_len {
                return String::from_utf8_lossy(&buf[..end + 4 + body_len]).to_string();
            }
        }

        let n = timeout(Duration::from_secs(2), stream.read(&mut chunk))
            .await
            .expect("timed out waiting for response")
            .unwrap();
        if n == 0 {
            return String::from_utf8_lossy(&buf).to_string();
        }
        buf.extend_from_slice(&chunk[..n]);
    }
}

async fn assert_closed<S: AsyncRead + Unpin>(stream: &mut S) {
    let mut rest = [0u8; 64];
    let n = timeout(Duration::from_secs(2), stream.read(&mut rest))
        .await
        .expect("connection left open")
        .unwrap_or(0);
    assert_eq!(n, 0);
}

#[tokio::test]
async fn test_basic_ok_response() {
    let server = start(Duration::from_secs(5)).await;
    let mut conn = TcpStream::connect(server.local_addr()).await.unwrap();

    conn.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let resp = read_response(&mut conn).await;

    assert!(resp.starts_with("HTTP/1.1 200 OK\r\n"), "{}", resp);
    assert!(resp.contains("Content-Length: 6\r\n"));
    assert!(resp.contains("Connection: keep-alive\r\n"));
    assert!(resp.ends_with("\r\n\r\nGET / "));

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_bad_request_route() {
    let server = start(Duration::from_secs(5)).await;
    let mut conn = TcpStream::connect(server.local_addr()).await.unwrap();

    conn.write_all(b"GET /bad HTTP/1.1\r\nHost: localhost\r\n\r\n")
        .await
        .unwrap();
    let resp = read_response(&mut conn).await;

    assert!(resp.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(resp.ends_with("bad request test"));

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_keep_alive_handles_two_requests_same_connection() {
    let server = start(Duration::from_secs(5)).await;
    let mut conn = TcpStream::connect(server.local_addr()).await.unwrap();

    conn.write_all(b"GET /one HTTP/1.1\r\nHost: localhost\r\nConnection: keep-alive\r\n\r\n")
        .await
        .unwrap();
    let first = read_response(&mut conn).await;
    assert!(first.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(first.ends_with("GET /one "));

    conn.write_all(b"POST /two HTTP/1.1\r\nHost: localhost\r\nContent-Length: 4\r\n\r\nping")
        .await
        .unwrap();
    let second = read_response(&mut conn).await;
    assert!(second.starts_with("HTTP/1.1 200 OK\r\n"));
    assert!(second.ends_with("POST /two ping"));

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_connection_close_ends_connection() {
    let server = start(Duration::from_secs(5)).await;
    let mut conn = TcpStream::connect(server.local_addr()).await.unwrap();

    conn.write_all(b"GET / HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let resp = read_response(&mut conn).await;

    assert!(resp.contains("Connection: close\r\n"));
    assert_closed(&mut conn).await;

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_malformed_request_gets_400_and_close() {
    let server = start(Duration::from_secs(5)).await;
    let mut conn = TcpStream::connect(server.local_addr()).await.unwrap();

    conn.write_all(b"BROKEN\r\n\r\n").await.unwrap();
    let resp = read_response(&mut conn).await;

    assert!(resp.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert!(resp.ends_with("Content-Length: 0\r\nContent-Type: text/plain\r\nConnection: close\r\n\r\n"));
    assert_closed(&mut conn).await;

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_idle_connection_times_out() {
    let server = start(Duration::from_millis(100)).await;
    let mut conn = TcpStream::connect(server.local_addr()).await.unwrap();

    conn.write_all(b"GET / HTTP/1.1\r\nHost: local").await.unwrap();
    let resp = read_response(&mut conn).await;

    assert!(resp.starts_with("HTTP/1.1 400 Bad Request\r\n"));
    assert_closed(&mut conn).await;

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_chunked_request_body_reaches_handler_decoded() {
    let server = start(Duration::from_secs(5)).await;
    let mut conn = TcpStream::connect(server.local_addr()).await.unwrap();

    conn.write_all(b"POST /c HTTP/1.1\r\nHost: x\r\nTransfer-Encoding: chunked\r\n\r\n")
        .await
        .unwrap();
    conn.write_all(b"5\r\nhel").await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;
    conn.write_all(b"lo\r\n0\r\n\r\n").await.unwrap();

    let resp = read_response(&mut conn).await;
    assert!(resp.ends_with("\r\n\r\nPOST /c hello"), "{}", resp);

    server.close().await.unwrap();
}

#[tokio::test]
async fn test_close_stops_accepting_but_keeps_open_connections() {
    let server = start(Duration::from_secs(5)).await;
    let addr = server.local_addr();
    let mut conn = TcpStream::connect(addr).await.unwrap();

    conn.write_all(b"GET /before HTTP/1.1\r\n\r\n").await.unwrap();
    assert!(read_response(&mut conn).await.ends_with("GET /before "));

    server.close().await.unwrap();
    assert!(TcpStream::connect(addr).await.is_err());

    conn.write_all(b"GET /after HTTP/1.1\r\n\r\n").await.unwrap();
    assert!(read_response(&mut conn).await.ends_with("GET /after "));
}

fn tagging(tag: &'static str, log: Arc<Mutex<Vec<String>>>) -> Arc<dyn Middleware> {
    middleware_fn(move |next| {
        let log = Arc::clone(&log);
        Arc::new(handler_fn(move |w, r| {
            let log = Arc::clone(&log);
            let next = Arc::clone(&next);
            Box::pin(async move {
                log.lock().unwrap().push(format!("{} in", tag));
                next.call(w, r).await;
                log.lock().unwrap().push(format!("{} out", tag));
            })
        }))
    })
}

#[tokio::test]
async fn test_first_middleware_is_outermost() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let handler = compose(
        echo(),
        &[
            tagging("outer", Arc::clone(&log)),
            tagging("inner", Arc::clone(&log)),
        ],
    );

    let (mut client, server) = tokio::io::duplex(4096);
    let task = tokio::spawn(async move {
        let mut conn = Connection::new(server, handler, Duration::from_secs(5));
        conn.run().await
    });

    client
        .write_all(b"GET / HTTP/1.1\r\nConnection: close\r\n\r\n")
        .await
        .unwrap();
    let resp = read_response(&mut client).await;
    assert!(resp.starts_with("HTTP/1.1 200 OK\r\n"));

    task.await.unwrap().unwrap();
    assert_eq!(
        *log.lock().unwrap(),
        ["outer in", "inner in", "inner out", "outer out"]
    );
}

#[tokio::test]
async fn test_connection_ends_quietly_when_peer_hangs_up() {
    let (client, server) = tokio::io::duplex(1024);
    let task = tokio::spawn(async move {
        let mut conn = Connection::new(server, echo(), Duration::from_secs(5));
        conn.run().await
    });

    drop(client);
    assert!(task.await.unwrap().is_ok());
}

#[tokio::test]
async fn test_oversized_head_gets_400_and_close() {
    let (mut client, server) = tokio::io::duplex(32 * 1024);
    let task = tokio::spawn(async move {
        let mut conn = Connection::new(server, echo(), Duration::from_secs(5));
        conn.run().await
    });

    let mut req = b"GET / HTTP/1.1\r\nX-Fill: ".to_vec();
    req.resize(20_000, b'a');
    client.write_all(&req).await.unwrap();

    let resp = read_response(&mut client).await;
    assert!(resp.starts_with("HTTP/1.1 400 Bad Request\r\n"), "{}", resp);
    assert_closed(&mut client).await;
    assert!(task.await.unwrap().is_ok());
}
