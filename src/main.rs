use std::str::FromStr;
use std::sync::Arc;

use tidewire::config::Config;
use tidewire::http::headers::Headers;
use tidewire::http::request::Request;
use tidewire::http::response::{StatusCode, default_headers};
use tidewire::http::writer::ResponseWriter;
use tidewire::server::{BoxFuture, Handler, Middleware, RequestLogger, Server};

const STREAM_PARTS: [&str; 3] = ["tide ", "comes ", "in\n"];

struct Demo;

impl Handler for Demo {
    fn call<'a>(&'a self, w: &'a mut ResponseWriter, r: &'a Request) -> BoxFuture<'a> {
        Box::pin(async move {
            match r.target.as_str() {
                "/bad" => {
                    let body = html("400", "Bad Request", "Invalid request");
                    let headers = default_headers(body.len(), "text/html", false);
                    w.write(StatusCode::BadRequest, &headers, &body).await;
                }
                "/stream" => stream(w).await,
                _ => {
                    let body = html("200", "OK", "Request successful");
                    let headers = default_headers(body.len(), "text/html", r.keep_alive());
                    w.write(StatusCode::Ok, &headers, &body).await;
                }
            }
        })
    }
}

/// Chunked body with a trailer carrying the total payload length.
async fn stream(w: &mut ResponseWriter) {
    w.write_raw(b"HTTP/1.1 200 OK\r\n").await;
    w.write_raw(b"Transfer-Encoding: chunked\r\n").await;
    w.write_raw(b"Content-Type: text/plain\r\n").await;
    w.write_raw(b"Trailer: X-Content-Length\r\n\r\n").await;

    let mut total = 0;
    for part in STREAM_PARTS {
        total += part.len();
        w.write_chunk(part.as_bytes()).await;
    }

    let mut trailers = Headers::new();
    trailers.set("X-Content-Length", total.to_string());
    w.end_chunked_with_trailers(&trailers).await;
}

fn html(title: &str, heading: &str, message: &str) -> Vec<u8> {
    format!(
        "<html>\n<head>\n\t<title>{}</title>\n</head>\n<body>\n\t<h1>{}</h1>\n\t<p>{}</p>\n</body>\n</html>",
        title, heading, message
    )
    .into_bytes()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cfg = Config::load();

    let level = tracing::Level::from_str(&cfg.log_level).unwrap_or(tracing::Level::INFO);
    tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .with_max_level(level)
        .init();

    let middleware: Vec<Arc<dyn Middleware>> = vec![Arc::new(RequestLogger)];
    let server = Server::bind(&cfg, Arc::new(Demo), &middleware).await?;

    tokio::select! {
        res = server.run() => {
            res?;
        }

        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Shutdown signal received");
        }
    }

    Ok(())
}
