//! HTTP protocol implementation.
//!
//! This module implements HTTP/1.1 request parsing, response writing and
//! keep-alive connections on top of any tokio byte stream.
//!
//! # Architecture
//!
//! The HTTP layer is organized into several submodules:
//!
//! - **`headers`**: Case-insensitive, insertion-ordered header table
//! - **`parser`**: Incremental request parser, fed arbitrary byte slices
//! - **`reader`**: Drives the parser from an async source under a read deadline
//! - **`request`**: HTTP request representation
//! - **`response`**: Status codes and default response headers
//! - **`writer`**: Streams buffered or chunked responses onto the connection
//! - **`connection`**: The per-connection request/response state machine
//!
//! # Connection State Machine
//!
//! Each client connection goes through a state machine:
//!
//! ```text
//!        ┌─────────────┐
//!        │   Reading   │ ← Wait for a request (read deadline reset)
//!        └──────┬──────┘
//!               │ Request parsed          parse error / timeout
//!               ▼                         ──▶ 400 Bad Request ──▶ Closed
//!        ┌──────────────────┐
//!        │    Handling      │ ← Middleware chain + handler write the response
//!        └──────┬───────────┘
//!               │ Response written
//!               ├─ Keep-Alive → Reading (same connection)
//!               └─ Connection: close → Closed
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use tidewire::config::Config;
//! use tidewire::http::response::{StatusCode, default_headers};
//! use tidewire::server::{Server, handler_fn};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let hello = Arc::new(handler_fn(|w, _req| {
//!         Box::pin(async move {
//!             let body = b"hello";
//!             let headers = default_headers(body.len(), "text/plain", true);
//!             w.write(StatusCode::Ok, &headers, body).await;
//!         })
//!     }));
//!
//!     Server::bind(&Config::load(), hello, &[]).await?.run().await
//! }
//! ```

pub mod connection;
pub mod headers;
pub mod parser;
pub mod reader;
pub mod request;
pub mod response;
pub mod writer;
