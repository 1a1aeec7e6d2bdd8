//! Tidewire - HTTP/1.1 on raw byte streams
//!
//! Request parsing, response writing and keep-alive connection handling
//! built directly on tokio sockets.

pub mod config;
pub mod http;
pub mod server;
