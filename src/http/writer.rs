//! Streams responses onto a connection.
//!
//! None of the write operations report errors. The first failure of the
//! underlying sink is latched, every later write becomes a no-op, and the
//! connection learns about it through [`ResponseWriter::finish`].

use std::io;

use tokio::io::{AsyncWrite, AsyncWriteExt};

use crate::http::headers::Headers;
use crate::http::response::StatusCode;

/// Type-erased write half of a connection.
pub type BoxedSink = Box<dyn AsyncWrite + Send + Unpin>;

pub struct ResponseWriter<W = BoxedSink> {
    sink: W,
    error: Option<io::Error>,
}

impl<W: AsyncWrite + Unpin> ResponseWriter<W> {
    pub fn new(sink: W) -> Self {
        Self { sink, error: None }
    }

    /// Status line, formatted headers, then `body` verbatim.
    pub async fn write(&mut self, status: StatusCode, headers: &Headers, body: &[u8]) {
        self.write_raw(status.status_line().as_bytes()).await;
        self.write_raw(&headers.format()).await;
        if !body.is_empty() {
            self.write_raw(body).await;
        }
    }

    /// Emits `bytes` unchanged, e.g. a hand-built status line and headers
    /// announcing a `Trailer` ahead of a chunked body.
    pub async fn write_raw(&mut self, bytes: &[u8]) {
        if self.error.is_some() {
            return;
        }

        if let Err(e) = self.sink.write_all(bytes).await {
            tracing::debug!(error = %e, "response sink failed");
            self.error = Some(e);
        }
    }

    /// One chunked-encoding frame: hex length, CRLF, payload, CRLF.
    ///
    /// An empty slice is skipped, since a zero-length frame would end the body.
    pub async fn write_chunk(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }

        let mut frame = Vec::with_capacity(bytes.len() + 12);
        frame.extend_from_slice(format!("{:x}\r\n", bytes.len()).as_bytes());
        frame.extend_from_slice(bytes);
        frame.extend_from_slice(b"\r\n");
        self.write_raw(&frame).await;
    }

    /// Terminal zero-length chunk.
    ///
    /// Callers that announced trailers write them with [`write_raw`]
    /// afterwards and close the message with a blank line themselves.
    ///
    /// [`write_raw`]: ResponseWriter::write_raw
    pub async fn end_chunked(&mut self) {
        self.write_raw(b"0\r\n\r\n").await;
    }

    /// Like [`end_chunked`](ResponseWriter::end_chunked), but writes the
    /// trailer block between the terminal chunk and the final blank line.
    pub async fn end_chunked_with_trailers(&mut self, trailers: &Headers) {
        self.write_raw(b"0\r\n").await;
        self.write_raw(&trailers.format()).await;
    }

    pub async fn flush(&mut self) {
        if self.error.is_some() {
            return;
        }

        if let Err(e) = self.sink.flush().await {
            tracing::debug!(error = %e, "response sink failed to flush");
            self.error = Some(e);
        }
    }

    /// Flushes and reports the first sink failure, if there was one.
    pub async fn finish(&mut self) -> io::Result<()> {
        self.flush().await;
        match self.error.take() {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    pub fn failed(&self) -> bool {
        self.error.is_some()
    }

    pub fn into_inner(self) -> W {
        self.sink
    }
}
