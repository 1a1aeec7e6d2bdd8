//! Reads requests off an async byte source under a deadline.

use std::time::Duration;

use bytes::{Buf, BytesMut};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::time::timeout;

use crate::http::parser::{ParseError, ParserState, RequestParser};
use crate::http::request::Request;

/// Default idle window for receiving one request.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);

const READ_CHUNK: usize = 4096;

#[derive(Debug, Error)]
pub enum RequestError {
    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("timed out waiting for request")]
    Timeout,

    #[error("connection closed before request headers were complete")]
    UnexpectedEof,

    /// `expected` is the declared Content-Length; chunked bodies carry no
    /// total up front.
    #[error("connection closed after {received} of {} body bytes", declared(.expected))]
    TruncatedBody {
        expected: Option<usize>,
        received: usize,
    },

    /// The peer closed the connection between requests.
    #[error("connection closed")]
    ConnectionClosed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RequestError {
    /// Whether the peer sent something we can answer with `400 Bad Request`.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            RequestError::Parse(_)
                | RequestError::Timeout
                | RequestError::UnexpectedEof
                | RequestError::TruncatedBody { .. }
        )
    }
}

/// Owns a byte source and the bytes read from it that no request has
/// consumed yet.
pub struct RequestReader<R> {
    source: R,
    buffer: BytesMut,
}

impl<R: AsyncRead + Unpin> RequestReader<R> {
    pub fn new(source: R) -> Self {
        Self {
            source,
            buffer: BytesMut::with_capacity(READ_CHUNK),
        }
    }

    /// Reads one complete request, giving up with [`RequestError::Timeout`]
    /// once `idle` elapses.
    pub async fn read_request(&mut self, idle: Duration) -> Result<Request, RequestError> {
        match timeout(idle, self.read_next()).await {
            Ok(result) => result,
            Err(_) => Err(RequestError::Timeout),
        }
    }

    /// Bytes received but not yet claimed by a request.
    pub fn buffered(&self) -> &[u8] {
        &self.buffer
    }

    pub fn into_inner(self) -> R {
        self.source
    }

    async fn read_next(&mut self) -> Result<Request, RequestError> {
        let mut parser = RequestParser::new();

        loop {
            if !self.buffer.is_empty() {
                let (state, consumed) = parser.parse(&self.buffer);
                self.buffer.advance(consumed);

                match state {
                    ParserState::Complete => break,
                    ParserState::Failed(e) => return Err(e.into()),
                    _ => {}
                }
            }

            self.buffer.reserve(READ_CHUNK);
            let n = self.source.read_buf(&mut self.buffer).await?;

            if n == 0 {
                return Err(eof_error(&parser, self.buffer.is_empty()));
            }
        }

        parser.into_request().ok_or(RequestError::UnexpectedEof)
    }
}

/// Reads a single request from `source`, discarding anything after it.
pub async fn read_request<R: AsyncRead + Unpin>(
    source: R,
    idle: Duration,
) -> Result<Request, RequestError> {
    RequestReader::new(source).read_request(idle).await
}

fn eof_error(parser: &RequestParser, nothing_buffered: bool) -> RequestError {
    let received = parser.body_len();

    match parser.state() {
        ParserState::AwaitingRequestLine if nothing_buffered => RequestError::ConnectionClosed,
        ParserState::AwaitingBody { remaining } => RequestError::TruncatedBody {
            expected: Some(received + remaining),
            received,
        },
        state if state.in_body() => RequestError::TruncatedBody {
            expected: None,
            received,
        },
        _ => RequestError::UnexpectedEof,
    }
}

fn declared(expected: &Option<usize>) -> String {
    expected.map_or_else(|| "?".to_string(), |n| n.to_string())
}
