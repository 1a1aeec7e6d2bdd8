//! Incremental HTTP/1.1 request parser.
//!
//! [`RequestParser`] never touches a socket. It is fed successive byte
//! slices and every [`RequestParser::parse`] call reports the state it ended
//! in together with how many bytes of the slice it consumed. The caller
//! drops the consumed prefix and hands the unconsumed remainder back, topped
//! up with newly read bytes, on the next call.
//!
//! ```text
//! AwaitingRequestLine ─▶ AwaitingHeaders ─┬─▶ Complete
//!                                         ├─▶ AwaitingBody ─▶ Complete
//!                                         └─▶ AwaitingChunkSize ◀──────┐
//!                                               │ size > 0             │
//!                                               ▼                      │
//!                                             AwaitingChunkData ─▶ AwaitingChunkEnd
//!                                               │ size == 0
//!                                               ▼
//!                                             AwaitingTrailers ─▶ Complete
//! ```
//!
//! Any error moves the parser into `Failed`, which is terminal: later calls
//! return the same error without looking at their input.
//!
//! The request line plus header block, and separately the trailer block,
//! may not exceed [`MAX_HEAD_SIZE`] bytes.

use thiserror::Error;

use crate::http::headers::{Headers, find_crlf};
use crate::http::request::{Request, is_chunked};

/// Upper bound on the request head and on the trailer block.
pub const MAX_HEAD_SIZE: usize = 8 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed request line")]
    MalformedRequestLine,
    #[error("malformed headers")]
    MalformedHeaders,
    #[error("invalid content-length")]
    InvalidContentLength,
    #[error("malformed chunked body")]
    MalformedChunk,
    #[error("request head exceeds {MAX_HEAD_SIZE} bytes")]
    HeadTooLarge,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParserState {
    AwaitingRequestLine,
    AwaitingHeaders,
    /// Content-Length framed body with `remaining` bytes still to read.
    AwaitingBody { remaining: usize },
    AwaitingChunkSize,
    AwaitingChunkData { remaining: usize },
    /// CRLF that closes a chunk's payload.
    AwaitingChunkEnd,
    /// Trailer block after the zero-length chunk.
    AwaitingTrailers,
    Complete,
    Failed(ParseError),
}

impl ParserState {
    /// Whether the parser has stopped and will not consume more bytes.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ParserState::Complete | ParserState::Failed(_))
    }

    /// Whether the request head is parsed and only body bytes are missing.
    pub fn in_body(&self) -> bool {
        matches!(
            self,
            ParserState::AwaitingBody { .. }
                | ParserState::AwaitingChunkSize
                | ParserState::AwaitingChunkData { .. }
                | ParserState::AwaitingChunkEnd
                | ParserState::AwaitingTrailers
        )
    }
}

#[derive(Debug, Default)]
struct RequestLine {
    method: String,
    target: String,
    version: String,
}

#[derive(Debug)]
pub struct RequestParser {
    state: ParserState,
    line: RequestLine,
    headers: Headers,
    body: Vec<u8>,
    trailers: Headers,
    /// Bytes of the current head or trailer block consumed so far.
    head_len: usize,
}

impl Default for RequestParser {
    fn default() -> Self {
        Self::new()
    }
}

impl RequestParser {
    pub fn new() -> Self {
        Self {
            state: ParserState::AwaitingRequestLine,
            line: RequestLine::default(),
            headers: Headers::new(),
            body: Vec::new(),
            trailers: Headers::new(),
            head_len: 0,
        }
    }

    pub fn state(&self) -> &ParserState {
        &self.state
    }

    /// Body bytes decoded so far.
    pub fn body_len(&self) -> usize {
        self.body.len()
    }

    /// Consumes as much of `buf` as the current state allows.
    ///
    /// Returns the state the parser ended in and the number of bytes of
    /// `buf` that were consumed. Bytes past that count must be offered
    /// again on the next call.
    pub fn parse(&mut self, buf: &[u8]) -> (ParserState, usize) {
        let mut consumed = 0;

        while !self.state.is_terminal() {
            match self.step(&buf[consumed..]) {
                Ok(Some(n)) => consumed += n,
                Ok(None) => break,
                Err(e) => {
                    self.state = ParserState::Failed(e);
                }
            }
        }

        (self.state.clone(), consumed)
    }

    /// The parsed request, once the parser reached `Complete`.
    pub fn into_request(self) -> Option<Request> {
        if self.state != ParserState::Complete {
            return None;
        }

        Some(Request {
            method: self.line.method,
            target: self.line.target,
            version: self.line.version,
            headers: self.headers,
            body: self.body,
            trailers: self.trailers,
        })
    }

    /// Advances by at most one state. `Ok(None)` means more input is needed.
    fn step(&mut self, buf: &[u8]) -> Result<Option<usize>, ParseError> {
        match self.state.clone() {
            ParserState::AwaitingRequestLine => {
                let Some(end) = find_crlf(buf) else {
                    return self.head_pending(buf.len());
                };
                self.head_len = end + 2;
                self.check_head_len()?;
                self.line = parse_request_line(&buf[..end])?;
                self.state = ParserState::AwaitingHeaders;
                Ok(Some(end + 2))
            }

            ParserState::AwaitingHeaders => {
                let Some((headers, consumed)) = Headers::parse(buf)? else {
                    return self.head_pending(buf.len());
                };
                self.head_len += consumed;
                self.check_head_len()?;
                self.state = body_framing(&headers)?;
                self.headers = headers;
                Ok(Some(consumed))
            }

            ParserState::AwaitingBody { remaining } => {
                if buf.is_empty() {
                    return Ok(None);
                }
                let take = remaining.min(buf.len());
                self.body.extend_from_slice(&buf[..take]);
                self.state = match remaining - take {
                    0 => ParserState::Complete,
                    remaining => ParserState::AwaitingBody { remaining },
                };
                Ok(Some(take))
            }

            ParserState::AwaitingChunkSize => {
                let Some(end) = find_crlf(buf) else {
                    if buf.len() > MAX_HEAD_SIZE {
                        return Err(ParseError::MalformedChunk);
                    }
                    return Ok(None);
                };
                self.state = match parse_chunk_size(&buf[..end])? {
                    0 => {
                        self.head_len = 0;
                        ParserState::AwaitingTrailers
                    }
                    size => ParserState::AwaitingChunkData { remaining: size },
                };
                Ok(Some(end + 2))
            }

            ParserState::AwaitingChunkData { remaining } => {
                if buf.is_empty() {
                    return Ok(None);
                }
                let take = remaining.min(buf.len());
                self.body.extend_from_slice(&buf[..take]);
                self.state = match remaining - take {
                    0 => ParserState::AwaitingChunkEnd,
                    remaining => ParserState::AwaitingChunkData { remaining },
                };
                Ok(Some(take))
            }

            ParserState::AwaitingChunkEnd => {
                if buf.len() < 2 {
                    return Ok(None);
                }
                if &buf[..2] != b"\r\n" {
                    return Err(ParseError::MalformedChunk);
                }
                self.state = ParserState::AwaitingChunkSize;
                Ok(Some(2))
            }

            ParserState::AwaitingTrailers => {
                let Some((trailers, consumed)) = Headers::parse(buf)? else {
                    return self.head_pending(buf.len());
                };
                self.head_len = consumed;
                self.check_head_len()?;
                self.trailers = trailers;
                self.state = ParserState::Complete;
                Ok(Some(consumed))
            }

            ParserState::Complete => Ok(None),
            ParserState::Failed(e) => Err(e),
        }
    }

    /// Waits for more head bytes unless `pending` already pushes the block
    /// past [`MAX_HEAD_SIZE`].
    fn head_pending(&self, pending: usize) -> Result<Option<usize>, ParseError> {
        if self.head_len + pending > MAX_HEAD_SIZE {
            return Err(ParseError::HeadTooLarge);
        }
        Ok(None)
    }

    fn check_head_len(&self) -> Result<(), ParseError> {
        if self.head_len > MAX_HEAD_SIZE {
            return Err(ParseError::HeadTooLarge);
        }
        Ok(())
    }
}

/// Splits `METHOD SP TARGET SP HTTP/<version>`.
fn parse_request_line(line: &[u8]) -> Result<RequestLine, ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::MalformedRequestLine)?;
    let parts: Vec<&str> = line.split_whitespace().collect();

    let [method, target, version] = parts.as_slice() else {
        return Err(ParseError::MalformedRequestLine);
    };

    let version = version
        .strip_prefix("HTTP/")
        .filter(|v| !v.is_empty())
        .ok_or(ParseError::MalformedRequestLine)?;

    Ok(RequestLine {
        method: method.to_string(),
        target: target.to_string(),
        version: version.to_string(),
    })
}

/// Picks the body state that follows a complete header block.
fn body_framing(headers: &Headers) -> Result<ParserState, ParseError> {
    if is_chunked(headers) {
        return Ok(ParserState::AwaitingChunkSize);
    }

    let Some(value) = headers.get("Content-Length") else {
        return Ok(ParserState::Complete);
    };

    let length: usize = value
        .trim()
        .parse()
        .map_err(|_| ParseError::InvalidContentLength)?;

    Ok(match length {
        0 => ParserState::Complete,
        remaining => ParserState::AwaitingBody { remaining },
    })
}

/// Hex size of a chunk; `;name=value` extensions are ignored.
fn parse_chunk_size(line: &[u8]) -> Result<usize, ParseError> {
    let line = std::str::from_utf8(line).map_err(|_| ParseError::MalformedChunk)?;
    let size = line.split(';').next().unwrap_or("").trim();

    if size.is_empty() || !size.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseError::MalformedChunk);
    }

    usize::from_str_radix(size, 16).map_err(|_| ParseError::MalformedChunk)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_line_is_consumed_before_headers_arrive() {
        let mut parser = RequestParser::new();
        let (state, consumed) = parser.parse(b"GET / HTTP/1.1\r\nHost: x");

        assert_eq!(state, ParserState::AwaitingHeaders);
        assert_eq!(consumed, 16);
    }

    #[test]
    fn nothing_is_consumed_without_a_full_line() {
        let mut parser = RequestParser::new();
        assert_eq!(
            parser.parse(b"GET / HTT"),
            (ParserState::AwaitingRequestLine, 0)
        );
    }

    #[test]
    fn failure_is_latched() {
        let mut parser = RequestParser::new();
        let (state, _) = parser.parse(b"NOT-HTTP\r\n");
        assert_eq!(state, ParserState::Failed(ParseError::MalformedRequestLine));

        let (state, consumed) = parser.parse(b"GET / HTTP/1.1\r\n\r\n");
        assert_eq!(state, ParserState::Failed(ParseError::MalformedRequestLine));
        assert_eq!(consumed, 0);
        assert!(parser.into_request().is_none());
    }

    #[test]
    fn chunk_size_accepts_extensions_and_upper_case_hex() {
        assert_eq!(parse_chunk_size(b"1A;name=value"), Ok(26));
        assert_eq!(parse_chunk_size(b" ff "), Ok(255));
        assert_eq!(parse_chunk_size(b""), Err(ParseError::MalformedChunk));
        assert_eq!(parse_chunk_size(b"zz"), Err(ParseError::MalformedChunk));
    }

    #[test]
    fn chunk_size_must_be_bare_hex_digits() {
        for line in [&b"+5"[..], b"-5", b"0x5", b"5 5"] {
            assert_eq!(parse_chunk_size(line), Err(ParseError::MalformedChunk));
        }
    }

    #[test]
    fn oversized_head_fails_before_it_completes() {
        let mut parser = RequestParser::new();
        let (state, _) = parser.parse(b"GET / HTTP/1.1\r\n");
        assert_eq!(state, ParserState::AwaitingHeaders);

        let filler = vec![b'a'; MAX_HEAD_SIZE];
        let (state, consumed) = parser.parse(&filler);
        assert_eq!(state, ParserState::Failed(ParseError::HeadTooLarge));
        assert_eq!(consumed, 0);
    }

    #[test]
    fn endless_chunk_size_line_fails() {
        let mut parser = RequestParser::new();
        parser.parse(b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n");
        assert_eq!(parser.state(), &ParserState::AwaitingChunkSize);

        let (state, _) = parser.parse(&vec![b'0'; MAX_HEAD_SIZE + 1]);
        assert_eq!(state, ParserState::Failed(ParseError::MalformedChunk));
    }

    #[test]
    fn head_at_the_limit_is_accepted() {
        let prefix = b"GET / HTTP/1.1\r\nX-Fill: ";
        let fill = MAX_HEAD_SIZE - prefix.len() - 4;
        let mut head = prefix.to_vec();
        head.extend(std::iter::repeat_n(b'a', fill));
        head.extend_from_slice(b"\r\n\r\n");
        assert_eq!(head.len(), MAX_HEAD_SIZE);

        let mut parser = RequestParser::new();
        assert_eq!(parser.parse(&head), (ParserState::Complete, MAX_HEAD_SIZE));
    }

    #[test]
    fn version_token_needs_http_prefix() {
        assert!(parse_request_line(b"GET / HTTP/2").is_ok());
        assert!(parse_request_line(b"GET / HTTP/").is_err());
        assert!(parse_request_line(b"GET / HTTPS/1.1").is_err());
        assert!(parse_request_line(b"GET /").is_err());
        assert!(parse_request_line(b"GET / HTTP/1.1 extra").is_err());
    }
}
