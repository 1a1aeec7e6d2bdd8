use crate::http::headers::Headers;

/// A fully parsed HTTP request.
///
/// The method and target are kept as the raw tokens from the request line;
/// no method set or target form is enforced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    /// Method token (e.g. "GET")
    pub method: String,
    /// Raw request target, path plus query (e.g. "/search?q=rust")
    pub target: String,
    /// Version without the `HTTP/` prefix (e.g. "1.1")
    pub version: String,
    pub headers: Headers,
    /// Decoded body. Chunk framing is never part of it.
    pub body: Vec<u8>,
    /// Trailer fields sent after the terminal chunk of a chunked body
    pub trailers: Headers,
}

/// Builder for constructing Request objects.
#[derive(Default)]
pub struct RequestBuilder {
    method: Option<String>,
    target: Option<String>,
    version: Option<String>,
    headers: Headers,
    body: Vec<u8>,
}

impl RequestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.method = Some(method.into());
        self
    }

    pub fn target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = Some(version.into());
        self
    }

    /// Appends a header value; repeated names accumulate.
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.add(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    pub fn build(self) -> Result<Request, &'static str> {
        Ok(Request {
            method: self.method.ok_or("method missing")?,
            target: self.target.ok_or("target missing")?,
            version: self.version.unwrap_or_else(|| "1.1".to_string()),
            headers: self.headers,
            body: self.body,
            trailers: Headers::new(),
        })
    }
}

impl Request {
    /// Retrieves the first value of a header, case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)
    }

    /// Parsed `Content-Length`, or `None` when the header is missing or not
    /// a number.
    pub fn content_length(&self) -> Option<usize> {
        self.header("Content-Length").and_then(|v| v.parse().ok())
    }

    /// Whether any `Transfer-Encoding` value mentions `chunked`.
    pub fn is_chunked(&self) -> bool {
        is_chunked(&self.headers)
    }

    /// Determines whether the connection should remain open after the response.
    ///
    /// Only an explicit `Connection: close` ends the connection; every other
    /// value, or no header at all, keeps it alive.
    pub fn keep_alive(&self) -> bool {
        self.header("Connection")
            .map(|v| !v.trim().eq_ignore_ascii_case("close"))
            .unwrap_or(true)
    }
}

pub(crate) fn is_chunked(headers: &Headers) -> bool {
    headers
        .values("Transfer-Encoding")
        .iter()
        .any(|v| v.to_ascii_lowercase().contains("chunked"))
}
