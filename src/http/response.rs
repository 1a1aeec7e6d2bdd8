use crate::http::headers::Headers;

/// HTTP status codes the writer knows how to render.
///
/// - `Ok` (200): Request successful
/// - `BadRequest` (400): Malformed request
/// - `InternalServerError` (500): Server error, and the rendering used for
///   any code not listed here
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusCode {
    /// 200 OK
    Ok,
    /// 400 Bad Request
    BadRequest,
    /// 500 Internal Server Error
    InternalServerError,
}

impl StatusCode {
    /// Returns the numeric HTTP status code.
    ///
    /// # Example
    ///
    /// ```
    /// # use tidewire::http::response::StatusCode;
    /// assert_eq!(StatusCode::Ok.as_u16(), 200);
    /// assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    /// ```
    pub fn as_u16(&self) -> u16 {
        match self {
            StatusCode::Ok => 200,
            StatusCode::BadRequest => 400,
            StatusCode::InternalServerError => 500,
        }
    }

    /// Returns the standard HTTP reason phrase for this status code.
    pub fn reason_phrase(&self) -> &'static str {
        match self {
            StatusCode::Ok => "OK",
            StatusCode::BadRequest => "Bad Request",
            StatusCode::InternalServerError => "Internal Server Error",
        }
    }

    /// Full status line, CRLF included.
    pub fn status_line(&self) -> &'static str {
        match self {
            StatusCode::Ok => "HTTP/1.1 200 OK\r\n",
            StatusCode::BadRequest => "HTTP/1.1 400 Bad Request\r\n",
            StatusCode::InternalServerError => "HTTP/1.1 500 Internal Server Error\r\n",
        }
    }
}

/// Unknown codes fall back to `InternalServerError`.
///
/// ```
/// # use tidewire::http::response::StatusCode;
/// assert_eq!(StatusCode::from(200), StatusCode::Ok);
/// assert_eq!(StatusCode::from(418), StatusCode::InternalServerError);
/// ```
impl From<u16> for StatusCode {
    fn from(code: u16) -> Self {
        match code {
            200 => StatusCode::Ok,
            400 => StatusCode::BadRequest,
            _ => StatusCode::InternalServerError,
        }
    }
}

/// `Content-Length`, `Content-Type` and `Connection` for a buffered body.
pub fn default_headers(body_len: usize, content_type: &str, keep_alive: bool) -> Headers {
    let mut headers = Headers::new();
    headers.set("Content-Length", body_len.to_string());
    headers.set("Content-Type", content_type);
    headers.set("Connection", if keep_alive { "keep-alive" } else { "close" });
    headers
}
