use tidewire::http::response::{StatusCode, default_headers};

#[test]
fn test_status_code_as_u16() {
    assert_eq!(StatusCode::Ok.as_u16(), 200);
    assert_eq!(StatusCode::BadRequest.as_u16(), 400);
    assert_eq!(StatusCode::InternalServerError.as_u16(), 500);
}

#[test]
fn test_status_code_reason_phrase() {
    assert_eq!(StatusCode::Ok.reason_phrase(), "OK");
    assert_eq!(StatusCode::BadRequest.reason_phrase(), "Bad Request");
    assert_eq!(
        StatusCode::InternalServerError.reason_phrase(),
        "Internal Server Error"
    );
}

#[test]
fn test_status_lines() {
    assert_eq!(StatusCode::Ok.status_line(), "HTTP/1.1 200 OK\r\n");
    assert_eq!(StatusCode::BadRequest.status_line(), "HTTP/1.1 400 Bad Request\r\n");
    assert_eq!(
        StatusCode::InternalServerError.status_line(),
        "HTTP/1.1 500 Internal Server Error\r\n"
    );
}

#[test]
fn test_unknown_codes_fall_back_to_internal_error() {
    assert_eq!(StatusCode::from(200), StatusCode::Ok);
    assert_eq!(StatusCode::from(400), StatusCode::BadRequest);
    assert_eq!(StatusCode::from(500), StatusCode::InternalServerError);

    for code in [201, 204, 301, 404, 418, 503] {
        assert_eq!(StatusCode::from(code), StatusCode::InternalServerError);
    }
}

#[test]
fn test_default_headers_keep_alive() {
    let headers = default_headers(5, "text/plain", true);

    assert_eq!(headers.get("Content-Length"), Some("5"));
    assert_eq!(headers.get("Content-Type"), Some("text/plain"));
    assert_eq!(headers.get("Connection"), Some("keep-alive"));
}

#[test]
fn test_default_headers_close() {
    let headers = default_headers(0, "text/html", false);

    assert_eq!(headers.get("Content-Length"), Some("0"));
    assert_eq!(headers.get("Connection"), Some("close"));
    assert_eq!(
        String::from_utf8(headers.format()).unwrap(),
        "Content-Length: 0\r\nContent-Type: text/html\r\nConnection: close\r\n\r\n"
    );
}
