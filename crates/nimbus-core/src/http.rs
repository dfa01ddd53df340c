//! Minimal HTTP/1.0 client helpers for the forecast API.
//!
//! The firmware talks to the API over a raw TCP socket. Requests are sent
//! as HTTP/1.0 with `Connection: close` so the server answers with a plain
//! body ended by `Content-Length` or by closing the connection, never with
//! chunked encoding.

use core::fmt::Write;

use thiserror_no_std::Error;

use crate::forecast::bounded;

/// Port used for plain-text HTTP.
pub const HTTP_PORT: u16 = 80;

const USER_AGENT: &str = "nimbus-rs/0.1";

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpError {
    /// The response head has not been fully received yet.
    #[error("incomplete response head")]
    Incomplete,
    #[error("malformed response")]
    Malformed,
    #[error("unexpected status {0}")]
    Status(u16),
    /// The connection closed before `Content-Length` bytes arrived.
    #[error("body truncated: expected {expected} bytes, got {received}")]
    Truncated { expected: usize, received: usize },
    #[error("unsupported transfer encoding")]
    UnsupportedEncoding,
    /// Request did not fit in the caller's buffer.
    #[error("request too long")]
    RequestTooLong,
}

/// A parsed response referencing the receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Response<'a> {
    pub status: u16,
    pub content_length: Option<usize>,
    pub body: &'a [u8],
}

/// API path of the forecast for `woeid`.
pub fn forecast_path(woeid: u32) -> heapless::String<40> {
    bounded(format_args!("/api/location/{}/", woeid))
}

/// Build a GET request for `path` on `host`.
pub fn build_get_request<const N: usize>(
    host: &str,
    path: &str,
) -> Result<heapless::String<N>, HttpError> {
    let mut request = heapless::String::new();
    write!(
        request,
        "GET {} HTTP/1.0\r\nHost: {}\r\nUser-Agent: {}\r\nAccept: application/json\r\nConnection: close\r\n\r\n",
        path, host, USER_AGENT
    )
    .map_err(|_| HttpError::RequestTooLong)?;
    Ok(request)
}

fn find_head_end(data: &[u8]) -> Option<usize> {
    data.windows(4).position(|w| w == b"\r\n\r\n")
}

fn parse_status_line(line: &str) -> Result<u16, HttpError> {
    let mut parts = line.split_ascii_whitespace();
    let version = parts.next().ok_or(HttpError::Malformed)?;
    if !version.starts_with("HTTP/") {
        return Err(HttpError::Malformed);
    }
    parts
        .next()
        .and_then(|code| code.parse().ok())
        .ok_or(HttpError::Malformed)
}

/// Parse a complete response read until the server closed the connection.
///
/// Only `200 OK` is accepted. When a `Content-Length` header is present
/// the body is cut to that length, and a shorter body is an error.
pub fn parse_response(data: &[u8]) -> Result<Response<'_>, HttpError> {
    let head_end = find_head_end(data).ok_or(HttpError::Incomplete)?;
    let head = core::str::from_utf8(&data[..head_end]).map_err(|_| HttpError::Malformed)?;
    let mut lines = head.split("\r\n");

    let status = parse_status_line(lines.next().ok_or(HttpError::Malformed)?)?;
    if status != 200 {
        return Err(HttpError::Status(status));
    }

    let mut content_length = None;
    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim();
        if name.eq_ignore_ascii_case("content-length") {
            content_length = Some(value.parse().map_err(|_| HttpError::Malformed)?);
        } else if name.eq_ignore_ascii_case("transfer-encoding")
            && !value.eq_ignore_ascii_case("identity")
        {
            return Err(HttpError::UnsupportedEncoding);
        }
    }

    let body = &data[head_end + 4..];
    let body = match content_length {
        Some(expected) if body.len() < expected => {
            return Err(HttpError::Truncated {
                expected,
                received: body.len(),
            });
        }
        Some(expected) => &body[..expected],
        None => body,
    };

    Ok(Response {
        status,
        content_length,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_forecast_path() {
        assert_eq!(forecast_path(1118370).as_str(), "/api/location/1118370/");
    }

    #[test]
    fn test_build_get_request() {
        let request: heapless::String<256> =
            build_get_request("www.metaweather.com", "/api/location/1118370/").unwrap();
        assert!(request.starts_with("GET /api/location/1118370/ HTTP/1.0\r\n"));
        assert!(request.contains("\r\nHost: www.metaweather.com\r\n"));
        assert!(request.contains("\r\nConnection: close\r\n"));
        assert!(request.ends_with("\r\n\r\n"));
    }

    #[test]
    fn test_request_too_long() {
        let request = build_get_request::<16>("www.metaweather.com", "/");
        assert_eq!(request, Err(HttpError::RequestTooLong));
    }

    #[test]
    fn test_parse_response_with_length() {
        let raw = b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 2\r\n\r\n{}trailing";
        let response = parse_response(raw).unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.content_length, Some(2));
        assert_eq!(response.body, b"{}");
    }

    #[test]
    fn test_parse_response_until_close() {
        let raw = b"HTTP/1.0 200 OK\r\nServer: test\r\n\r\n[1,2]";
        let response = parse_response(raw).unwrap();
        assert_eq!(response.content_length, None);
        assert_eq!(response.body, b"[1,2]");
    }

    #[test]
    fn test_parse_response_errors() {
        assert_eq!(
            parse_response(b"HTTP/1.0 404 Not Found\r\n\r\n"),
            Err(HttpError::Status(404))
        );
        assert_eq!(
            parse_response(b"HTTP/1.0 200 OK\r\nContent-Le"),
            Err(HttpError::Incomplete)
        );
        assert_eq!(
            parse_response(b"garbage\r\n\r\n"),
            Err(HttpError::Malformed)
        );
        assert_eq!(
            parse_response(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n2\r\n{}\r\n0\r\n\r\n"),
            Err(HttpError::UnsupportedEncoding)
        );
        assert_eq!(
            parse_response(b"HTTP/1.0 200 OK\r\nContent-Length: 10\r\n\r\n{}"),
            Err(HttpError::Truncated {
                expected: 10,
                received: 2
            })
        );
    }
}
