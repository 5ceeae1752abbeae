//! Response sinks the router writes into.

use http::header::{CONTENT_TYPE, HeaderValue};
use http::{HeaderMap, StatusCode};
use std::io::{self, Write};
use symserve_api::Denial;

pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=utf-8";
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

/// A complete, non-streamed response.
#[derive(Debug, Clone)]
pub struct PlainResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl PlainResponse {
    pub fn text(status: StatusCode, body: impl Into<String>) -> Self {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(TEXT_CONTENT_TYPE));
        Self {
            status,
            headers,
            body: body.into(),
        }
    }
}

impl From<Denial> for PlainResponse {
    fn from(denial: Denial) -> Self {
        let mut response = PlainResponse::text(denial.status, denial.message);
        for (name, value) in denial.headers.iter() {
            response.headers.insert(name.clone(), value.clone());
        }
        response
    }
}

/// Destination of exactly one HTTP response.
///
/// The status is committed by the first call to [`send`](Self::send) or
/// [`start_body`](Self::start_body); later calls fail.
pub trait ResponseSink {
    fn send(&mut self, response: PlainResponse) -> io::Result<()>;

    /// Commits `status` and returns the writer for a streamed body.
    fn start_body(&mut self, status: StatusCode) -> io::Result<Box<dyn Write + '_>>;

    /// Cuts a started body short so the client can tell the transfer failed.
    fn abort(&mut self, reason: &str);

    fn is_committed(&self) -> bool;
}

fn already_committed() -> io::Error {
    io::Error::other("response already committed")
}

/// Collects the response in memory.
#[derive(Debug, Default)]
pub struct BufferedResponse {
    pub status: Option<StatusCode>,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
    pub aborted: Option<String>,
}

impl BufferedResponse {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl ResponseSink for BufferedResponse {
    fn send(&mut self, response: PlainResponse) -> io::Result<()> {
        if self.is_committed() {
            return Err(already_committed());
        }
        self.status = Some(response.status);
        self.headers = response.headers;
        self.body = response.body.into_bytes();
        Ok(())
    }

    fn start_body(&mut self, status: StatusCode) -> io::Result<Box<dyn Write + '_>> {
        if self.is_committed() {
            return Err(already_committed());
        }
        self.status = Some(status);
        self.headers
            .insert(CONTENT_TYPE, HeaderValue::from_static(BINARY_CONTENT_TYPE));
        Ok(Box::new(&mut self.body))
    }

    fn abort(&mut self, reason: &str) {
        self.aborted = Some(reason.to_string());
    }

    fn is_committed(&self) -> bool {
        self.status.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::header::WWW_AUTHENTICATE;

    #[test]
    fn test_denial_keeps_status_and_headers() {
        let mut denial = Denial::new(StatusCode::UNAUTHORIZED, "Login required");
        denial
            .headers
            .insert(WWW_AUTHENTICATE, HeaderValue::from_static("Basic realm=\"x\""));

        let response = PlainResponse::from(denial);
        assert_eq!(response.status, StatusCode::UNAUTHORIZED);
        assert_eq!(response.body, "Login required");
        assert_eq!(response.headers[WWW_AUTHENTICATE], "Basic realm=\"x\"");
        assert_eq!(response.headers[CONTENT_TYPE], TEXT_CONTENT_TYPE);
    }

    #[test]
    fn test_buffered_response_commits_once() {
        let mut sink = BufferedResponse::new();
        {
            let mut body = sink.start_body(StatusCode::OK).unwrap();
            body.write_all(b"bytes").unwrap();
        }
        assert!(sink.is_committed());
        assert!(sink.send(PlainResponse::text(StatusCode::NOT_FOUND, "x")).is_err());
        assert_eq!(sink.status(), Some(StatusCode::OK));
        assert_eq!(sink.body, b"bytes");
    }
}
