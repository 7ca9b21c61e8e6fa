//! Materialized HTTP responses.

use crate::header::Header;
use bytes::Bytes;
use http::StatusCode;

/// An immutable response snapshot owned by the caller.
///
/// The body is an independent copy made while draining the wire; it never
/// aliases pool-owned buffer memory.
#[derive(Debug, Clone)]
pub struct Response {
    status: StatusCode,
    headers: Header,
    body: Bytes,
}

impl Response {
    pub(crate) fn new(status: StatusCode, headers: Header, body: Bytes) -> Self {
        Self { status, headers, body }
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &Header {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Body decoded as UTF-8, lossily.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn into_body(self) -> Bytes {
        self.body
    }

    pub fn into_headers(self) -> Header {
        self.headers
    }
}
