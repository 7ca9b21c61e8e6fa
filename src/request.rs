//! Pooled per-verb request templates.

use crate::error::Error;
use crate::header::Header;
use crate::pool::Reset;
use bytes::Bytes;
use http::header::{CONTENT_LENGTH, HOST};
use http::{HeaderMap, HeaderValue, Method, Request, Uri, Version};
use http_body_util::Full;
use url::Url;

/// A reusable skeleton for requests of a fixed verb.
///
/// Templates are pooled: every field except the verb and protocol version
/// is re-initialized on [`build`](Self::build) and cleared again when the
/// template returns to its pool, so a recycled instance can never leak
/// state into the next call. A template taken from its pool must not be
/// shared; the pool guard enforces exclusive ownership until release.
pub struct RequestTemplate {
    method: Method,
    version: Version,
    uri: Option<Uri>,
    headers: HeaderMap,
    body: Bytes,
}

impl RequestTemplate {
    fn new(method: Method) -> Self {
        Self {
            method,
            version: Version::HTTP_11,
            uri: None,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn head() -> Self {
        Self::new(Method::HEAD)
    }

    /// Re-initialize the template from a target address and materialize the
    /// outbound request.
    ///
    /// Parses `addr` as an absolute http/https URL, sets destination and
    /// Host from it, attaches `header` verbatim (last writer wins per key,
    /// including over the derived Host), and installs the body for POST:
    /// an empty body clears any previous body and content-length, a
    /// non-empty one becomes an owned, cheaply re-readable byte sequence
    /// with content-length set to its exact length.
    pub fn build(
        &mut self,
        addr: &str,
        header: Header,
        body: Option<Bytes>,
    ) -> Result<Request<Full<Bytes>>, Error> {
        let url = Url::parse(addr).map_err(|e| Error::InvalidAddress {
            addr: addr.to_string(),
            source: Some(e),
        })?;
        if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
            return Err(Error::invalid_address(addr));
        }
        let uri: Uri = url.as_str().parse().map_err(|_| Error::invalid_address(addr))?;

        self.uri = Some(uri);
        self.headers.clear();
        if let Ok(host) = HeaderValue::from_str(&host_header(&url)) {
            self.headers.insert(HOST, host);
        }
        self.headers.extend(header.into_inner());
        self.set_body(body.unwrap_or_default());

        self.take_request(addr)
    }

    fn set_body(&mut self, body: Bytes) {
        if body.is_empty() {
            self.body = Bytes::new();
            self.headers.remove(CONTENT_LENGTH);
        } else {
            self.headers.insert(CONTENT_LENGTH, HeaderValue::from(body.len()));
            self.body = body;
        }
    }

    fn take_request(&mut self, addr: &str) -> Result<Request<Full<Bytes>>, Error> {
        let uri = self.uri.take().ok_or_else(|| Error::invalid_address(addr))?;
        let body = std::mem::take(&mut self.body);
        let mut req = Request::builder()
            .method(self.method.clone())
            .version(self.version)
            .uri(uri)
            .body(Full::new(body))
            .map_err(|_| Error::invalid_address(addr))?;
        *req.headers_mut() = std::mem::take(&mut self.headers);
        Ok(req)
    }
}

impl Reset for RequestTemplate {
    fn reset(&mut self) {
        self.uri = None;
        self.headers.clear();
        self.body = Bytes::new();
    }
}

/// Host header value: host plus port when the URL carries a non-default one.
fn host_header(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default();
    match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_sets_destination_and_host() {
        let mut tpl = RequestTemplate::get();
        let req = tpl.build("http://example.com:8080/path", Header::new(), None).unwrap();
        assert_eq!(req.method(), Method::GET);
        assert_eq!(req.uri().host(), Some("example.com"));
        assert_eq!(req.headers().get(HOST).unwrap(), "example.com:8080");
    }

    #[test]
    fn test_build_rejects_schemeless_address() {
        let mut tpl = RequestTemplate::get();
        let err = tpl.build("127.0.0.1:2017", Header::new(), None).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { .. }));
    }

    #[test]
    fn test_build_rejects_garbage() {
        let mut tpl = RequestTemplate::get();
        let err = tpl.build("not a url", Header::new(), None).unwrap_err();
        assert!(matches!(err, Error::InvalidAddress { .. }));
    }

    #[test]
    fn test_post_body_sets_content_length() {
        let mut tpl = RequestTemplate::post();
        let req = tpl
            .build("http://example.com/", Header::new(), Some(Bytes::from_static(b"test=test")))
            .unwrap();
        assert_eq!(req.headers().get(CONTENT_LENGTH).unwrap(), "9");
    }

    #[test]
    fn test_empty_post_body_clears_content_length() {
        let mut tpl = RequestTemplate::post();
        // A previous use left a body behind; an empty body must clear it.
        let _ = tpl
            .build("http://example.com/", Header::new(), Some(Bytes::from_static(b"stale")))
            .unwrap();
        let req = tpl.build("http://example.com/", Header::new(), Some(Bytes::new())).unwrap();
        assert!(req.headers().get(CONTENT_LENGTH).is_none());
    }

    #[test]
    fn test_caller_headers_win_over_derived_host() {
        let mut tpl = RequestTemplate::get();
        let mut header = Header::new();
        header.set("host", "override.example");
        let req = tpl.build("http://example.com/", header, None).unwrap();
        assert_eq!(req.headers().get(HOST).unwrap(), "override.example");
    }

    #[test]
    fn test_recycled_template_carries_nothing_over() {
        let mut tpl = RequestTemplate::post();
        let mut header = Header::new();
        header.set("x-first", "1");
        let _ = tpl
            .build("http://example.com/", header, Some(Bytes::from_static(b"body")))
            .unwrap();

        tpl.reset();
        let req = tpl.build("http://example.com/", Header::new(), None).unwrap();
        assert!(req.headers().get("x-first").is_none());
        assert!(req.headers().get(CONTENT_LENGTH).is_none());
    }
}
