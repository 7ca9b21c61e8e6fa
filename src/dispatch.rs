//! Get/Post/Head orchestration: pooled template -> shared client ->
//! response materialization.

use crate::client::{client, Client};
use crate::error::Error;
use crate::header::Header;
use crate::pool::Pool;
use crate::request::RequestTemplate;
use crate::response::Response;
use bytes::{Bytes, BytesMut};
use http_body_util::BodyExt;
use hyper::body::Incoming;
use std::time::Duration;

// One template pool per verb, plus a pool of drain buffers shared by all
// responses. Templates are released as soon as the outbound request is
// materialized; drain buffers as soon as the body bytes are copied out.
pub(crate) static GET_TEMPLATES: Pool<RequestTemplate> = Pool::new(RequestTemplate::get);
pub(crate) static POST_TEMPLATES: Pool<RequestTemplate> = Pool::new(RequestTemplate::post);
pub(crate) static HEAD_TEMPLATES: Pool<RequestTemplate> = Pool::new(RequestTemplate::head);
pub(crate) static DRAIN_BUFFERS: Pool<BytesMut> = Pool::new(drain_buffer);

fn drain_buffer() -> BytesMut {
    BytesMut::with_capacity(8 * 1024)
}

/// GET `addr` through the shared client.
///
/// `timeout` bounds the entire round trip, from connection setup through
/// body drain; on expiry the in-flight I/O is aborted and
/// [`Error::TimedOut`] is returned. No retry at any layer.
pub async fn get(addr: &str, header: Header, timeout: Duration) -> Result<Response, Error> {
    client().get(addr, header, timeout).await
}

/// POST `body` to `addr` through the shared client. An empty body
/// transmits no payload and no content-length.
pub async fn post(
    addr: &str,
    body: impl Into<Bytes>,
    header: Header,
    timeout: Duration,
) -> Result<Response, Error> {
    client().post(addr, body, header, timeout).await
}

/// HEAD `addr` through the shared client, returning only the response
/// headers.
pub async fn head(addr: &str, header: Header, timeout: Duration) -> Result<Header, Error> {
    client().head(addr, header, timeout).await
}

/// Shared dispatch shape for all verbs.
pub(crate) async fn run(
    client: &Client,
    pool: &'static Pool<RequestTemplate>,
    addr: &str,
    header: Header,
    body: Option<Bytes>,
    timeout: Duration,
) -> Result<Response, Error> {
    // The template goes back to its pool the moment the outbound request is
    // built, before any network I/O. The guard releases it on the error
    // path too.
    let req = {
        let mut template = pool.acquire();
        template.build(addr, header, body)?
    };

    tracing::debug!(
        method = %req.method(),
        addr,
        timeout_ms = timeout.as_millis() as u64,
        "dispatching request"
    );

    let round_trip = async {
        let resp = client.execute(req).await?;
        materialize(resp).await
    };
    match tokio::time::timeout(timeout, round_trip).await {
        // Dropping the round-trip future aborts in-flight I/O and returns
        // any held drain buffer to its pool.
        Err(_) => Err(Error::TimedOut(timeout)),
        Ok(result) => result,
    }
}

/// Drain the wire body through a pooled buffer and snapshot the response.
/// The returned bytes are an independent copy, never an alias into
/// pool-owned memory.
async fn materialize(resp: http::Response<Incoming>) -> Result<Response, Error> {
    let (parts, mut body) = resp.into_parts();

    let bytes = {
        let mut buf = DRAIN_BUFFERS.acquire();
        while let Some(frame) = body.frame().await {
            let frame = frame.map_err(Error::transport)?;
            if let Some(chunk) = frame.data_ref() {
                buf.extend_from_slice(chunk);
            }
        }
        Bytes::copy_from_slice(&buf)
    };

    Ok(Response::new(parts.status, Header::from(parts.headers), bytes))
}
