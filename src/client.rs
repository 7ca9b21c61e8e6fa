//! Client handle and the process-wide shared client.

use crate::dispatch;
use crate::error::Error;
use crate::header::Header;
use crate::proxy::ProxyStrategy;
use crate::response::Response;
use crate::transport;
use crate::transport::config::TransportConfig;
use crate::transport::connector::PooledConnector;
use bytes::Bytes;
use http::Request;
use http_body_util::Full;
use hyper::body::Incoming;
use hyper_util::client::legacy::Client as HyperClient;
use hyper_util::rt::{TokioExecutor, TokioTimer};
use once_cell::sync::Lazy;
use std::sync::Arc;
use std::time::Duration;

// The shared client binds to whatever transport configuration is in effect
// at first use; construction runs exactly once under concurrent first calls.
static SHARED: Lazy<Client> = Lazy::new(|| Client::with_config(transport::current().as_ref().clone()));

/// The process-wide shared client.
///
/// Constructed on first call from the current transport configuration and
/// reused for the process lifetime. Configuration replaced afterwards via
/// [`set_transport`] or [`set_proxy`] does not rebuild it.
pub fn client() -> &'static Client {
    &SHARED
}

/// Install a proxy strategy into the process-scoped transport configuration.
///
/// Fails with [`Error::ProxyConfiguration`] on malformed parameters without
/// touching the installed configuration. Apply before traffic starts: the
/// shared client keeps the configuration it was first built with, and
/// in-flight requests are unaffected either way.
pub fn set_proxy<P: ProxyStrategy>(strategy: P) -> Result<(), Error> {
    let mut cfg = transport::current().as_ref().clone();
    strategy.configure_transport(&mut cfg)?;
    transport::replace(cfg);
    Ok(())
}

/// Atomically replace the process-scoped transport configuration.
pub fn set_transport(cfg: TransportConfig) {
    transport::replace(cfg);
}

/// An HTTP client bound to one transport configuration.
///
/// Cheap to clone; clones share the underlying engine and its connection
/// pool. Most callers use the module-level [`get`](crate::get) /
/// [`post`](crate::post) / [`head`](crate::head) facade over the shared
/// client; embedders and tests that need an isolated transport build their
/// own handle with [`Client::with_config`].
#[derive(Clone)]
pub struct Client {
    inner: HyperClient<PooledConnector, Full<Bytes>>,
    config: Arc<TransportConfig>,
}

impl Default for Client {
    fn default() -> Self {
        Self::with_config(TransportConfig::default())
    }
}

impl Client {
    pub fn with_config(cfg: TransportConfig) -> Self {
        let config = Arc::new(cfg);
        let connector = PooledConnector::new(config.clone());

        let mut builder = HyperClient::builder(TokioExecutor::new());
        builder
            .pool_timer(TokioTimer::new())
            .pool_idle_timeout(config.idle_timeout)
            .pool_max_idle_per_host(if config.keep_alive {
                config.max_connections_per_host
            } else {
                0
            });

        Self { inner: builder.build(connector), config }
    }

    pub fn config(&self) -> &TransportConfig {
        &self.config
    }

    /// Issue a GET and materialize the full response.
    pub async fn get(
        &self,
        addr: &str,
        header: Header,
        timeout: Duration,
    ) -> Result<Response, Error> {
        dispatch::run(self, &dispatch::GET_TEMPLATES, addr, header, None, timeout).await
    }

    /// Issue a POST with `body` and materialize the full response. An empty
    /// body transmits no payload and no content-length.
    pub async fn post(
        &self,
        addr: &str,
        body: impl Into<Bytes>,
        header: Header,
        timeout: Duration,
    ) -> Result<Response, Error> {
        dispatch::run(self, &dispatch::POST_TEMPLATES, addr, header, Some(body.into()), timeout)
            .await
    }

    /// Issue a HEAD and return the response headers.
    pub async fn head(
        &self,
        addr: &str,
        header: Header,
        timeout: Duration,
    ) -> Result<Header, Error> {
        dispatch::run(self, &dispatch::HEAD_TEMPLATES, addr, header, None, timeout)
            .await
            .map(Response::into_headers)
    }

    pub(crate) async fn execute(
        &self,
        req: Request<Full<Bytes>>,
    ) -> Result<http::Response<Incoming>, Error> {
        self.inner.request(req).await.map_err(Error::transport)
    }
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client").field("config", &self.config).finish()
    }
}
