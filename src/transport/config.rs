//! Connection-level policy shared by all dispatched calls.

use once_cell::sync::Lazy;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use url::Url;

/// Installed proxy route for outbound connections.
#[derive(Debug, Clone)]
pub enum ProxySpec {
    /// Tunnel through an HTTP proxy via CONNECT. Credentials, when present,
    /// ride on the URL and become a `Proxy-Authorization` header.
    Http { url: Url },
    /// Dial through an authenticated SOCKS5 endpoint. `addr` is `host:port`.
    Socks5 {
        addr: String,
        auth: Option<(String, String)>,
    },
}

/// Transport configuration: connection limits, timeouts, TLS policy, and
/// the optional proxy route.
///
/// A [`Client`](crate::Client) captures the configuration it is built with;
/// replacing the process-scoped configuration afterwards does not affect
/// already-built clients. Apply proxy changes before traffic starts.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    /// Cap on concurrent connections to a single host. Callers beyond the
    /// cap queue inside the transport, not in application code.
    pub max_connections_per_host: usize,
    /// How long an idle pooled connection may linger before being dropped.
    pub idle_timeout: Duration,
    /// Budget for the TLS handshake alone; the per-call deadline covers the
    /// rest of the round trip.
    pub handshake_timeout: Duration,
    /// When false, connections are not reused across calls.
    pub keep_alive: bool,
    /// Skip TLS certificate and hostname verification. Off by default;
    /// enabling this makes connections trivially interceptable.
    pub danger_accept_invalid_certs: bool,
    /// Proxy route applied to every outbound connection.
    pub proxy: Option<ProxySpec>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            max_connections_per_host: 5,
            idle_timeout: Duration::from_secs(5),
            handshake_timeout: Duration::from_secs(5),
            keep_alive: true,
            danger_accept_invalid_certs: false,
            proxy: None,
        }
    }
}

impl TransportConfig {
    pub fn max_connections_per_host(mut self, max: usize) -> Self {
        self.max_connections_per_host = max;
        self
    }

    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.idle_timeout = timeout;
        self
    }

    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    pub fn keep_alive(mut self, enabled: bool) -> Self {
        self.keep_alive = enabled;
        self
    }

    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.danger_accept_invalid_certs = accept;
        self
    }

    pub fn proxy(mut self, proxy: ProxySpec) -> Self {
        self.proxy = Some(proxy);
        self
    }
}

// Process-scoped configuration consumed by the shared client at first use.
// Replacement swaps the whole Arc; readers always observe a consistent
// snapshot, never a half-updated one.
static CURRENT: Lazy<RwLock<Arc<TransportConfig>>> =
    Lazy::new(|| RwLock::new(Arc::new(TransportConfig::default())));

/// Snapshot of the process-scoped transport configuration.
pub fn current() -> Arc<TransportConfig> {
    CURRENT.read().unwrap_or_else(PoisonError::into_inner).clone()
}

/// Atomically replace the process-scoped transport configuration.
///
/// Takes effect for clients built afterwards; the shared client singleton
/// keeps the configuration it was first built with.
pub fn replace(cfg: TransportConfig) {
    *CURRENT.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(cfg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_policy() {
        let cfg = TransportConfig::default();
        assert_eq!(cfg.max_connections_per_host, 5);
        assert_eq!(cfg.idle_timeout, Duration::from_secs(5));
        assert_eq!(cfg.handshake_timeout, Duration::from_secs(5));
        assert!(cfg.keep_alive);
        assert!(!cfg.danger_accept_invalid_certs, "TLS verification must be on by default");
        assert!(cfg.proxy.is_none());
    }

    #[test]
    fn test_builder_setters() {
        let cfg = TransportConfig::default()
            .max_connections_per_host(2)
            .keep_alive(false)
            .idle_timeout(Duration::from_millis(100));
        assert_eq!(cfg.max_connections_per_host, 2);
        assert!(!cfg.keep_alive);
        assert_eq!(cfg.idle_timeout, Duration::from_millis(100));
    }
}
