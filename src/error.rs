use std::time::Duration;
use thiserror::Error;

pub(crate) type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Errors surfaced by the facade.
///
/// Per-request failures are always returned to the immediate caller; nothing
/// is retried or swallowed internally.
#[derive(Debug, Error)]
pub enum Error {
    /// The target address could not be parsed as an absolute http/https URL.
    /// Returned before any network I/O is attempted.
    #[error("invalid address `{addr}`")]
    InvalidAddress {
        addr: String,
        #[source]
        source: Option<url::ParseError>,
    },

    /// The caller-supplied deadline elapsed before the round trip finished.
    #[error("request deadline of {0:?} exceeded")]
    TimedOut(Duration),

    /// Network, TLS, or protocol failure during dispatch.
    #[error("transport failure")]
    Transport(#[source] BoxError),

    /// Malformed proxy address or dialer parameters. Raised by
    /// [`set_proxy`](crate::set_proxy) before the strategy is installed,
    /// never per-request.
    #[error("proxy configuration error: {0}")]
    ProxyConfiguration(String),
}

impl Error {
    pub(crate) fn invalid_address(addr: impl Into<String>) -> Self {
        Error::InvalidAddress { addr: addr.into(), source: None }
    }

    pub(crate) fn transport(err: impl Into<BoxError>) -> Self {
        Error::Transport(err.into())
    }

    /// Whether this error is a deadline-exceeded transport failure.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::TimedOut(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timeout_classification() {
        let err = Error::TimedOut(Duration::from_millis(10));
        assert!(err.is_timeout());
        assert!(!Error::invalid_address("nope").is_timeout());
    }

    #[test]
    fn test_invalid_address_display() {
        let err = Error::invalid_address("not a url");
        assert_eq!(err.to_string(), "invalid address `not a url`");
    }
}
