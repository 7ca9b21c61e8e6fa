//! Shared transport configuration and the pluggable dialer.

pub mod config;
pub mod connector;
pub(crate) mod socks;

pub use config::{current, replace, ProxySpec, TransportConfig};
pub use connector::PooledConnector;
