//! # webpool
//!
//! A pooled HTTP client facade for Rust.
//!
//! `webpool` issues GET/POST/HEAD requests over a shared hyper transport,
//! recycling request templates and response drain buffers to keep per-call
//! allocation flat under high request volume, and routes outbound
//! connections through pluggable HTTP or SOCKS5 proxies.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use webpool::Header;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() {
//!     let mut header = Header::new();
//!     header.set("user-agent", "webpool/0.1");
//!     let resp = webpool::get("http://example.com", header, Duration::from_secs(3))
//!         .await
//!         .unwrap();
//!     println!("{}: {} bytes", resp.status(), resp.body().len());
//! }
//! ```
//!
//! ## Modules
//!
//! - [`dispatch`] - Get/Post/Head orchestration over the shared client
//! - [`pool`] - Thread-safe object pools with RAII release
//! - [`request`] - Pooled per-verb request templates
//! - [`transport`] - Transport configuration and the pluggable dialer
//! - [`proxy`] - HTTP and SOCKS5 proxy strategies
//!
//! ## Proxying
//!
//! Proxy installation mutates the process-wide transport configuration and
//! only affects clients built afterwards. Apply it before traffic starts:
//!
//! ```rust,ignore
//! webpool::set_proxy(webpool::HttpProxy { addr: "http://127.0.0.1:8080".into() })?;
//! ```
//!
//! ## Security
//!
//! TLS certificate verification is on by default. Disabling it is an
//! explicit opt-in via [`TransportConfig::danger_accept_invalid_certs`].

pub mod client;
pub mod dispatch;
pub mod error;
pub mod header;
pub mod pool;
pub mod proxy;
pub mod request;
pub mod response;
pub mod transport;

pub use client::{client, set_proxy, set_transport, Client};
pub use dispatch::{get, head, post};
pub use error::Error;
pub use header::Header;
pub use proxy::{HttpProxy, ProxyStrategy, Socks5Proxy};
pub use response::Response;
pub use transport::config::{ProxySpec, TransportConfig};
