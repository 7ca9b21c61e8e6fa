//! Shared client singleton behavior and the module-level facade.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use webpool::{Header, TransportConfig};

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_first_calls_yield_one_client() {
    let a = tokio::spawn(async { webpool::client() as *const _ as usize });
    let b = tokio::spawn(async { webpool::client() as *const _ as usize });
    let (a, b) = (a.await.unwrap(), b.await.unwrap());
    assert_eq!(a, b, "both tasks must observe the same client instance");
}

#[tokio::test]
async fn test_singleton_keeps_config_bound_at_first_use() {
    let bound = webpool::client().config().max_connections_per_host;

    webpool::set_transport(TransportConfig::default().max_connections_per_host(bound + 7));

    // The process-scoped configuration moved; the already-built singleton
    // did not.
    assert_eq!(
        webpool::transport::current().max_connections_per_host,
        bound + 7
    );
    assert_eq!(webpool::client().config().max_connections_per_host, bound);
}

#[tokio::test]
async fn test_facade_get_uses_shared_client() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        let mut raw = Vec::new();
        let mut chunk = [0u8; 1024];
        loop {
            let n = stream.read(&mut chunk).await.unwrap();
            assert!(n > 0);
            raw.extend_from_slice(&chunk[..n]);
            if raw.windows(4).any(|w| w == b"\r\n\r\n") {
                break;
            }
        }
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nContent-Length: 6\r\nConnection: close\r\n\r\nshared")
            .await
            .unwrap();
    });

    let resp = webpool::get(
        &format!("http://127.0.0.1:{port}/"),
        Header::new(),
        Duration::from_secs(3),
    )
    .await
    .unwrap();
    assert_eq!(resp.status(), 200);
    assert_eq!(resp.text(), "shared");
}
