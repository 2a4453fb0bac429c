//! Integration tests for the TCP transport.
//!
//! These spin up a real loopback listener standing in for the gateway and
//! check that bytes flow both ways and that closes are reported correctly.

use std::time::Duration;

use i3link_transport::{Connection, TcpConnection, TransportError};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

const TIMEOUT: Duration = Duration::from_secs(5);

/// Binds a listener on an OS-assigned port and returns it with its port.
async fn listener() -> (TcpListener, u16) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("should bind");
    let port = listener.local_addr().expect("local addr").port();
    (listener, port)
}

#[tokio::test]
async fn test_tcp_connect_send_and_receive() {
    let (listener, port) = listener().await;

    let server = tokio::spawn(async move {
        let (mut sock, _) = listener.accept().await.expect("should accept");
        let mut buf = [0u8; 64];
        let n = sock.read(&mut buf).await.expect("server read");
        sock.write_all(b"pong\n").await.expect("server write");
        buf[..n].to_vec()
    });

    let mut conn = TcpConnection::connect("127.0.0.1", port, TIMEOUT)
        .await
        .expect("client should connect");
    assert!(conn.id().into_inner() > 0);
    assert_eq!(conn.peer_addr().port(), port);

    conn.send(b"ping\n").await.expect("send should succeed");

    let received = conn
        .recv()
        .await
        .expect("recv should succeed")
        .expect("should have data");
    assert_eq!(received, b"pong\n");

    let seen_by_server = server.await.expect("server task");
    assert_eq!(seen_by_server, b"ping\n");

    conn.close().await.expect("close should succeed");
}

#[tokio::test]
async fn test_tcp_recv_returns_none_on_peer_close() {
    let (listener, port) = listener().await;

    let server = tokio::spawn(async move {
        let (sock, _) = listener.accept().await.expect("should accept");
        drop(sock);
    });

    let mut conn = TcpConnection::connect("127.0.0.1", port, TIMEOUT)
        .await
        .expect("client should connect");
    server.await.expect("server task");

    let result = conn.recv().await.expect("recv should not error");
    assert!(result.is_none(), "orderly close should yield None");
}

#[tokio::test]
async fn test_tcp_connect_refused_is_connect_failed() {
    // Grab a free port, then release it so nothing is listening there.
    let (listener, port) = listener().await;
    drop(listener);

    let result = TcpConnection::connect("127.0.0.1", port, TIMEOUT).await;
    assert!(
        matches!(result, Err(TransportError::ConnectFailed(_))),
        "expected ConnectFailed, got {:?}",
        result.err()
    );
}

#[tokio::test]
async fn test_tcp_send_after_close_is_rejected() {
    let (listener, port) = listener().await;
    let _server = tokio::spawn(async move { listener.accept().await });

    let mut conn = TcpConnection::connect("127.0.0.1", port, TIMEOUT)
        .await
        .expect("client should connect");
    conn.close().await.expect("first close");
    conn.close().await.expect("second close is a no-op");

    let result = conn.send(b"late\n").await;
    assert!(matches!(result, Err(TransportError::ConnectionClosed(_))));
}
