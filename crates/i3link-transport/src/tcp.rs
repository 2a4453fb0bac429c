//! Plain TCP transport to the gateway, on top of `tokio::net::TcpStream`.

use std::io::ErrorKind;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

use crate::{Connection, ConnectionId, TransportError};

/// Size of a single socket read. Frames longer than this simply arrive
/// over several reads; reassembly happens in the protocol layer.
pub const READ_CHUNK_SIZE: usize = 8 * 1024;

/// Counter for generating unique connection IDs.
static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// A TCP connection to the gateway.
pub struct TcpConnection {
    id: ConnectionId,
    peer: SocketAddr,
    stream: TcpStream,
    chunk: Box<[u8]>,
    closed: bool,
}

impl TcpConnection {
    /// Resolves `host`, then connects to the first address that accepts.
    ///
    /// The whole operation, resolution included, is bounded by `timeout`.
    pub async fn connect(
        host: &str,
        port: u16,
        timeout: Duration,
    ) -> Result<Self, TransportError> {
        let attempt = async {
            let addrs: Vec<SocketAddr> = tokio::net::lookup_host((host, port))
                .await
                .map_err(|source| TransportError::Resolve {
                    host: host.to_string(),
                    source,
                })?
                .collect();

            if addrs.is_empty() {
                return Err(TransportError::Resolve {
                    host: host.to_string(),
                    source: std::io::Error::new(
                        ErrorKind::NotFound,
                        "no addresses returned",
                    ),
                });
            }

            let mut last_err = None;
            for addr in addrs {
                match TcpStream::connect(addr).await {
                    Ok(stream) => return Ok((stream, addr)),
                    Err(e) => {
                        tracing::debug!(%addr, error = %e, "connect attempt failed");
                        last_err = Some(e);
                    }
                }
            }
            Err(TransportError::ConnectFailed(last_err.unwrap_or_else(
                || std::io::Error::new(ErrorKind::NotConnected, "no address accepted"),
            )))
        };

        let (stream, peer) = tokio::time::timeout(timeout, attempt)
            .await
            .map_err(|_| TransportError::ConnectTimeout(timeout))??;

        // Requests are small and latency matters more than packet count.
        if let Err(e) = stream.set_nodelay(true) {
            tracing::debug!(error = %e, "could not set TCP_NODELAY");
        }

        let id = ConnectionId::new(
            NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed),
        );
        tracing::debug!(%id, %peer, "TCP connection established");

        Ok(Self {
            id,
            peer,
            stream,
            chunk: vec![0u8; READ_CHUNK_SIZE].into_boxed_slice(),
            closed: false,
        })
    }

    /// The address of the gateway this connection reached.
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }
}

impl Connection for TcpConnection {
    type Error = TransportError;

    async fn send(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        if self.closed {
            return Err(TransportError::ConnectionClosed(
                "send on closed connection".into(),
            ));
        }
        self.stream
            .write_all(data)
            .await
            .map_err(TransportError::SendFailed)
    }

    async fn recv(&mut self) -> Result<Option<Vec<u8>>, Self::Error> {
        if self.closed {
            return Ok(None);
        }
        loop {
            match self.stream.read(&mut self.chunk).await {
                Ok(0) => return Ok(None),
                Ok(n) => return Ok(Some(self.chunk[..n].to_vec())),
                Err(e)
                    if matches!(
                        e.kind(),
                        ErrorKind::WouldBlock | ErrorKind::Interrupted
                    ) =>
                {
                    continue;
                }
                Err(e) => return Err(TransportError::ReceiveFailed(e)),
            }
        }
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        match self.stream.shutdown().await {
            Ok(()) => Ok(()),
            // The peer may already have torn the socket down.
            Err(e) if e.kind() == ErrorKind::NotConnected => Ok(()),
            Err(e) => Err(TransportError::SendFailed(e)),
        }
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
