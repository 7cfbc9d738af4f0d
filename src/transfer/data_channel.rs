//! Module `data_channel`
//!
//! Opening, accepting and closing the per-transfer data connection.
//! A data connection is never reused: each transfer gets a fresh one and
//! closes it before the next transfer begins.

use log::{debug, info, warn};
use std::net::Shutdown;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;

use crate::error::NegotiationError;
use crate::transfer::modes::DataEndpoint;

/// Listener announced with PORT, waiting for the server's single connection.
#[derive(Debug)]
pub struct ActiveListener {
    listener: TcpListener,
    endpoint: DataEndpoint,
}

impl ActiveListener {
    pub fn new(listener: TcpListener, endpoint: DataEndpoint) -> Self {
        Self { listener, endpoint }
    }

    /// The endpoint advertised to the server.
    pub fn endpoint(&self) -> DataEndpoint {
        self.endpoint
    }

    /// Accepts one connection, waiting at most `wait`.
    ///
    /// Consumes the listener, so it is closed after this single accept
    /// whatever the outcome.
    pub async fn accept_once(self, wait: Duration) -> Result<TcpStream, NegotiationError> {
        let accepted = timeout(wait, self.listener.accept()).await;
        drop(self.listener);

        match accepted {
            Ok(Ok((stream, peer))) => {
                info!("Data connection accepted from {} on {}", peer, self.endpoint);
                Ok(stream)
            }
            Ok(Err(e)) => Err(NegotiationError::AcceptFailed(e)),
            Err(_) => Err(NegotiationError::AcceptTimeout(wait)),
        }
    }
}

/// Connects to a passive-mode endpoint.
pub async fn connect_data_stream(endpoint: DataEndpoint) -> Result<TcpStream, NegotiationError> {
    let addr = endpoint.socket_addr();
    debug!("Connecting data channel to {}", addr);
    TcpStream::connect(addr)
        .await
        .map_err(|e| NegotiationError::ConnectFailed(addr, e))
}

/// Shuts the data connection down in both directions and closes it.
///
/// Errors are logged only: by this point the bytes have moved and the
/// final reply decides the outcome.
pub async fn close_data_stream(mut stream: TcpStream) {
    if let Err(e) = stream.shutdown().await {
        debug!("Data stream write shutdown failed: {}", e);
    }
    match stream.into_std() {
        Ok(std_stream) => {
            if let Err(e) = std_stream.shutdown(Shutdown::Both) {
                debug!("Data stream shutdown failed: {}", e);
            }
        }
        Err(e) => warn!("Failed to release data stream: {}", e),
    }
}
