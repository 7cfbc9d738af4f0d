//! Module `file_ops`
//!
//! Moves bytes between a local stream and a data connection.
//!
//! Downloads end on the first zero-length read or on the first read that
//! stays idle longer than the inactivity window. Some servers never close
//! the data connection cleanly, so silence is read as "no more data". This
//! is approximate: a server that pauses mid-transfer for longer than the
//! window is taken as finished.

use log::{debug, info};
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::time::timeout;

use crate::error::TransferError;
use crate::transfer::results::Completion;

pub const DEFAULT_INACTIVITY_WINDOW: Duration = Duration::from_secs(10);
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// How long a data read may stay idle before the transfer counts as done.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InactivityPolicy {
    window: Duration,
}

impl InactivityPolicy {
    pub fn new(window: Duration) -> Self {
        Self { window }
    }

    pub fn window(&self) -> Duration {
        self.window
    }
}

impl Default for InactivityPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_INACTIVITY_WINDOW)
    }
}

/// Copies the whole local source to the data connection.
pub async fn send_source<R, W>(
    source: &mut R,
    data_stream: &mut W,
    buffer_size: usize,
) -> Result<u64, TransferError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut total_bytes_sent = 0u64;

    loop {
        let n = source
            .read(&mut buffer)
            .await
            .map_err(TransferError::LocalIo)?;
        if n == 0 {
            break;
        }
        data_stream
            .write_all(&buffer[..n])
            .await
            .map_err(TransferError::DataStream)?;
        total_bytes_sent += n as u64;
    }

    data_stream.flush().await.map_err(TransferError::DataStream)?;
    info!("Upload stream drained ({} bytes)", total_bytes_sent);
    Ok(total_bytes_sent)
}

/// Copies data-connection bytes into the local sink until the peer closes
/// or the inactivity window elapses.
pub async fn receive_until_idle<R, W>(
    data_stream: &mut R,
    sink: &mut W,
    policy: InactivityPolicy,
    buffer_size: usize,
) -> Result<(u64, Completion), TransferError>
where
    R: AsyncRead + Unpin + ?Sized,
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut buffer = vec![0u8; buffer_size.max(1)];
    let mut total_bytes_received = 0u64;

    let completion = loop {
        match timeout(policy.window(), data_stream.read(&mut buffer)).await {
            Ok(Ok(0)) => break Completion::PeerClosed,
            Ok(Ok(n)) => {
                sink.write_all(&buffer[..n])
                    .await
                    .map_err(TransferError::LocalIo)?;
                total_bytes_received += n as u64;
            }
            Ok(Err(e)) => return Err(TransferError::DataStream(e)),
            Err(_) => {
                debug!(
                    "No data for {:?}, treating the transfer as complete",
                    policy.window()
                );
                break Completion::InactivityTimeout;
            }
        }
    };

    sink.flush().await.map_err(TransferError::LocalIo)?;
    info!(
        "Download stream finished ({} bytes, {:?})",
        total_bytes_received, completion
    );
    Ok((total_bytes_received, completion))
}
